/*! [Manager]: orchestrates one mirror operation through the
DISCOVER -> PARSE -> RESOLVE -> CLONE -> COPY -> REBUILD state machine,
fenced by a completed [pkgmirror_transport::ExecutionScope] at each
transition. */

use {
    crate::{
        context::Context,
        driver::{FormatDriver, ParsedUrl},
        error::{ManagerError, Result},
    },
    pkgmirror_index::{
        index::Index,
        package::{Architecture, Package, Repository},
        relation::PackageRelation,
        resolver::PackagesTree,
        stats::CopyStatistics,
    },
    pkgmirror_transport::TransportError,
    std::{
        collections::HashSet,
        path::{Path, PathBuf},
        sync::{Arc, Mutex},
    },
};

/// Orchestrates a mirror operation against one wire format.
///
/// Cheap to clone: the driver and context are both held behind `Arc` so
/// worker closures submitted to the section can capture owned handles.
pub struct Manager<D: FormatDriver> {
    driver: Arc<D>,
    context: Arc<Context>,
}

impl<D: FormatDriver + 'static> Manager<D> {
    pub fn new(driver: D, context: Context) -> Self {
        Self {
            driver: Arc::new(driver),
            context: Arc::new(context),
        }
    }

    /// DISCOVER: normalize `raw_urls` and resolve each into a [Repository].
    fn discover(&self, raw_urls: &[String], arch: Architecture) -> Result<Vec<Arc<Repository>>, D::Error> {
        let parsed: Vec<ParsedUrl> = self.driver.parse_urls(raw_urls).map_err(ManagerError::Driver)?;

        let mut repositories = Vec::with_capacity(parsed.len());
        for url in &parsed {
            log::info!("DISCOVER: {}", url.base);
            let repository = self.driver.get_repository(url, arch).map_err(ManagerError::Driver)?;
            repositories.push(repository);
        }

        Ok(repositories)
    }

    /// PARSE: stream each repository's package index, inserting records into
    /// a shared [PackagesTree] under a short-held mutex. Different
    /// repositories parse concurrently; a single repository's own stream is
    /// read sequentially by the task that owns it.
    fn load_index(
        &self,
        repositories: &[Arc<Repository>],
    ) -> Result<PackagesTree<D::Version>, D::Error> {
        let tree = Arc::new(Mutex::new(PackagesTree::<D::Version>::new()));
        let failure: Arc<Mutex<Option<D::Error>>> = Arc::new(Mutex::new(None));

        {
            let scope = self.context.section.scope(0);

            for repository in repositories {
                let driver = Arc::clone(&self.driver);
                let tree = Arc::clone(&tree);
                let failure = Arc::clone(&failure);
                let repository = Arc::clone(repository);

                scope
                    .execute(move || {
                        let mut parsed = Vec::new();
                        match driver.get_packages(&repository, &mut |pkg| parsed.push(pkg)) {
                            Ok(()) => {
                                let mut tree = tree.lock().expect("index mutex poisoned");
                                for pkg in parsed {
                                    tree.add(pkg);
                                }
                                Ok(())
                            }
                            Err(e) => {
                                failure.lock().expect("failure mutex poisoned").replace(e);
                                Err(TransportError::SectionFailed { failures: 1, budget: 0 })
                            }
                        }
                    })
                    .map_err(ManagerError::Transport)?;
            }

            scope.exit().map_err(|e| {
                if let Some(driver_err) = failure.lock().expect("failure mutex poisoned").take() {
                    ManagerError::Driver(driver_err)
                } else {
                    ManagerError::Transport(e)
                }
            })?;
        }

        Ok(Arc::try_unwrap(tree)
            .expect("all worker threads have exited by now")
            .into_inner()
            .expect("index mutex poisoned"))
    }

    fn parse_roots(&self, relations: &[String]) -> Result<HashSet<PackageRelation<D::Version>>, D::Error> {
        relations
            .iter()
            .map(|raw| self.driver.parse_relation(raw).map_err(ManagerError::Driver))
            .collect()
    }

    fn load_shield(&self, raw_urls: &[String], arch: Architecture) -> Result<Index<D::Version>, D::Error> {
        let repositories = self.discover(raw_urls, arch)?;
        Ok(self.load_index(&repositories)?.into_index())
    }

    /// RESOLVE: the effective package set, full or minimal-subset depending
    /// on whether a shield/bootstrap was given. Logs (but does not fail on)
    /// any `UnresolvedWarning`.
    fn resolve(
        &self,
        tree: PackagesTree<D::Version>,
        shield: Option<&Index<D::Version>>,
        roots: HashSet<PackageRelation<D::Version>>,
    ) -> HashSet<Package<D::Version>> {
        if shield.is_none() && roots.is_empty() {
            log::info!("RESOLVE: no shield or bootstrap given, keeping the full index");
            return tree.packages().cloned().collect();
        }

        log::info!("RESOLVE: computing minimal subset");
        let outcome = tree.minimal_subset(shield, roots);

        for relation in &outcome.unresolved {
            log::warn!("UnresolvedWarning: could not satisfy relation: {relation}");
        }

        outcome.resolved
    }

    /// `get_packages(origin, shield?, bootstrap?)` — the effective package
    /// set for `origin`, optionally reduced to the minimal subset implied by
    /// `shield`/`bootstrap`.
    pub fn get_packages(
        &self,
        origin: &[String],
        arch: Architecture,
        shield: Option<&[String]>,
        bootstrap: &[String],
    ) -> Result<HashSet<Package<D::Version>>, D::Error> {
        let repositories = self.discover(origin, arch)?;
        let tree = self.load_index(&repositories)?;

        let shield_index = shield.map(|urls| self.load_shield(urls, arch)).transpose()?;
        let roots = self.parse_roots(bootstrap)?;

        Ok(self.resolve(tree, shield_index.as_ref(), roots))
    }

    /// `get_unresolved_depends(origin)` — relations no package in `origin`
    /// can satisfy.
    pub fn get_unresolved_depends(
        &self,
        origin: &[String],
        arch: Architecture,
    ) -> Result<HashSet<PackageRelation<D::Version>>, D::Error> {
        let repositories = self.discover(origin, arch)?;
        let tree = self.load_index(&repositories)?;
        Ok(tree.unresolved_depends(HashSet::new()))
    }

    /// `clone_repositories(origin, destination, shield?, bootstrap?, keep_existing)`
    /// — the full mirror operation. Returns the statistics accumulated over
    /// the COPY phase.
    #[allow(clippy::too_many_arguments)]
    pub fn clone_repositories(
        &self,
        origin: &[String],
        arch: Architecture,
        destination: &Path,
        shield: Option<&[String]>,
        bootstrap: &[String],
        keep_existing: bool,
    ) -> Result<Arc<CopyStatistics>, D::Error> {
        let repositories = self.discover(origin, arch)?;
        let tree = self.load_index(&repositories)?;

        let shield_index = shield.map(|urls| self.load_shield(urls, arch)).transpose()?;
        let roots = self.parse_roots(bootstrap)?;
        let packages = self.resolve(tree, shield_index.as_ref(), roots);

        log::info!("CLONE: writing mirror skeletons under {}", destination.display());
        let mirrors = self.clone_mirrors(&repositories, destination)?;

        log::info!("COPY: transferring {} package(s)", packages.len());
        let stats = self.copy_packages(&mirrors, &packages)?;

        log::info!("REBUILD: writing mirror metadata");
        self.rebuild_mirrors(&mirrors, &packages, keep_existing)?;

        Ok(stats)
    }

    /// CLONE: create each origin repository's on-disk mirror skeleton,
    /// returning `(origin, mirror)` pairs.
    fn clone_mirrors(
        &self,
        repositories: &[Arc<Repository>],
        destination: &Path,
    ) -> Result<Vec<(Arc<Repository>, Repository)>, D::Error> {
        repositories
            .iter()
            .map(|origin| {
                let mirror = self
                    .driver
                    .clone_repository(origin, destination, false, false)
                    .map_err(ManagerError::Driver)?;
                Ok((Arc::clone(origin), mirror))
            })
            .collect()
    }

    /// Find the mirror repository that corresponds to a package's origin
    /// repository.
    fn mirror_for<'a>(
        mirrors: &'a [(Arc<Repository>, Repository)],
        origin: &Repository,
    ) -> Option<&'a Repository> {
        mirrors
            .iter()
            .find(|(o, _)| o.as_ref() == origin)
            .map(|(_, mirror)| mirror)
    }

    /// COPY: fetch each selected package's file into its mirror location,
    /// gated by the connection pool and run under the section's error
    /// budget.
    fn copy_packages(
        &self,
        mirrors: &[(Arc<Repository>, Repository)],
        packages: &HashSet<Package<D::Version>>,
    ) -> Result<Arc<CopyStatistics>, D::Error> {
        let stats = Arc::new(CopyStatistics::new());

        for package in packages {
            stats.add_total(1, package.filesize.unwrap_or(0));
        }

        {
            let scope = self.context.section.scope(self.context.ignore_errors_budget);

            for package in packages {
                let Some(mirror) = Self::mirror_for(mirrors, &package.repository) else {
                    continue;
                };
                let dst: PathBuf = Path::new(&mirror.url).join(&package.filename);
                let src = package.repository.url.clone();
                let filename = package.filename.clone();
                let expected = package.filesize;
                let stats = Arc::clone(&stats);
                let context = Arc::clone(&self.context);

                scope
                    .execute(move || {
                        let url = match context.connections.parse_location(&format!("{src}/{filename}")) {
                            Ok(url) => url,
                            Err(e) => {
                                log::error!("malformed package URL {src}/{filename}: {e}");
                                return Err(e);
                            }
                        };

                        let conn = context.connections.acquire();
                        match conn.retrieve(&url, &dst, expected) {
                            Ok(bytes) => {
                                stats.add_copied(1, bytes);
                                Ok(())
                            }
                            Err(e) => {
                                log::warn!("failed to copy {filename}: {e}");
                                Err(e)
                            }
                        }
                    })
                    .map_err(ManagerError::Transport)?;
            }

            scope.exit().map_err(ManagerError::Transport)?;
        }

        Ok(stats)
    }

    /// REBUILD: reconcile on-disk contents with the selected set, then
    /// rewrite each mirror's metadata.
    fn rebuild_mirrors(
        &self,
        mirrors: &[(Arc<Repository>, Repository)],
        packages: &HashSet<Package<D::Version>>,
        keep_existing: bool,
    ) -> Result<(), D::Error> {
        for (origin, mirror) in mirrors {
            let for_repo: Vec<Package<D::Version>> = packages
                .iter()
                .filter(|p| p.repository.as_ref() == origin.as_ref())
                .cloned()
                .collect();

            self.driver
                .assign_packages(mirror, &for_repo, keep_existing)
                .map_err(ManagerError::Driver)?;
            self.driver
                .rebuild_repository(mirror, &for_repo)
                .map_err(ManagerError::Driver)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgmirror_index::package::ChecksumSet;
    use pkgmirror_transport::{AsyncSection, ConnectionPool};
    use std::fmt;

    #[derive(Debug)]
    struct FakeError(String);

    impl fmt::Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for FakeError {}

    /// A driver over a plain directory of files: each file is one package
    /// named after itself at version 1, with no relations.
    struct FakeDriver {
        root: PathBuf,
    }

    impl FormatDriver for FakeDriver {
        type Version = i64;
        type Error = FakeError;

        fn parse_urls(&self, raw_urls: &[String]) -> Result<Vec<ParsedUrl>, FakeError> {
            Ok(raw_urls
                .iter()
                .map(|u| ParsedUrl::new(u.clone(), vec![]))
                .collect())
        }

        fn parse_relation(
            &self,
            raw: &str,
        ) -> Result<PackageRelation<i64>, FakeError> {
            Ok(PackageRelation::single(
                raw,
                pkgmirror_index::relation::VersionRange::any(0),
            ))
        }

        fn get_repository(
            &self,
            parsed: &ParsedUrl,
            arch: Architecture,
        ) -> Result<Arc<Repository>, FakeError> {
            Ok(Arc::new(Repository::new(
                vec![parsed.base.clone()],
                arch,
                "fake",
                self.root.display().to_string(),
            )))
        }

        fn get_packages(
            &self,
            repository: &Arc<Repository>,
            sink: &mut dyn FnMut(Package<i64>),
        ) -> Result<(), FakeError> {
            for entry in std::fs::read_dir(&self.root).map_err(|e| FakeError(e.to_string()))? {
                let entry = entry.map_err(|e| FakeError(e.to_string()))?;
                let name = entry.file_name().to_string_lossy().into_owned();
                let size = entry.metadata().map_err(|e| FakeError(e.to_string()))?.len();

                sink(Package::new(
                    name.clone(),
                    1,
                    name,
                    Some(size),
                    ChecksumSet::default(),
                    true,
                    vec![],
                    vec![],
                    vec![],
                    Arc::clone(repository),
                ));
            }

            Ok(())
        }

        fn clone_repository(
            &self,
            repository: &Repository,
            destination_root: &Path,
            _source: bool,
            _locale: bool,
        ) -> Result<Repository, FakeError> {
            std::fs::create_dir_all(destination_root).map_err(|e| FakeError(e.to_string()))?;
            Ok(repository.with_url(destination_root.display().to_string()))
        }

        fn assign_packages(
            &self,
            _mirror_repository: &Repository,
            _packages: &[Package<i64>],
            _keep_existing: bool,
        ) -> Result<(), FakeError> {
            Ok(())
        }

        fn rebuild_repository(
            &self,
            _mirror_repository: &Repository,
            _packages: &[Package<i64>],
        ) -> Result<(), FakeError> {
            Ok(())
        }
    }

    fn context() -> Context {
        Context::new(
            ConnectionPool::new(2, 0, None, None, None).unwrap(),
            AsyncSection::new(2, 8),
            0,
        )
    }

    #[test]
    fn clone_repositories_copies_files() {
        let origin = tempfile::tempdir().unwrap();
        std::fs::write(origin.path().join("a.bin"), b"hello").unwrap();
        let destination = tempfile::tempdir().unwrap();

        let manager = Manager::new(
            FakeDriver {
                root: origin.path().to_path_buf(),
            },
            context(),
        );

        let stats = manager
            .clone_repositories(
                &["origin".to_string()],
                Architecture::X86_64,
                destination.path(),
                None,
                &[],
                true,
            )
            .unwrap();

        assert_eq!(stats.total(), 1);
        assert_eq!(stats.copied(), 1);
        assert_eq!(
            std::fs::read(destination.path().join("a.bin")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn get_unresolved_depends_reports_missing_relations() {
        let origin = tempfile::tempdir().unwrap();
        std::fs::write(origin.path().join("a.bin"), b"x").unwrap();

        let manager = Manager::new(
            FakeDriver {
                root: origin.path().to_path_buf(),
            },
            context(),
        );

        let unresolved = manager
            .get_unresolved_depends(&["origin".to_string()], Architecture::X86_64)
            .unwrap();

        // `a.bin`'s only package has no `requires`, so nothing is unresolved.
        assert!(unresolved.is_empty());
    }
}
