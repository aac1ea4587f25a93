/*! [YumDriver]: the [FormatDriver] implementation for RPM-style YUM
repositories, grounded on `rpm-repository::metadata`'s struct layout for
parsing and on an external `createrepo`-equivalent tool for rebuilding
(the corpus never builds metadata, only reads it — rebuild is new code). */

use {
    crate::{
        error::{Result, YumError},
        metadata::{Primary, RepoMd},
        version::RpmVersion,
    },
    pkgmirror_index::{
        package::{Architecture, ChecksumSet, Package, Repository},
        relation::{Operator, PackageRelation, RelationLink, VersionRange},
    },
    pkgmirror_manager::{Context, FormatDriver, ParsedUrl},
    std::{
        io::{BufReader, Read},
        path::Path,
        process::Command,
        sync::Arc,
    },
};

/// Map an [Architecture] to the RPM architecture token.
fn arch_to_rpm(arch: Architecture) -> &'static str {
    match arch {
        Architecture::X86_64 => "x86_64",
        Architecture::I386 => "i386",
        Architecture::Source => "src",
    }
}

fn parse_operator(s: &str) -> Option<Operator> {
    match s {
        ">" => Some(Operator::Gt),
        "<" => Some(Operator::Lt),
        "=" | "==" => Some(Operator::Eq),
        ">=" => Some(Operator::Ge),
        "<=" => Some(Operator::Le),
        _ => None,
    }
}

fn operator_from_flags(flags: &str) -> Operator {
    match flags {
        "GT" => Operator::Gt,
        "LT" => Operator::Lt,
        "EQ" => Operator::Eq,
        "GE" => Operator::Ge,
        "LE" => Operator::Le,
        _ => Operator::None,
    }
}

/// Parse one `name`, `name op version`, or `name (op version)` link, as used
/// in bootstrap/shield-root relation strings.
fn parse_single_link(raw: &str) -> Result<RelationLink<RpmVersion>> {
    let raw = raw.trim();

    let mut parts = raw.splitn(3, char::is_whitespace);
    let name = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| YumError::MalformedRelation(raw.to_string()))?
        .to_string();

    let op_token = parts.next();
    let version_str = parts.next();

    let version = match (op_token, version_str) {
        (Some(op), Some(v)) => {
            let operator = parse_operator(op)
                .ok_or_else(|| YumError::MalformedRelation(raw.to_string()))?;
            VersionRange::new(
                operator,
                RpmVersion::parse(v).map_err(|e| YumError::MalformedVersion(e.to_string()))?,
            )
        }
        _ => VersionRange::any(RpmVersion::new(0, "0", "")),
    };

    Ok(RelationLink { name, version })
}

/// Build a [RelationLink] from a `primary.xml` `<entry>` element.
fn link_from_entry(entry: &crate::metadata::PackageEntry) -> RelationLink<RpmVersion> {
    let version = match (&entry.version, &entry.flags) {
        (Some(ver), Some(flags)) => {
            let release = entry.release.clone().unwrap_or_default();
            let epoch = entry.epoch.unwrap_or(0);
            VersionRange::new(
                operator_from_flags(flags),
                RpmVersion::new(epoch, ver.clone(), release),
            )
        }
        _ => VersionRange::any(RpmVersion::new(0, "0", "")),
    };

    RelationLink {
        name: entry.name.clone(),
        version,
    }
}

/// The RPM/YUM [FormatDriver].
pub struct YumDriver {
    context: Arc<Context>,
    /// Name of the `createrepo`-equivalent binary invoked during
    /// [FormatDriver::rebuild_repository]. Configurable for tests.
    createrepo_binary: String,
}

impl YumDriver {
    pub fn new(context: Arc<Context>) -> Self {
        Self {
            context,
            createrepo_binary: "createrepo_c".to_string(),
        }
    }

    pub fn with_createrepo_binary(mut self, binary: impl Into<String>) -> Self {
        self.createrepo_binary = binary.into();
        self
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = self.context.connections.parse_location(url)?;
        let conn = self.context.connections.acquire();
        let stream = conn.open_stream(&parsed, 0)?;
        let mut data = Vec::new();
        BufReader::new(stream).read_to_end(&mut data)?;
        Ok(data)
    }

    fn fetch_string(&self, url: &str) -> Result<String> {
        let data = self.fetch_bytes(url)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    fn package_from_metadata(
        &self,
        package: crate::metadata::Package,
        repository: &Arc<Repository>,
    ) -> Result<Package<RpmVersion>> {
        let version = RpmVersion::new(
            package.version.epoch,
            package.version.version,
            package.version.release,
        );

        let mut checksum = ChecksumSet::default();
        match package.checksum.name.as_str() {
            "sha256" => checksum.sha256 = hex::decode(&package.checksum.value).ok(),
            "sha1" | "sha" => checksum.sha1 = hex::decode(&package.checksum.value).ok(),
            "md5" => checksum.md5 = hex::decode(&package.checksum.value).ok(),
            other => return Err(YumError::UnknownDigestFormat(other.to_string())),
        }

        let format = package.format;
        let requires = format
            .as_ref()
            .and_then(|f| f.requires.as_ref())
            .map(|e| e.entries.iter().map(link_from_entry))
            .into_iter()
            .flatten()
            .map(|link| PackageRelation::new(vec![link]))
            .collect();

        let provides = format
            .as_ref()
            .and_then(|f| f.provides.as_ref())
            .map(|e| e.entries.iter().map(link_from_entry).collect())
            .unwrap_or_default();

        let obsoletes = format
            .as_ref()
            .and_then(|f| f.obsoletes.as_ref())
            .map(|e| e.entries.iter().map(link_from_entry).collect())
            .unwrap_or_default();

        Ok(Package::new(
            package.name,
            version,
            package.location.href,
            Some(package.size.package),
            checksum,
            false,
            requires,
            provides,
            obsoletes,
            Arc::clone(repository),
        ))
    }
}

impl FormatDriver for YumDriver {
    type Version = RpmVersion;
    type Error = YumError;

    fn parse_urls(&self, raw_urls: &[String]) -> std::result::Result<Vec<ParsedUrl>, YumError> {
        raw_urls
            .iter()
            .map(|raw| {
                let base = raw.trim().trim_end_matches('/');
                if base.is_empty() {
                    return Err(YumError::MalformedUrl(raw.clone()));
                }
                Ok(ParsedUrl::new(base.to_string(), Vec::new()))
            })
            .collect()
    }

    fn parse_relation(&self, raw: &str) -> std::result::Result<PackageRelation<RpmVersion>, YumError> {
        let links: Vec<RelationLink<RpmVersion>> = raw
            .split('|')
            .map(parse_single_link)
            .collect::<Result<_>>()?;

        Ok(PackageRelation::new(links))
    }

    fn get_repository(
        &self,
        parsed: &ParsedUrl,
        arch: Architecture,
    ) -> std::result::Result<Arc<Repository>, YumError> {
        let repomd_url = format!("{}/repodata/repomd.xml", parsed.base);
        let data = self.fetch_string(&repomd_url)?;
        let _ = RepoMd::from_xml(&data)?;

        let name = parsed
            .base
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&parsed.base)
            .to_string();

        Ok(Arc::new(Repository::new(
            vec![name],
            arch,
            parsed.base.clone(),
            parsed.base.clone(),
        )))
    }

    fn get_packages(
        &self,
        repository: &Arc<Repository>,
        sink: &mut dyn FnMut(Package<RpmVersion>),
    ) -> std::result::Result<(), YumError> {
        let repomd_url = format!("{}/repodata/repomd.xml", repository.url);
        let repomd = RepoMd::from_xml(&self.fetch_string(&repomd_url)?)?;
        let primary_entry = repomd.find("primary")?;

        let primary_url = format!("{}/{}", repository.url, primary_entry.location.href);
        let raw = self.fetch_bytes(&primary_url)?;

        let xml = if primary_entry.location.href.ends_with(".gz") {
            let mut decoder = flate2::read::GzDecoder::new(raw.as_slice());
            let mut xml = String::new();
            decoder.read_to_string(&mut xml)?;
            xml
        } else {
            String::from_utf8_lossy(&raw).into_owned()
        };

        let primary = Primary::from_xml(&xml)?;

        for package in primary.packages {
            let package = self.package_from_metadata(package, repository)?;
            sink(package);
        }

        Ok(())
    }

    fn clone_repository(
        &self,
        repository: &Repository,
        destination_root: &Path,
        _source: bool,
        _locale: bool,
    ) -> std::result::Result<Repository, YumError> {
        let name = repository.name.first().cloned().unwrap_or_default();
        let dir = destination_root.join(&name);
        std::fs::create_dir_all(&dir)?;

        Ok(repository.with_url(dir.to_string_lossy().into_owned()))
    }

    fn assign_packages(
        &self,
        mirror_repository: &Repository,
        packages: &[Package<RpmVersion>],
        keep_existing: bool,
    ) -> std::result::Result<(), YumError> {
        if keep_existing {
            return Ok(());
        }

        let root = Path::new(&mirror_repository.url);
        let selected: std::collections::HashSet<&str> =
            packages.iter().map(|p| p.filename.as_str()).collect();

        for entry in walk_rpm_files(root) {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !selected.iter().any(|f| f.ends_with(name)) {
                let _ = std::fs::remove_file(&entry);
            }
        }

        Ok(())
    }

    fn rebuild_repository(
        &self,
        mirror_repository: &Repository,
        _packages: &[Package<RpmVersion>],
    ) -> std::result::Result<(), YumError> {
        let root = &mirror_repository.url;

        which::which(&self.createrepo_binary)
            .map_err(|_| YumError::ToolMissing(self.createrepo_binary.clone()))?;

        log::info!("REBUILD: invoking {} --update {root}", self.createrepo_binary);

        let status = Command::new(&self.createrepo_binary)
            .arg("--update")
            .arg(root)
            .status()
            .map_err(|_| YumError::ToolMissing(self.createrepo_binary.clone()))?;

        if !status.success() {
            return Err(YumError::ToolFailed {
                tool: self.createrepo_binary.clone(),
                status: status.code().unwrap_or(-1),
            });
        }

        Ok(())
    }
}

fn walk_rpm_files(root: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(root) else {
        return out;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if path.file_name().and_then(|n| n.to_str()) == Some("repodata") {
                continue;
            }
            out.extend(walk_rpm_files(&path));
        } else if path.extension().and_then(|e| e.to_str()) == Some("rpm") {
            out.push(path);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_urls_strips_trailing_slash() {
        let driver = YumDriver::new(Arc::new(test_context()));
        let urls = driver
            .parse_urls(&["http://mirror.example.com/fedora/35/x86_64/".to_string()])
            .unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].base, "http://mirror.example.com/fedora/35/x86_64");
        assert!(urls[0].labels.is_empty());
    }

    #[test]
    fn parse_relation_handles_alternatives() {
        let driver = YumDriver::new(Arc::new(test_context()));
        let relation = driver.parse_relation("libfoo >= 1.0|libbar").unwrap();
        assert_eq!(relation.len(), 2);
        assert_eq!(relation.primary_name(), "libfoo");
    }

    #[test]
    fn arch_mapping_matches_rpm_tokens() {
        assert_eq!(arch_to_rpm(Architecture::X86_64), "x86_64");
        assert_eq!(arch_to_rpm(Architecture::I386), "i386");
        assert_eq!(arch_to_rpm(Architecture::Source), "src");
    }

    fn test_context() -> Context {
        let connections = pkgmirror_transport::ConnectionPool::new(1, 0, None, None, None).unwrap();
        let section = pkgmirror_transport::AsyncSection::new(1, 4);
        Context::new(connections, section, 0)
    }
}
