/*! The [Index]: a monotonic `name -> versions` map plus provides/obsoletes
lookups, with range-aware lookup rules. */

use {
    crate::{
        package::Package,
        relation::{Operator, VersionRange},
    },
    std::{collections::BTreeMap, collections::HashMap, fmt},
};

/// An entry in the obsoletes/provides side maps: the package that declared
/// the obsoletes/provides relationship, plus the version range it declared
/// for the target name.
#[derive(Clone, Debug)]
struct SideEntry<V> {
    owner: Package<V>,
    range: VersionRange<V>,
}

/// Name -> ordered-by-version collection of [Package], plus the obsoletes
/// and provides side maps described in the data model.
///
/// Entries are never removed: once a name/version is added it remains
/// reachable through `find`/`find_all` for the lifetime of the index.
#[derive(Clone, Debug, Default)]
pub struct Index<V> {
    packages: HashMap<String, BTreeMap<V, Package<V>>>,
    obsoletes: HashMap<String, Vec<SideEntry<V>>>,
    provides: HashMap<String, Vec<SideEntry<V>>>,
}

impl<V> Index<V>
where
    V: Ord + Clone + Eq + std::hash::Hash + fmt::Debug + fmt::Display,
{
    pub fn new() -> Self {
        Self {
            packages: HashMap::new(),
            obsoletes: HashMap::new(),
            provides: HashMap::new(),
        }
    }

    /// Insert a package, indexing its declared obsoletes/provides links.
    ///
    /// If a package with the same `(name, version)` already exists it is
    /// overwritten in the direct map (last write wins), matching the
    /// upstream behavior this index is modeled on. The obsoletes/provides
    /// side maps are append-only.
    pub fn add(&mut self, package: Package<V>) {
        for link in &package.obsoletes {
            self.obsoletes
                .entry(link.name.clone())
                .or_default()
                .push(SideEntry {
                    owner: package.clone(),
                    range: link.version.clone(),
                });
        }

        for link in &package.provides {
            self.provides
                .entry(link.name.clone())
                .or_default()
                .push(SideEntry {
                    owner: package.clone(),
                    range: link.version.clone(),
                });
        }

        self.packages
            .entry(package.name.clone())
            .or_default()
            .insert(package.version.clone(), package);
    }

    /// Iterate all packages held directly in the index (not via obsoletes/provides).
    pub fn packages(&self) -> impl Iterator<Item = &Package<V>> {
        self.packages.values().flat_map(|versions| versions.values())
    }

    pub fn len(&self) -> usize {
        self.packages.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Three-step lookup: direct name, then obsoletes, then provides.
    pub fn find(&self, name: &str, range: &VersionRange<V>) -> Option<&Package<V>> {
        if let Some(versions) = self.packages.get(name) {
            if let Some(pkg) = Self::find_version(versions, range) {
                return Some(pkg);
            }
        }

        if let Some(entries) = self.obsoletes.get(name) {
            if let Some(pkg) = Self::resolve_side(entries, range) {
                return Some(pkg);
            }
        }

        if let Some(entries) = self.provides.get(name) {
            if let Some(pkg) = Self::resolve_side(entries, range) {
                return Some(pkg);
            }
        }

        None
    }

    /// All direct (non-obsoletes/provides) matches for `name` under `range`.
    pub fn find_all(&self, name: &str, range: &VersionRange<V>) -> Vec<&Package<V>> {
        match self.packages.get(name) {
            None => Vec::new(),
            Some(versions) => versions
                .iter()
                .filter(|(version, _)| range.matches(version))
                .map(|(_, pkg)| pkg)
                .collect(),
        }
    }

    fn find_version<'a>(
        versions: &'a BTreeMap<V, Package<V>>,
        range: &VersionRange<V>,
    ) -> Option<&'a Package<V>> {
        match range.operator {
            Operator::None => versions.iter().next_back().map(|(_, pkg)| pkg),
            Operator::Eq => versions.get(&range.version),
            // Greatest version satisfying the bound: scan newest-first and
            // take the first match, rather than `take_while` (which would
            // stop dead at the first non-matching version instead of
            // skipping past it).
            Operator::Lt | Operator::Le => versions
                .iter()
                .rev()
                .find(|(version, _)| range.matches(version))
                .map(|(_, pkg)| pkg),
            // Least version satisfying the bound: scan oldest-first.
            Operator::Gt | Operator::Ge => versions
                .iter()
                .find(|(version, _)| range.matches(version))
                .map(|(_, pkg)| pkg),
        }
    }

    /// Newest-owner-first scan of an obsoletes/provides side list, returning
    /// the first whose declared range intersects the query.
    fn resolve_side<'a>(entries: &'a [SideEntry<V>], range: &VersionRange<V>) -> Option<&'a Package<V>> {
        let mut ordered: Vec<&SideEntry<V>> = entries.iter().collect();
        ordered.sort_by(|a, b| b.owner.version.cmp(&a.owner.version));

        ordered
            .into_iter()
            .find(|entry| entry.range.has_intersection(range))
            .map(|entry| &entry.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{Architecture, ChecksumSet, Repository};
    use std::sync::Arc;

    fn repo() -> Arc<Repository> {
        Arc::new(Repository::new(
            vec!["trusty".into(), "main".into()],
            Architecture::X86_64,
            "test",
            "http://example/",
        ))
    }

    fn pkg(name: &str, version: i64) -> Package<i64> {
        Package::new(
            name,
            version,
            format!("{name}_{version}.deb"),
            Some(100),
            ChecksumSet::default(),
            false,
            vec![],
            vec![],
            vec![],
            repo(),
        )
    }

    #[test]
    fn newest_by_default() {
        let mut index = Index::new();
        index.add(pkg("p", 1));
        index.add(pkg("p", 2));

        let found = index.find("p", &VersionRange::any(0)).unwrap();
        assert_eq!(found.version, 2);
    }

    #[test]
    fn eq_lookup() {
        let mut index = Index::new();
        index.add(pkg("p", 1));
        index.add(pkg("p", 2));

        let found = index.find("p", &VersionRange::new(Operator::Eq, 1)).unwrap();
        assert_eq!(found.version, 1);
        assert!(index.find("p", &VersionRange::new(Operator::Eq, 3)).is_none());
    }

    #[test]
    fn find_all_collects_matching_versions() {
        let mut index = Index::new();
        index.add(pkg("p", 1));
        index.add(pkg("p", 2));
        index.add(pkg("p", 3));

        let all = index.find_all("p", &VersionRange::new(Operator::Ge, 2));
        let versions: Vec<i64> = all.iter().map(|p| p.version).collect();
        assert_eq!(versions, vec![2, 3]);
    }
}
