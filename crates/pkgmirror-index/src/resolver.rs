/*! [PackagesTree]: an [Index] enriched with the dependency-walk algorithms
(`unresolved_depends`, `minimal_subset`) used to compute a minimal mirror
closure. */

use {
    crate::{index::Index, package::Package, relation::PackageRelation},
    std::{
        collections::HashSet,
        fmt,
        hash::Hash,
        ops::{Deref, DerefMut},
    },
};

/// Outcome of [PackagesTree::minimal_subset]: the resolved package closure
/// and whatever relations could not be satisfied by either the index or the
/// shield.
#[derive(Debug)]
pub struct ResolveOutcome<V> {
    pub resolved: HashSet<Package<V>>,
    pub unresolved: HashSet<PackageRelation<V>>,
}

/// An [Index] plus resolver algorithms.
#[derive(Clone, Debug, Default)]
pub struct PackagesTree<V> {
    index: Index<V>,
}

impl<V> Deref for PackagesTree<V> {
    type Target = Index<V>;

    fn deref(&self) -> &Self::Target {
        &self.index
    }
}

impl<V> DerefMut for PackagesTree<V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.index
    }
}

impl<V> PackagesTree<V>
where
    V: Ord + Clone + Eq + Hash + fmt::Debug + fmt::Display,
{
    pub fn new() -> Self {
        Self {
            index: Index::new(),
        }
    }

    pub fn from_index(index: Index<V>) -> Self {
        Self { index }
    }

    pub fn into_index(self) -> Index<V> {
        self.index
    }

    /// For every package and every one of its `requires` relations, check
    /// whether any link is satisfied by some *other* package in the index.
    /// Relations with no satisfying link are added to `seed` and the
    /// (possibly already non-empty) `seed` is returned.
    pub fn unresolved_depends(
        &self,
        mut seed: HashSet<PackageRelation<V>>,
    ) -> HashSet<PackageRelation<V>> {
        for package in self.index.packages() {
            for relation in &package.requires {
                if seed.contains(relation) {
                    continue;
                }

                let satisfied = relation.iter().any(|link| {
                    match self.index.find(&link.name, &link.version) {
                        Some(candidate) => candidate != package,
                        None => false,
                    }
                });

                if !satisfied {
                    seed.insert(relation.clone());
                }
            }
        }

        seed
    }

    /// Compute the transitive closure over `requires` edges rooted at every
    /// mandatory package plus a virtual root holding `roots`.
    ///
    /// When `shield` is given, a relation satisfied by a package in the
    /// shield is considered resolved without pulling anything new into the
    /// returned closure: the shield's packages are assumed already present
    /// wherever this mirror is consumed. The shield's own unresolved
    /// dependencies are folded into `roots` so they get a chance to resolve
    /// against *this* index, keeping the shield self-consistent against the
    /// mirror being built rather than being reported as unresolved outright.
    ///
    /// When multiple index packages satisfy the same relation link, ALL of
    /// them are pulled in — the minimal subset is the union across matching
    /// candidates, not an arbitrary pick of one.
    pub fn minimal_subset(
        &self,
        shield: Option<&Index<V>>,
        roots: HashSet<PackageRelation<V>>,
    ) -> ResolveOutcome<V> {
        let mut resolved: HashSet<Package<V>> = HashSet::new();
        let mut unresolved: HashSet<PackageRelation<V>> = HashSet::new();

        let mut roots = roots;
        if let Some(shield) = shield {
            let shield_tree = PackagesTree::from_index(shield.clone());
            roots.extend(shield_tree.unresolved_depends(HashSet::new()));
        }

        let mut stack: Vec<(Option<Package<V>>, Vec<PackageRelation<V>>)> = Vec::new();
        stack.push((None, roots.into_iter().collect()));

        for package in self.index.packages().filter(|p| p.mandatory) {
            stack.push((Some(package.clone()), package.requires.clone()));
        }

        while let Some((pkg, relations)) = stack.pop() {
            if let Some(p) = &pkg {
                resolved.insert(p.clone());
            }

            for relation in relations {
                if unresolved.contains(&relation) {
                    continue;
                }

                let mut satisfied = false;

                for link in relation.iter() {
                    if let Some(shield) = shield {
                        if shield.find(&link.name, &link.version).is_some() {
                            satisfied = true;
                            break;
                        }
                    }

                    let candidates: Vec<&Package<V>> = self
                        .index
                        .find_all(&link.name, &link.version)
                        .into_iter()
                        .filter(|candidate| Some(*candidate) != pkg.as_ref())
                        .collect();

                    if !candidates.is_empty() {
                        for candidate in candidates {
                            if !resolved.contains(candidate) {
                                stack.push((Some(candidate.clone()), candidate.requires.clone()));
                            }
                        }
                        satisfied = true;
                        break;
                    }
                }

                if !satisfied {
                    unresolved.insert(relation);
                }
            }
        }

        ResolveOutcome { resolved, unresolved }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        package::{Architecture, ChecksumSet, Repository},
        relation::{Operator, VersionRange},
    };
    use std::sync::Arc;

    fn repo() -> Arc<Repository> {
        Arc::new(Repository::new(
            vec!["trusty".into(), "main".into()],
            Architecture::X86_64,
            "test",
            "http://example/",
        ))
    }

    fn pkg(name: &str, requires: Vec<PackageRelation<i64>>) -> Package<i64> {
        Package::new(
            name,
            1,
            format!("{name}.deb"),
            Some(10),
            ChecksumSet::default(),
            false,
            requires,
            vec![],
            vec![],
            repo(),
        )
    }

    fn req(name: &str) -> PackageRelation<i64> {
        PackageRelation::single(name, VersionRange::any(0))
    }

    /// Scenario 1 from the testable-properties list: resolution with a shield.
    #[test]
    fn resolution_with_shield() {
        let mut tree = PackagesTree::new();
        tree.add(pkg("p1", vec![]));
        tree.add(pkg("p2", vec![req("p1")]));
        tree.add(pkg("p3", vec![req("p1"), req("p4")]));
        tree.add(pkg("p4", vec![]));

        let mut shield = Index::new();
        shield.add(pkg("p1", vec![]));
        shield.add(pkg(
            "p5",
            vec![PackageRelation::new(vec![
                crate::relation::RelationLink {
                    name: "p10".into(),
                    version: VersionRange::any(0),
                },
                crate::relation::RelationLink {
                    name: "p4".into(),
                    version: VersionRange::new(Operator::None, 0),
                },
            ])],
        ));

        let mut roots = HashSet::new();
        roots.insert(req("p3"));

        let outcome = tree.minimal_subset(Some(&shield), roots);

        let names: HashSet<&str> = outcome.resolved.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, HashSet::from(["p3", "p4"]));
        assert!(outcome.unresolved.is_empty());
    }

    /// Scenario 2: a bootstrap relation with no satisfying package anywhere.
    #[test]
    fn unresolved_bootstrap() {
        let mut tree = PackagesTree::new();
        tree.add(pkg("p1", vec![]));

        let mut roots = HashSet::new();
        roots.insert(req("p10"));

        let outcome = tree.minimal_subset(None, roots);

        assert!(outcome.resolved.is_empty());
        assert_eq!(outcome.unresolved.len(), 1);
        assert!(outcome
            .unresolved
            .iter()
            .any(|r| r.primary_name() == "p10"));
    }
}
