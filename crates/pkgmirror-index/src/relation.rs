/*! Version ranges and package relations.

A [VersionRange] constrains a comparand of some format-specific, orderable
version type. A [PackageRelation] is a disjunction ("alternatives") chain of
`(name, VersionRange)` links, mirroring how `Depends:`-style fields are
written in both the Debian and RPM worlds (`foo (>= 1.0) | bar`).
*/

use std::fmt;

/// A version comparison operator.
///
/// `None` means "no constraint"; it is spelled out (not `Option<Operator>`)
/// so that a [VersionRange] is always a single concrete value with a uniform
/// `has_intersection` definition.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Operator {
    None,
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

/// A constraint on a version: an operator plus a comparand.
///
/// `Operator::None` ignores the comparand entirely; by convention callers
/// still supply one (the caller's "no constraint" sentinel), but intersection
/// and matching never inspect it in that case.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct VersionRange<V> {
    pub operator: Operator,
    pub version: V,
}

impl<V: Ord + Clone + fmt::Debug> VersionRange<V> {
    pub fn new(operator: Operator, version: V) -> Self {
        Self { operator, version }
    }

    pub fn any(version: V) -> Self {
        Self::new(Operator::None, version)
    }

    /// Whether a concrete `version` satisfies this range.
    pub fn matches(&self, version: &V) -> bool {
        match self.operator {
            Operator::None => true,
            Operator::Lt => version < &self.version,
            Operator::Le => version <= &self.version,
            Operator::Eq => version == &self.version,
            Operator::Ge => version >= &self.version,
            Operator::Gt => version > &self.version,
        }
    }

    /// Whether this range and `other` can both be satisfied by some version.
    ///
    /// Total and symmetric: `a.has_intersection(&b) == b.has_intersection(&a)`
    /// for all `a`, `b`.
    pub fn has_intersection(&self, other: &Self) -> bool {
        use Operator::*;

        if self.operator == None || other.operator == None {
            return true;
        }

        match (self.operator, other.operator) {
            (Eq, Eq) => self.version == other.version,
            (Eq, _) => other.matches(&self.version),
            (_, Eq) => self.matches(&other.version),

            // Same direction (both upper-bounding or both lower-bounding):
            // always compatible, since one side can pick a version deep
            // enough into the unbounded direction to satisfy both.
            (Lt | Le, Lt | Le) => true,
            (Gt | Ge, Gt | Ge) => true,

            // Opposite directions: need the bounds to actually overlap.
            (Lt, Gt) => other.version < self.version,
            (Lt, Ge) => other.version < self.version,
            (Le, Gt) => other.version < self.version,
            (Le, Ge) => other.version <= self.version,
            (Gt, Lt) => self.version < other.version,
            (Ge, Lt) => self.version < other.version,
            (Gt, Le) => self.version < other.version,
            (Ge, Le) => self.version <= other.version,

            (None, _) | (_, None) => unreachable!("handled above"),
        }
    }
}

/// A single `(name, VersionRange)` link in an alternative chain.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RelationLink<V> {
    pub name: String,
    pub version: VersionRange<V>,
}

/// A disjunction chain of relation links: `name (op ver) | name (op ver) | ...`.
///
/// Stored as a flat, non-empty `Vec` rather than a recursive `Option<Box<..>>`
/// linked list; iteration order is the alternative order written in the
/// source metadata. Equality and hash depend on the full chain.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PackageRelation<V> {
    links: Vec<RelationLink<V>>,
}

impl<V: Ord + Clone + fmt::Debug> PackageRelation<V> {
    /// Construct a relation from a non-empty sequence of links.
    ///
    /// Panics if `links` is empty; callers are expected to have validated
    /// this during parsing (see each format driver's error handling).
    pub fn new(links: Vec<RelationLink<V>>) -> Self {
        assert!(!links.is_empty(), "PackageRelation requires >= 1 link");
        Self { links }
    }

    pub fn single(name: impl Into<String>, version: VersionRange<V>) -> Self {
        Self::new(vec![RelationLink {
            name: name.into(),
            version,
        }])
    }

    /// Iterate over links in alternative order.
    pub fn iter(&self) -> impl Iterator<Item = &RelationLink<V>> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The name of the first link, used for logging/diagnostics.
    pub fn primary_name(&self) -> &str {
        &self.links[0].name
    }
}

impl<V: fmt::Display> fmt::Display for PackageRelation<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .links
            .iter()
            .map(|link| match link.version.operator {
                Operator::None => link.name.clone(),
                op => format!(
                    "{} ({} {})",
                    link.name,
                    match op {
                        Operator::Lt => "<<",
                        Operator::Le => "<=",
                        Operator::Eq => "=",
                        Operator::Ge => ">=",
                        Operator::Gt => ">>",
                        Operator::None => unreachable!(),
                    },
                    link.version.version
                ),
            })
            .collect();
        write!(f, "{}", parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_is_symmetric() {
        let cases = [
            (Operator::None, 1, Operator::Eq, 2),
            (Operator::Lt, 5, Operator::Gt, 1),
            (Operator::Lt, 5, Operator::Gt, 5),
            (Operator::Le, 5, Operator::Ge, 5),
            (Operator::Le, 5, Operator::Ge, 6),
            (Operator::Eq, 5, Operator::Eq, 5),
            (Operator::Eq, 5, Operator::Eq, 6),
        ];

        for (op_a, v_a, op_b, v_b) in cases {
            let a = VersionRange::new(op_a, v_a);
            let b = VersionRange::new(op_b, v_b);
            assert_eq!(
                a.has_intersection(&b),
                b.has_intersection(&a),
                "asymmetric for {:?} vs {:?}",
                a,
                b
            );
        }
    }

    #[test]
    fn none_always_intersects() {
        let any = VersionRange::any(0);
        let eq = VersionRange::new(Operator::Eq, 42);
        assert!(any.has_intersection(&eq));
        assert!(eq.has_intersection(&any));
    }

    #[test]
    fn relation_display_alternatives() {
        let rel = PackageRelation::new(vec![
            RelationLink {
                name: "a".into(),
                version: VersionRange::new(Operator::Ge, 1),
            },
            RelationLink {
                name: "b".into(),
                version: VersionRange::any(0),
            },
        ]);
        assert_eq!(rel.to_string(), "a (>= 1) | b");
    }
}
