/*! RPM/EVR version ordering.

Not present anywhere in the retrieved corpus, so this is implemented fresh
from the standard public `rpmvercmp` algorithm (alternating alpha/digit
segment comparison; a `~` prerelease marker sorts before everything,
including the end of a string) — following the same code shape as
[pkgmirror_deb]'s Debian version comparator (a small pure comparison
function plus `Ord`/`PartialOrd` impls) for stylistic consistency across the
two format crates.

[pkgmirror_deb]: https://docs.rs/pkgmirror-deb
*/

use {
    std::{cmp::Ordering, fmt},
    thiserror::Error,
};

#[derive(Clone, Debug, Error)]
pub enum VersionError {
    #[error("malformed EVR string: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, VersionError>;

/// An RPM `epoch:version-release` triple.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RpmVersion {
    pub epoch: u64,
    pub version: String,
    pub release: String,
}

impl RpmVersion {
    pub fn new(epoch: u64, version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release: release.into(),
        }
    }

    /// Parse an `[epoch:]version[-release]` string, as found in RPM
    /// `NAME-VERSION-RELEASE.ARCH.rpm` filenames and `Provides:`-style tags.
    pub fn parse(s: &str) -> Result<Self> {
        let (epoch, remainder) = if let Some(pos) = s.find(':') {
            let epoch = s[..pos]
                .parse::<u64>()
                .map_err(|_| VersionError::Malformed(s.to_string()))?;
            (epoch, &s[pos + 1..])
        } else {
            (0, s)
        };

        let (version, release) = match remainder.rfind('-') {
            Some(pos) => (&remainder[..pos], &remainder[pos + 1..]),
            None => (remainder, ""),
        };

        if version.is_empty() {
            return Err(VersionError::Malformed(s.to_string()));
        }

        Ok(Self {
            epoch,
            version: version.to_string(),
            release: release.to_string(),
        })
    }
}

impl fmt::Display for RpmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.release.is_empty() {
            write!(f, "{}:{}", self.epoch, self.version)
        } else {
            write!(f, "{}:{}-{}", self.epoch, self.version, self.release)
        }
    }
}

fn is_separator(c: char) -> bool {
    !c.is_ascii_alphanumeric() && c != '~'
}

enum SegmentKind {
    Digit,
    Alpha,
}

fn take_segment(s: &str) -> (&str, &str, SegmentKind) {
    let first = s.chars().next().expect("take_segment called on empty str");
    if first.is_ascii_digit() {
        let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        (&s[..end], &s[end..], SegmentKind::Digit)
    } else {
        let end = s.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(s.len());
        (&s[..end], &s[end..], SegmentKind::Alpha)
    }
}

/// The classic `rpmvercmp`: compares two version/release component strings
/// segment by segment, alternating alpha and digit runs, treating `~` as
/// sorting before everything (even the end of the string, i.e. a shorter
/// string missing a trailing `~foo` is considered newer).
fn rpmvercmp(a: &str, b: &str) -> Ordering {
    let mut a = a;
    let mut b = b;

    loop {
        a = a.trim_start_matches(is_separator);
        b = b.trim_start_matches(is_separator);

        let a_tilde = a.starts_with('~');
        let b_tilde = b.starts_with('~');
        if a_tilde || b_tilde {
            match (a_tilde, b_tilde) {
                (true, true) => {
                    a = &a[1..];
                    b = &b[1..];
                    continue;
                }
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => unreachable!(),
            }
        }

        if a.is_empty() && b.is_empty() {
            return Ordering::Equal;
        }
        if a.is_empty() {
            return Ordering::Less;
        }
        if b.is_empty() {
            return Ordering::Greater;
        }

        let (a_seg, a_rest, a_kind) = take_segment(a);
        a = a_rest;

        let (b_seg, b_rest) = match a_kind {
            SegmentKind::Digit => {
                let end = b.find(|c: char| !c.is_ascii_digit()).unwrap_or(b.len());
                (&b[..end], &b[end..])
            }
            SegmentKind::Alpha => {
                let end = b.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(b.len());
                (&b[..end], &b[end..])
            }
        };
        b = b_rest;

        // A numeric segment with no counterpart always wins; an alpha
        // segment with no counterpart always loses.
        if b_seg.is_empty() {
            return match a_kind {
                SegmentKind::Digit => Ordering::Greater,
                SegmentKind::Alpha => Ordering::Less,
            };
        }

        match a_kind {
            SegmentKind::Digit => {
                let a_num = a_seg.trim_start_matches('0');
                let b_num = b_seg.trim_start_matches('0');
                match a_num.len().cmp(&b_num.len()) {
                    Ordering::Equal => match a_num.cmp(b_num) {
                        Ordering::Equal => {}
                        res => return res,
                    },
                    res => return res,
                }
            }
            SegmentKind::Alpha => match a_seg.cmp(b_seg) {
                Ordering::Equal => {}
                res => return res,
            },
        }
    }
}

impl PartialOrd for RpmVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RpmVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.epoch.cmp(&other.epoch) {
            Ordering::Equal => {}
            res => return res,
        }

        match rpmvercmp(&self.version, &other.version) {
            Ordering::Equal => {}
            res => return res,
        }

        rpmvercmp(&self.release, &other.release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_evr() {
        let v = RpmVersion::parse("2:1.2.3-4.el8").unwrap();
        assert_eq!(v.epoch, 2);
        assert_eq!(v.version, "1.2.3");
        assert_eq!(v.release, "4.el8");
    }

    #[test]
    fn numeric_segments_outrank_longer_strings() {
        let a = RpmVersion::new(0, "1.0010", "1");
        let b = RpmVersion::new(0, "1.9", "1");
        assert!(a > b, "1.0010 should outrank 1.9 numerically");
    }

    #[test]
    fn tilde_sorts_before_release() {
        let a = RpmVersion::new(0, "1.0~rc1", "1");
        let b = RpmVersion::new(0, "1.0", "1");
        assert!(a < b);
    }

    #[test]
    fn epoch_dominates_version() {
        let a = RpmVersion::new(1, "0.1", "1");
        let b = RpmVersion::new(0, "9.9", "1");
        assert!(a > b);
    }

    #[test]
    fn alpha_segment_with_no_counterpart_loses() {
        let a = RpmVersion::new(0, "1.0a", "1");
        let b = RpmVersion::new(0, "1.0", "1");
        assert!(a < b);
    }
}
