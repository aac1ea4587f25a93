/*! Debian package version string handling, ported from the corpus's own
`package_version` module: the comparator is already format-correct and has
nothing to do with the blocking-vs-async redesign, so it is carried over
near-verbatim. */

use {
    std::{
        cmp::Ordering,
        fmt::{Display, Formatter},
        num::ParseIntError,
        str::FromStr,
    },
    thiserror::Error,
};

#[derive(Clone, Debug, Error)]
pub enum VersionError {
    #[error("error parsing string to integer: {0}")]
    ParseInt(#[from] ParseIntError),

    #[error("the epoch component has non-digit characters: {0}")]
    EpochNonNumeric(String),

    #[error("upstream_version component has illegal character: {0}")]
    UpstreamVersionIllegalChar(String),

    #[error("debian_revision component has illegal character: {0}")]
    DebianRevisionIllegalChar(String),
}

pub type Result<T> = std::result::Result<T, VersionError>;

/// A Debian package version: `[epoch:]upstream_version[-debian_revision]`.
///
/// Sorting follows <https://www.debian.org/doc/debian-policy/ch-controlfields.html#version>.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PackageVersion {
    epoch: Option<u32>,
    upstream_version: String,
    debian_revision: Option<String>,
}

impl PackageVersion {
    /// Construct an instance by parsing a version string.
    pub fn parse(s: &str) -> Result<Self> {
        let (epoch, remainder) = if let Some(pos) = s.find(':') {
            (Some(&s[0..pos]), &s[pos + 1..])
        } else {
            (None, s)
        };

        let (upstream, debian) = if let Some(pos) = remainder.rfind('-') {
            (&remainder[0..pos], Some(&remainder[pos + 1..]))
        } else {
            (remainder, None)
        };

        let epoch = if let Some(epoch) = epoch {
            if !epoch.chars().all(|c| c.is_ascii_digit()) {
                return Err(VersionError::EpochNonNumeric(s.to_string()));
            }

            Some(u32::from_str(epoch)?)
        } else {
            None
        };

        // upstream_version: alphanumerics plus `. + - ~`; a hyphen is only
        // legal when a debian_revision follows.
        if !upstream.chars().all(|c| match c {
            c if c.is_ascii_alphanumeric() => true,
            '.' | '+' | '~' => true,
            '-' => debian.is_some(),
            _ => false,
        }) {
            return Err(VersionError::UpstreamVersionIllegalChar(s.to_string()));
        }

        let upstream_version = upstream.to_string();

        let debian_revision = if let Some(debian) = debian {
            if !debian.chars().all(|c| match c {
                c if c.is_ascii_alphanumeric() => true,
                '+' | '.' | '~' => true,
                _ => false,
            }) {
                return Err(VersionError::DebianRevisionIllegalChar(s.to_string()));
            }

            Some(debian.to_string())
        } else {
            None
        };

        Ok(Self {
            epoch,
            upstream_version,
            debian_revision,
        })
    }

    pub fn epoch(&self) -> Option<u32> {
        self.epoch
    }

    pub fn epoch_assumed(&self) -> u32 {
        self.epoch.unwrap_or(0)
    }

    pub fn upstream_version(&self) -> &str {
        &self.upstream_version
    }

    pub fn debian_revision(&self) -> Option<&str> {
        self.debian_revision.as_deref()
    }
}

impl Display for PackageVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.epoch.map(|e| e.to_string()).unwrap_or_default(),
            if self.epoch.is_some() { ":" } else { "" },
            self.upstream_version,
            if self.debian_revision.is_some() { "-" } else { "" },
            self.debian_revision.as_deref().unwrap_or("")
        )
    }
}

/// Split a string on the first digit character.
fn split_first_digit(s: &str) -> (&str, &str) {
    match s.chars().position(|c| c.is_ascii_digit()) {
        Some(0) => ("", s),
        Some(pos) => (&s[0..pos], &s[pos..]),
        None => (s, ""),
    }
}

fn split_first_nondigit(s: &str) -> (&str, &str) {
    match s.chars().position(|c| !c.is_ascii_digit()) {
        Some(0) => ("", s),
        Some(pos) => (&s[0..pos], &s[pos..]),
        None => (s, ""),
    }
}

/// Split on the first non-digit character, converting the leading digit run
/// to an integer (empty run counts as zero).
fn split_first_digit_number(s: &str) -> (u64, &str) {
    let (digits, remaining) = split_first_nondigit(s);

    let numeric = if digits.is_empty() {
        0
    } else {
        u64::from_str(digits).expect("digits should parse, just validated by char filter")
    };

    (numeric, remaining)
}

/// Tilde sorts before everything, even the end of a part; letters sort
/// before non-letters.
fn lexical_compare(a: &str, b: &str) -> Ordering {
    let compare_char = |a: &char, b: &char| -> Ordering {
        match (a, b) {
            ('~', '~') => Ordering::Equal,
            ('~', _) => Ordering::Less,
            (_, '~') => Ordering::Greater,
            (a, b) if a.is_ascii_alphabetic() && !b.is_ascii_alphabetic() => Ordering::Less,
            (a, b) if !a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => Ordering::Greater,
            (_, _) => Ordering::Equal,
        }
    };

    let mut a_chars = a.chars().collect::<Vec<_>>();
    let mut b_chars = b.chars().collect::<Vec<_>>();
    a_chars.sort_by(compare_char);
    b_chars.sort_by(compare_char);

    for pos in 0..std::cmp::max(a_chars.len(), b_chars.len()) {
        let a_char = a_chars.get(pos);
        let b_char = b_chars.get(pos);

        match (a_char, b_char) {
            (Some(a_char), None) if *a_char == '~' => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(b_char)) if *b_char == '~' => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(a_char), Some(b_char)) => match compare_char(a_char, b_char) {
                Ordering::Equal => {}
                res => return res,
            },
            (None, None) => unreachable!(),
        }
    }

    Ordering::Equal
}

/// Alternating lexical/numeric-segment comparison.
fn compare_component(a: &str, b: &str) -> Ordering {
    let mut a_remaining = a;
    let mut b_remaining = b;

    loop {
        let (a_leading_nondigit, a_rest) = split_first_digit(a_remaining);
        a_remaining = a_rest;
        let (b_leading_nondigit, b_rest) = split_first_digit(b_remaining);
        b_remaining = b_rest;

        match lexical_compare(a_leading_nondigit, b_leading_nondigit) {
            Ordering::Equal => {}
            res => return res,
        }

        let (a_numeric, a_rest) = split_first_digit_number(a_remaining);
        a_remaining = a_rest;
        let (b_numeric, b_rest) = split_first_digit_number(b_remaining);
        b_remaining = b_rest;

        match a_numeric.cmp(&b_numeric) {
            Ordering::Equal => {}
            res => return res,
        }

        if a_remaining.is_empty() && b_remaining.is_empty() {
            return Ordering::Equal;
        }
    }
}

impl PartialOrd<Self> for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.epoch_assumed().cmp(&other.epoch_assumed()) {
            Ordering::Equal => {}
            res => return Some(res),
        }

        match compare_component(&self.upstream_version, &other.upstream_version) {
            Ordering::Equal => {}
            res => return Some(res),
        }

        let a = self.debian_revision.as_deref().unwrap_or("0");
        let b = other.debian_revision.as_deref().unwrap_or("0");
        Some(compare_component(a, b))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() -> Result<()> {
        assert_eq!(
            PackageVersion::parse("1:4.7.0+dfsg1-2")?,
            PackageVersion {
                epoch: Some(1),
                upstream_version: "4.7.0+dfsg1".into(),
                debian_revision: Some("2".into()),
            }
        );
        assert_eq!(
            PackageVersion::parse("3.3.2.final~github")?,
            PackageVersion {
                epoch: None,
                upstream_version: "3.3.2.final~github".into(),
                debian_revision: None,
            }
        );
        Ok(())
    }

    #[test]
    fn format_roundtrip() -> Result<()> {
        for s in ["1:4.7.0+dfsg1-2", "3.3.2.final~github", "0.18.0+dfsg-2+b1"] {
            let v = PackageVersion::parse(s)?;
            assert_eq!(format!("{}", v), s);
        }
        Ok(())
    }

    #[test]
    fn tilde_sorts_first() {
        let a = PackageVersion::parse("1.0~beta1~svn1245").unwrap();
        let b = PackageVersion::parse("1.0~beta1").unwrap();
        let c = PackageVersion::parse("1.0").unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn epoch_dominates() {
        let a = PackageVersion::parse("1:0.1").unwrap();
        let b = PackageVersion::parse("0:9.9").unwrap();
        assert!(a > b);
    }

    #[test]
    fn missing_revision_is_zero() {
        let a = PackageVersion::parse("1.0").unwrap();
        let b = PackageVersion::parse("1.0-0").unwrap();
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }
}
