/*! The top-level `dists/<suite>/Release` file: a single control paragraph
shared by every `(suite, component)` pair under that suite, carrying
per-indices-file digest sections (`MD5Sum`, `SHA1`, `SHA256`).

Because a mirror operation rebuilds one `(suite, component, arch)` directory
at a time but several such rebuilds share the same top-level `Release`, every
read-modify-write of this file happens under an exclusive lock, ported from
the corpus's `tugger-common::http::download_to_path` locking pattern
(`fs2::FileExt::lock_exclusive`/`unlock` held across the whole critical
section) — never an append, per the specified "lock, read, modify, truncate,
write, unlock" discipline. */

use {
    crate::control::{ControlField, ControlParagraph, ControlParagraphReader},
    crate::error::{DebError, Result},
    chrono::Utc,
    digest::Digest,
    fs2::FileExt,
    std::{
        borrow::Cow,
        collections::BTreeMap,
        fs::OpenOptions,
        io::{BufReader, Read, Seek, SeekFrom, Write},
        path::Path,
    },
};

const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// One line of a `MD5Sum`/`SHA1`/`SHA256` section: `<digest> <size> <path>`.
#[derive(Clone, Debug)]
pub struct FileDigests {
    pub path: String,
    pub size: u64,
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

/// Digest a byte slice with all three algorithms tracked in `Release`.
pub fn digest_all(data: &[u8]) -> (String, String, String) {
    let md5 = format!("{:x}", md5::Md5::digest(data));
    let sha1 = format!("{:x}", sha1::Sha1::digest(data));
    let sha256 = format!("{:x}", sha2::Sha256::digest(data));
    (md5, sha1, sha256)
}

/// Parsed/mutated state of a top-level suite `Release` file.
pub struct Release {
    pub origin: Option<String>,
    pub label: Option<String>,
    pub suite: String,
    pub codename: Option<String>,
    pub architectures: Vec<String>,
    pub components: Vec<String>,
    /// Keyed by relative path (e.g. `main/binary-amd64/Packages`).
    files: BTreeMap<String, FileDigests>,
}

impl Release {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            origin: None,
            label: None,
            suite: suite.into(),
            codename: None,
            architectures: Vec::new(),
            components: Vec::new(),
            files: BTreeMap::new(),
        }
    }

    fn parse(paragraph: &ControlParagraph<'static>) -> Result<Self> {
        let suite = paragraph
            .field_str("Suite")
            .ok_or_else(|| DebError::ControlParse("Release file missing Suite field".into()))?
            .to_string();

        let mut release = Self::new(suite);
        release.origin = paragraph.field_str("Origin").map(str::to_string);
        release.label = paragraph.field_str("Label").map(str::to_string);
        release.codename = paragraph.field_str("Codename").map(str::to_string);
        release.architectures = paragraph.field_words("Architectures").map(str::to_string).collect();
        release.components = paragraph.field_words("Components").map(str::to_string).collect();

        for field_name in ["MD5Sum", "SHA1", "SHA256"] {
            let Some(field) = paragraph.field(field_name) else {
                continue;
            };

            for line in field.iter_lines() {
                let mut parts = line.split_whitespace();
                let (Some(digest), Some(size), Some(path)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    continue;
                };

                let size: u64 = size
                    .parse()
                    .map_err(|_| DebError::ControlParse(format!("bad size in Release: {line}")))?;

                let entry = release.files.entry(path.to_string()).or_insert_with(|| FileDigests {
                    path: path.to_string(),
                    size,
                    md5: String::new(),
                    sha1: String::new(),
                    sha256: String::new(),
                });

                match field_name {
                    "MD5Sum" => entry.md5 = digest.to_string(),
                    "SHA1" => entry.sha1 = digest.to_string(),
                    "SHA256" => entry.sha256 = digest.to_string(),
                    _ => unreachable!(),
                }
            }
        }

        Ok(release)
    }

    /// Record (or overwrite) the digests for one indices file, and track its
    /// component/architecture in the summary fields.
    pub fn set_file(&mut self, path: impl Into<String>, size: u64, md5: String, sha1: String, sha256: String) {
        let path = path.into();
        self.files.insert(
            path.clone(),
            FileDigests {
                path,
                size,
                md5,
                sha1,
                sha256,
            },
        );
    }

    pub fn add_component(&mut self, component: &str) {
        if !self.components.iter().any(|c| c == component) {
            self.components.push(component.to_string());
        }
    }

    pub fn add_architecture(&mut self, arch: &str) {
        if !self.architectures.iter().any(|a| a == arch) {
            self.architectures.push(arch.to_string());
        }
    }

    fn to_paragraph(&self) -> ControlParagraph<'static> {
        let mut paragraph = ControlParagraph::default();

        if let Some(origin) = &self.origin {
            paragraph.set_field_from_string(Cow::Borrowed("Origin"), Cow::Owned(origin.clone()));
        }
        if let Some(label) = &self.label {
            paragraph.set_field_from_string(Cow::Borrowed("Label"), Cow::Owned(label.clone()));
        }
        paragraph.set_field_from_string(Cow::Borrowed("Suite"), Cow::Owned(self.suite.clone()));
        if let Some(codename) = &self.codename {
            paragraph.set_field_from_string(Cow::Borrowed("Codename"), Cow::Owned(codename.clone()));
        }
        paragraph.set_field_from_string(Cow::Borrowed("Date"), Cow::Owned(Utc::now().format(DATE_FORMAT).to_string()));
        paragraph.set_field_from_string(
            Cow::Borrowed("Architectures"),
            Cow::Owned(self.architectures.join(" ")),
        );
        paragraph.set_field_from_string(Cow::Borrowed("Components"), Cow::Owned(self.components.join(" ")));

        for (field_name, pick) in [
            ("MD5Sum", (|f: &FileDigests| f.md5.clone()) as fn(&FileDigests) -> String),
            ("SHA1", |f| f.sha1.clone()),
            ("SHA256", |f| f.sha256.clone()),
        ] {
            let mut lines = Vec::new();
            for entry in self.files.values() {
                lines.push(format!(" {} {} {}", pick(entry), entry.size, entry.path));
            }
            paragraph.set_field(ControlField::new(
                Cow::Borrowed(field_name),
                Cow::Owned(lines.join("\n")),
            ));
        }

        paragraph
    }

    /// Read, apply `mutate`, and write back `path` under an exclusive lock
    /// held across the whole critical section. Creates an empty `Release`
    /// keyed on `suite` if the file does not yet exist.
    pub fn update_locked(
        path: &Path,
        suite: &str,
        mutate: impl FnOnce(&mut Release),
    ) -> Result<()> {
        let lock_path = path.with_extension("lock");
        let lock_file = std::fs::File::create(&lock_path)?;
        lock_file.lock_exclusive()?;

        let result = (|| -> Result<()> {
            let mut release = if path.exists() {
                let file = std::fs::File::open(path)?;
                let mut reader = ControlParagraphReader::new(BufReader::new(file));
                match reader.next() {
                    Some(paragraph) => Self::parse(&paragraph?)?,
                    None => Release::new(suite),
                }
            } else {
                Release::new(suite)
            };

            mutate(&mut release);

            let paragraph = release.to_paragraph();
            let mut buf = Vec::new();
            paragraph.write(&mut buf)?;

            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&buf)?;
            file.sync_all()?;

            Ok(())
        })();

        lock_file.unlock()?;
        result
    }
}

/// Parse a `Release` file from any reader (a local file, or a streamed
/// upstream fetch).
pub fn parse_reader(reader: impl Read) -> Result<Release> {
    let mut paragraphs = ControlParagraphReader::new(BufReader::new(reader));
    match paragraphs.next() {
        Some(paragraph) => Release::parse(&paragraph?),
        None => Err(DebError::ControlParse("empty Release file".into())),
    }
}

/// Read a `Release` file without locking (for callers that only need to
/// observe, not mutate, e.g. parsing an upstream origin's `Release`).
pub fn read(path: &Path) -> Result<Release> {
    parse_reader(std::fs::File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_locked_creates_and_rereads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Release");

        Release::update_locked(&path, "trusty", |release| {
            release.add_component("main");
            release.add_architecture("amd64");
            release.set_file(
                "main/binary-amd64/Packages",
                10,
                "d41d8cd98f00b204e9800998ecf8427e".into(),
                "da39a3ee5e6b4b0d3255bfef95601890afd80709".into(),
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855".into(),
            );
        })
        .unwrap();

        let release = read(&path).unwrap();
        assert_eq!(release.suite, "trusty");
        assert_eq!(release.components, vec!["main".to_string()]);
        assert_eq!(release.architectures, vec!["amd64".to_string()]);
    }

    #[test]
    fn update_locked_merges_across_components() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Release");

        Release::update_locked(&path, "trusty", |release| {
            release.add_component("main");
        })
        .unwrap();

        Release::update_locked(&path, "trusty", |release| {
            release.add_component("contrib");
        })
        .unwrap();

        let release = read(&path).unwrap();
        assert_eq!(release.components, vec!["main".to_string(), "contrib".to_string()]);
    }

    #[test]
    fn digest_all_matches_known_vectors() {
        let (md5, sha1, sha256) = digest_all(b"");
        assert_eq!(md5, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
