/*! [DebDriver]: the [FormatDriver] implementation for Debian-style APT
repositories, grounded on `binary_package_control.rs`'s field layout
(`Depends`/`Pre-Depends` -> requires, `Replaces` -> obsoletes, `Provides` ->
provides) and on `repository/release.rs`'s field names. */

use {
    crate::{
        control::{ControlParagraph, ControlParagraphReader},
        error::{DebError, Result},
        release::{self, Release},
        version::PackageVersion,
    },
    pkgmirror_index::{
        package::{Architecture, ChecksumSet, Package, Repository},
        relation::{Operator, PackageRelation, RelationLink, VersionRange},
    },
    pkgmirror_manager::{Context, FormatDriver, ParsedUrl},
    std::{
        io::{BufRead, BufReader, Read},
        path::{Path, PathBuf},
        sync::Arc,
    },
};

/// Map an [Architecture] to the Debian `binary-<arch>` directory suffix.
fn arch_to_debian(arch: Architecture) -> &'static str {
    match arch {
        Architecture::X86_64 => "amd64",
        Architecture::I386 => "i386",
        Architecture::Source => "Source",
    }
}

fn arch_from_debian(s: &str) -> Result<Architecture> {
    match s {
        "amd64" => Ok(Architecture::X86_64),
        "i386" => Ok(Architecture::I386),
        "Source" | "source" => Ok(Architecture::Source),
        other => Err(DebError::UnknownArchitecture(other.to_string())),
    }
}

fn parse_operator(s: &str) -> Option<Operator> {
    match s {
        ">>" => Some(Operator::Gt),
        "<<" => Some(Operator::Lt),
        "=" => Some(Operator::Eq),
        ">=" => Some(Operator::Ge),
        "<=" => Some(Operator::Le),
        _ => None,
    }
}

fn operator_token(op: Operator) -> &'static str {
    match op {
        Operator::Gt => ">>",
        Operator::Lt => "<<",
        Operator::Eq => "=",
        Operator::Ge => ">=",
        Operator::Le => "<=",
        Operator::None => "",
    }
}

/// Parse one `name`, `name (op version)`, or `name:arch (op version)` link.
fn parse_single_link(raw: &str) -> Result<RelationLink<PackageVersion>> {
    let raw = raw.trim();

    let (name_part, constraint) = match raw.find('(') {
        Some(pos) => {
            let constraint = raw[pos + 1..]
                .trim_end_matches(')')
                .trim();
            (raw[..pos].trim(), Some(constraint))
        }
        None => (raw, None),
    };

    // Strip a `:arch` multiarch qualifier; the mirror does not distinguish
    // per-architecture dependency variants.
    let name = name_part.split(':').next().unwrap_or(name_part).to_string();

    let version = match constraint {
        None => VersionRange::any(PackageVersion::parse("0")?),
        Some(constraint) => {
            let mut parts = constraint.splitn(2, char::is_whitespace);
            let op_token = parts.next().unwrap_or("");
            let version_str = parts.next().unwrap_or("").trim();

            let operator = parse_operator(op_token)
                .ok_or_else(|| DebError::MalformedRelation(raw.to_string()))?;
            let version = PackageVersion::parse(version_str)?;
            VersionRange::new(operator, version)
        }
    };

    Ok(RelationLink {
        name,
        version,
    })
}

/// Parse a `Depends:`-style field value: comma-separated relation groups,
/// each group a `|`-separated alternative chain.
fn parse_relation_field(value: &str) -> Result<Vec<PackageRelation<PackageVersion>>> {
    let mut relations = Vec::new();

    for group in value.split(',') {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }

        let links: Vec<RelationLink<PackageVersion>> = group
            .split('|')
            .map(parse_single_link)
            .collect::<Result<_>>()?;

        relations.push(PackageRelation::new(links));
    }

    Ok(relations)
}

/// Parse a plain (non-alternating) list field like `Provides:`/`Replaces:`
/// into flat [RelationLink]s (the first link of each comma group; Debian
/// does not permit `|` alternatives in these fields).
fn parse_plain_list(value: &str) -> Result<Vec<RelationLink<PackageVersion>>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_single_link)
        .collect()
}

/// The Debian/APT [FormatDriver].
///
/// Holds the shared [Context] (connection pool + worker pool) it was
/// constructed with, per the component design's "Driver constructed per
/// operation with a reference to the Context".
pub struct DebDriver {
    context: Arc<Context>,
}

impl DebDriver {
    pub fn new(context: Arc<Context>) -> Self {
        Self { context }
    }

    fn fetch_to_string(&self, url: &str) -> Result<String> {
        let parsed = self.context.connections.parse_location(url)?;
        let conn = self.context.connections.acquire();
        let stream = conn.open_stream(&parsed, 0)?;
        let mut data = String::new();
        BufReader::new(stream).read_to_string(&mut data)?;
        Ok(data)
    }

    fn fetch_packages_paragraphs(&self, packages_url: &str) -> Result<Vec<ControlParagraph<'static>>> {
        let parsed = self.context.connections.parse_location(packages_url)?;
        let conn = self.context.connections.acquire();
        let stream = conn.open_stream(&parsed, 0)?;

        let reader: Box<dyn BufRead> = if packages_url.ends_with(".gz") {
            Box::new(BufReader::new(pkgmirror_transport::gzip_decompress(stream)))
        } else {
            Box::new(BufReader::new(stream))
        };

        ControlParagraphReader::new(reader).collect()
    }

    fn package_from_paragraph(
        &self,
        paragraph: &ControlParagraph<'static>,
        repository: &Arc<Repository>,
    ) -> Result<Package<PackageVersion>> {
        let name = paragraph
            .field_str("Package")
            .ok_or_else(|| DebError::MalformedIndex("missing Package field".into()))?
            .to_string();

        let version_str = paragraph
            .field_str("Version")
            .ok_or_else(|| DebError::MalformedIndex(format!("{name}: missing Version field")))?;
        let version = PackageVersion::parse(version_str)?;

        let filename = paragraph
            .field_str("Filename")
            .ok_or_else(|| DebError::MalformedIndex(format!("{name}: missing Filename field")))?
            .to_string();

        let filesize = paragraph
            .field_str("Size")
            .and_then(|s| s.parse::<u64>().ok());

        let mandatory = matches!(
            paragraph.field_str("Priority"),
            Some("required") | Some("important") | Some("standard")
        );

        let mut requires = Vec::new();
        if let Some(depends) = paragraph.field_str("Depends") {
            requires.extend(parse_relation_field(depends)?);
        }
        if let Some(pre_depends) = paragraph.field_str("Pre-Depends") {
            requires.extend(parse_relation_field(pre_depends)?);
        }

        let provides = match paragraph.field_str("Provides") {
            Some(v) => parse_plain_list(v)?,
            None => Vec::new(),
        };
        let obsoletes = match paragraph.field_str("Replaces") {
            Some(v) => parse_plain_list(v)?,
            None => Vec::new(),
        };

        let mut checksum = ChecksumSet::default();
        if let Some(md5) = paragraph.field_str("MD5sum") {
            checksum.md5 = hex::decode(md5).ok();
        }
        if let Some(sha1) = paragraph.field_str("SHA1") {
            checksum.sha1 = hex::decode(sha1).ok();
        }
        if let Some(sha256) = paragraph.field_str("SHA256") {
            checksum.sha256 = hex::decode(sha256).ok();
        }

        Ok(Package::new(
            name,
            version,
            filename,
            filesize,
            checksum,
            mandatory,
            requires,
            provides,
            obsoletes,
            Arc::clone(repository),
        ))
    }
}

impl FormatDriver for DebDriver {
    type Version = PackageVersion;
    type Error = DebError;

    fn parse_urls(&self, raw_urls: &[String]) -> std::result::Result<Vec<ParsedUrl>, DebError> {
        let mut parsed = Vec::new();

        for raw in raw_urls {
            let mut tokens = raw.split_whitespace();
            let base = tokens
                .next()
                .ok_or_else(|| DebError::MalformedUrl(raw.clone()))?;
            let base = base
                .trim_end_matches('/')
                .trim_end_matches("/dists")
                .trim_end_matches('/')
                .to_string();

            let suite = tokens
                .next()
                .ok_or_else(|| DebError::MalformedUrl(raw.clone()))?
                .to_string();

            let components: Vec<&str> = tokens.collect();
            if components.is_empty() {
                return Err(DebError::MalformedUrl(raw.clone()));
            }

            for component in components {
                parsed.push(ParsedUrl::new(base.clone(), vec![suite.clone(), component.to_string()]));
            }
        }

        Ok(parsed)
    }

    fn parse_relation(&self, raw: &str) -> std::result::Result<PackageRelation<PackageVersion>, DebError> {
        let links: Vec<RelationLink<PackageVersion>> = raw
            .split('|')
            .map(parse_single_link)
            .collect::<Result<_>>()?;

        Ok(PackageRelation::new(links))
    }

    fn get_repository(
        &self,
        parsed: &ParsedUrl,
        arch: Architecture,
    ) -> std::result::Result<Arc<Repository>, DebError> {
        let [suite, component] = &parsed.labels[..] else {
            return Err(DebError::MalformedUrl(parsed.base.clone()));
        };

        let release_url = format!("{}/dists/{suite}/Release", parsed.base);
        let data = self.fetch_to_string(&release_url)?;
        let release = release::parse_reader(data.as_bytes())?;

        Ok(Arc::new(Repository::new(
            vec![suite.clone(), component.clone()],
            arch,
            release.origin.unwrap_or_else(|| parsed.base.clone()),
            format!("{}/dists/{suite}", parsed.base),
        )))
    }

    fn get_packages(
        &self,
        repository: &Arc<Repository>,
        sink: &mut dyn FnMut(Package<PackageVersion>),
    ) -> std::result::Result<(), DebError> {
        let [_suite, component] = &repository.name[..] else {
            return Err(DebError::MalformedUrl(repository.label()));
        };

        let arch_dir = arch_to_debian(repository.architecture);
        let packages_url = format!(
            "{}/{component}/binary-{arch_dir}/Packages.gz",
            repository.url
        );

        let paragraphs = match self.fetch_packages_paragraphs(&packages_url) {
            Ok(paragraphs) => paragraphs,
            Err(DebError::Transport(_)) => {
                // Fall back to the uncompressed sibling.
                let packages_url = format!(
                    "{}/{component}/binary-{arch_dir}/Packages",
                    repository.url
                );
                self.fetch_packages_paragraphs(&packages_url)?
            }
            Err(e) => return Err(e),
        };

        for paragraph in paragraphs {
            let package = self.package_from_paragraph(&paragraph, repository)?;
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
    ) -> std::result::Result<Repository, DebError> {
        let [suite, component] = &repository.name[..] else {
            return Err(DebError::MalformedUrl(repository.label()));
        };

        let arch_dir = arch_to_debian(repository.architecture);
        let dir = destination_root
            .join("dists")
            .join(suite)
            .join(component)
            .join(format!("binary-{arch_dir}"));
        std::fs::create_dir_all(&dir)?;

        let pool_dir = destination_root.join("pool").join(component);
        std::fs::create_dir_all(&pool_dir)?;

        Ok(repository.with_url(dir.to_string_lossy().into_owned()))
    }

    fn assign_packages(
        &self,
        mirror_repository: &Repository,
        packages: &[Package<PackageVersion>],
        keep_existing: bool,
    ) -> std::result::Result<(), DebError> {
        if keep_existing {
            return Ok(());
        }

        let pool_dir = pool_dir_for(mirror_repository);
        let Ok(entries) = std::fs::read_dir(&pool_dir) else {
            return Ok(());
        };

        let selected: std::collections::HashSet<&str> =
            packages.iter().map(|p| p.filename.as_str()).collect();

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if !selected.iter().any(|f| f.ends_with(name)) {
                let _ = std::fs::remove_file(&path);
            }
        }

        Ok(())
    }

    fn rebuild_repository(
        &self,
        mirror_repository: &Repository,
        packages: &[Package<PackageVersion>],
    ) -> std::result::Result<(), DebError> {
        let [suite, component] = &mirror_repository.name[..] else {
            return Err(DebError::MalformedUrl(mirror_repository.label()));
        };

        let mut buf = Vec::new();
        for package in packages {
            writeln_package(&mut buf, package)?;
        }

        let packages_path = Path::new(&mirror_repository.url).join("Packages");
        std::fs::write(&packages_path, &buf)?;

        let mut gz_buf = Vec::new();
        {
            use flate2::{write::GzEncoder, Compression};
            let mut encoder = GzEncoder::new(&mut gz_buf, Compression::default());
            std::io::Write::write_all(&mut encoder, &buf)?;
            encoder.finish()?;
        }
        let gz_path = Path::new(&mirror_repository.url).join("Packages.gz");
        std::fs::write(&gz_path, &gz_buf)?;

        let (md5, sha1, sha256) = release::digest_all(&buf);
        let (gz_md5, gz_sha1, gz_sha256) = release::digest_all(&gz_buf);

        let arch_dir = arch_to_debian(mirror_repository.architecture);
        let packages_rel_path = format!("{component}/binary-{arch_dir}/Packages");
        let gz_rel_path = format!("{component}/binary-{arch_dir}/Packages.gz");

        // Top-level suite Release lives one level above `<component>/binary-<arch>`.
        let suite_dir = Path::new(&mirror_repository.url)
            .parent()
            .and_then(Path::parent)
            .ok_or_else(|| DebError::MalformedUrl(mirror_repository.url.clone()))?;
        let release_path = suite_dir.join("Release");

        Release::update_locked(&release_path, suite, |release| {
            release.add_component(component);
            release.add_architecture(arch_dir);
            release.set_file(packages_rel_path.clone(), buf.len() as u64, md5.clone(), sha1.clone(), sha256.clone());
            release.set_file(gz_rel_path.clone(), gz_buf.len() as u64, gz_md5.clone(), gz_sha1.clone(), gz_sha256.clone());
        })?;

        Ok(())
    }
}

fn pool_dir_for(mirror_repository: &Repository) -> PathBuf {
    // `<dest>/dists/<suite>/<component>/binary-<arch>` -> `<dest>/pool/<component>`.
    Path::new(&mirror_repository.url)
        .ancestors()
        .nth(3)
        .map(|dests_root| dests_root.join("pool").join(&mirror_repository.name[1]))
        .unwrap_or_else(|| PathBuf::from("pool"))
}

fn writeln_package(buf: &mut Vec<u8>, package: &Package<PackageVersion>) -> std::io::Result<()> {
    use std::io::Write;

    writeln!(buf, "Package: {}", package.name)?;
    writeln!(buf, "Version: {}", package.version)?;
    writeln!(buf, "Filename: {}", package.filename)?;
    if let Some(size) = package.filesize {
        writeln!(buf, "Size: {size}")?;
    }
    if let Some(md5) = &package.checksum.md5 {
        writeln!(buf, "MD5sum: {}", hex::encode(md5))?;
    }
    if let Some(sha1) = &package.checksum.sha1 {
        writeln!(buf, "SHA1: {}", hex::encode(sha1))?;
    }
    if let Some(sha256) = &package.checksum.sha256 {
        writeln!(buf, "SHA256: {}", hex::encode(sha256))?;
    }
    if !package.requires.is_empty() {
        let depends = package
            .requires
            .iter()
            .map(|relation| {
                relation
                    .iter()
                    .map(|link| format_link(link))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(buf, "Depends: {depends}")?;
    }
    if !package.provides.is_empty() {
        writeln!(
            buf,
            "Provides: {}",
            package.provides.iter().map(format_link).collect::<Vec<_>>().join(", ")
        )?;
    }
    if !package.obsoletes.is_empty() {
        writeln!(
            buf,
            "Replaces: {}",
            package.obsoletes.iter().map(format_link).collect::<Vec<_>>().join(", ")
        )?;
    }
    writeln!(buf)
}

fn format_link(link: &RelationLink<PackageVersion>) -> String {
    match link.version.operator {
        Operator::None => link.name.clone(),
        op => format!("{} ({} {})", link.name, operator_token(op), link.version.version),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_urls_expands_components() {
        let driver = DebDriver::new(Arc::new(test_context()));
        let urls = driver
            .parse_urls(&["http://archive.ubuntu.com/ubuntu/ trusty main restricted".to_string()])
            .unwrap();

        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].base, "http://archive.ubuntu.com/ubuntu");
        assert_eq!(urls[0].labels, vec!["trusty".to_string(), "main".to_string()]);
        assert_eq!(urls[1].labels, vec!["trusty".to_string(), "restricted".to_string()]);
    }

    #[test]
    fn parse_relation_handles_alternatives() {
        let driver = DebDriver::new(Arc::new(test_context()));
        let relation = driver.parse_relation("libfoo (>= 1.0)| libbar").unwrap();
        assert_eq!(relation.len(), 2);
        assert_eq!(relation.primary_name(), "libfoo");
    }

    #[test]
    fn relation_field_parses_depends() {
        let relations = parse_relation_field("libc6 (>= 2.1), libssl (>= 1.0) | libssl1.1").unwrap();
        assert_eq!(relations.len(), 2);
        assert_eq!(relations[1].len(), 2);
    }

    fn test_context() -> Context {
        let connections = pkgmirror_transport::ConnectionPool::new(1, 0, None, None, None).unwrap();
        let section = pkgmirror_transport::AsyncSection::new(1, 4);
        Context::new(connections, section, 0)
    }
}
