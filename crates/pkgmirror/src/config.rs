/*! Layered configuration: CLI flag > environment variable > YAML config file
> built-in default, as documented for the `mirror` sub-command. */

use {
    crate::error::{PkgMirrorError, Result},
    serde::Deserialize,
    std::path::PathBuf,
};

/// The subset of `mirror` settings a YAML file (`--config`) may supply.
///
/// Every field is optional: a config file may set as few or as many knobs
/// as it likes, and whatever it omits falls through to the CLI flag's
/// default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub destination: Option<PathBuf>,
    pub origin_url: Option<Vec<String>>,
    pub format: Option<String>,
    pub arch: Option<String>,
    pub requires_url: Option<Vec<String>>,
    pub bootstrap: Option<Vec<String>>,
    pub keep_existing: Option<bool>,
    pub threads: Option<usize>,
    pub connections: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        Ok(serde_yaml::from_reader(f)?)
    }
}

/// The fully resolved settings for one `mirror` invocation, after applying
/// CLI flag > environment variable > config file > default precedence.
pub struct Settings {
    pub destination: PathBuf,
    pub origin_url: Vec<String>,
    pub format: String,
    pub arch: String,
    pub requires_url: Vec<String>,
    pub bootstrap: Vec<String>,
    pub keep_existing: bool,
    pub threads: usize,
    pub connections: usize,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
}

/// Read `path` line by line, one relation/URL per line, skipping blank lines
/// and `#`-prefixed comments. Used for `--origin-file`/`--requires-file`/
/// `--bootstrap-file`.
pub fn read_list_file(path: &std::path::Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

impl Settings {
    /// `destination` and `origin_url` are required; everything else falls
    /// back through `file` then a built-in default.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve(
        destination: Option<PathBuf>,
        origin_url: Vec<String>,
        format: Option<String>,
        arch: Option<String>,
        requires_url: Vec<String>,
        bootstrap: Vec<String>,
        keep_existing: bool,
        threads: Option<usize>,
        connections: Option<usize>,
        file: Option<FileConfig>,
    ) -> Result<Self> {
        let file = file.unwrap_or_default();

        let destination = destination
            .or(file.destination)
            .ok_or_else(|| PkgMirrorError::InvalidArgument("--destination is required".into()))?;

        let origin_url = if origin_url.is_empty() {
            file.origin_url.unwrap_or_default()
        } else {
            origin_url
        };
        if origin_url.is_empty() {
            return Err(PkgMirrorError::InvalidArgument(
                "--origin-url or --origin-file is required".into(),
            ));
        }

        let format = format.or(file.format).unwrap_or_else(|| "deb".to_string());
        let arch = arch.or(file.arch).unwrap_or_else(|| "x86_64".to_string());

        let requires_url = if requires_url.is_empty() {
            file.requires_url.unwrap_or_default()
        } else {
            requires_url
        };

        let bootstrap = if bootstrap.is_empty() {
            file.bootstrap.unwrap_or_default()
        } else {
            bootstrap
        };

        let keep_existing = keep_existing || file.keep_existing.unwrap_or(false);

        let threads = threads
            .or(file.threads)
            .unwrap_or_else(num_cpus::get);
        let connections = connections.or(file.connections).unwrap_or(4);

        let http_proxy = std::env::var("HTTP_PROXY").ok();
        let https_proxy = std::env::var("HTTPS_PROXY").ok();

        Ok(Self {
            destination,
            origin_url,
            format,
            arch,
            requires_url,
            bootstrap,
            keep_existing,
            threads,
            connections,
            http_proxy,
            https_proxy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_take_precedence_over_file() {
        let file = FileConfig {
            format: Some("yum".to_string()),
            threads: Some(2),
            ..Default::default()
        };

        let settings = Settings::resolve(
            Some(PathBuf::from("/tmp/dest")),
            vec!["http://example.com".to_string()],
            Some("deb".to_string()),
            None,
            vec![],
            vec![],
            false,
            Some(8),
            None,
            Some(file),
        )
        .unwrap();

        assert_eq!(settings.format, "deb");
        assert_eq!(settings.threads, 8);
        assert_eq!(settings.arch, "x86_64");
    }

    #[test]
    fn missing_destination_is_invalid_argument() {
        let err = Settings::resolve(
            None,
            vec!["http://example.com".to_string()],
            None,
            None,
            vec![],
            vec![],
            false,
            None,
            None,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, PkgMirrorError::InvalidArgument(_)));
    }

    #[test]
    fn read_list_file_skips_blank_and_comment_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("origins.txt");
        std::fs::write(&path, "http://a.example.com\n\n# comment\nhttp://b.example.com\n").unwrap();

        let lines = read_list_file(&path).unwrap();
        assert_eq!(lines, vec!["http://a.example.com", "http://b.example.com"]);
    }
}
