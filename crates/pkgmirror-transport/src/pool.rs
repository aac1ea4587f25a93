/*! A bounded pool of HTTP(S)/file connections supporting range-resume and
bounded retries.

Structurally this is a port of the originating implementation's
`Connection`/`ConnectionsPool`/`ConnectionContext` (a `Queue`-backed pool of
reusable connection objects, each carrying its own retry budget) to Rust's
standard concurrency primitives: the queue becomes a bounded
`std::sync::mpsc` channel preloaded with one token per pool slot, and
`acquire()`/`release()` become `recv()`/`send()` on that channel.
*/

use {
    crate::error::{Result, TransportError},
    reqwest::{blocking::Client, header::RANGE},
    std::{
        fs::{File, OpenOptions},
        io::{Read, Seek, SeekFrom, Write},
        path::Path,
        sync::mpsc::{sync_channel, Receiver, SyncSender},
        time::Duration,
    },
    url::Url,
};

const CHUNK_SIZE: usize = 16 * 1024;

/// A readable byte stream over either an HTTP(S) response or a local file.
pub enum ReadableByteStream {
    Http(Box<reqwest::blocking::Response>),
    File(File),
}

impl Read for ReadableByteStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Http(r) => r.read(buf),
            Self::File(f) => f.read(buf),
        }
    }
}

/// Parse an origin location that may be a proper URL or a bare absolute path.
fn parse_location(location: &str) -> Result<Url> {
    match Url::parse(location) {
        Ok(url) => Ok(url),
        Err(_) if location.starts_with('/') => {
            Url::parse(&format!("file://{location}")).map_err(Into::into)
        }
        Err(e) => Err(TransportError::MalformedUrl(format!("{location}: {e}"))),
    }
}

/// One pool slot's worth of connection state: a shared HTTP client handle
/// and this slot's retry budget.
pub struct Connection<'p> {
    pool: &'p ConnectionPool,
}

impl<'p> Connection<'p> {
    /// Open a readable stream at `url`, optionally resuming from `offset`.
    ///
    /// Retries up to the pool's configured budget on transient I/O errors or
    /// HTTP 5xx, tracking the `Range` header against the current offset so
    /// retries resume rather than restart. Escalates to
    /// [TransportError::RangeUnsupported] if `offset > 0` and the server
    /// responds with anything other than 206 Partial Content.
    pub fn open_stream(&self, url: &Url, offset: u64) -> Result<ReadableByteStream> {
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| TransportError::MalformedUrl(url.to_string()))?;
            let mut file = File::open(&path)?;
            if offset > 0 {
                file.seek(SeekFrom::Start(offset))?;
            }
            return Ok(ReadableByteStream::File(file));
        }

        let mut retries_left = self.pool.retries;

        loop {
            let mut request = self.pool.client.get(url.clone());
            if offset > 0 {
                request = request.header(RANGE, format!("bytes={offset}-"));
            }

            log::debug!("start request: {url}");

            match request.send() {
                Ok(response) => {
                    let status = response.status();
                    log::debug!("finish request: {url} - {status}");

                    if offset > 0 && status.as_u16() != 206 {
                        return Err(TransportError::RangeUnsupported(url.to_string()));
                    }

                    if status.as_u16() >= 500 {
                        if retries_left > 0 {
                            retries_left -= 1;
                            log::warn!(
                                "retry: {url}, status {status} (retries left {retries_left})"
                            );
                            continue;
                        }
                        return Err(TransportError::PermanentHttp {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }

                    if !status.is_success() && status.as_u16() != 206 {
                        return Err(TransportError::PermanentHttp {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }

                    return Ok(ReadableByteStream::Http(Box::new(response)));
                }
                Err(e) => {
                    if retries_left == 0 {
                        return Err(TransportError::TransientIo {
                            url: url.to_string(),
                            source: std::io::Error::new(std::io::ErrorKind::Other, e),
                        });
                    }
                    retries_left -= 1;
                    log::error!("failed to open url: {e}. retries left ({retries_left})");
                }
            }
        }
    }

    /// Copy `url` into `dst_path`, creating parent directories as needed.
    ///
    /// If `dst_path` already has size `expected_size`, this is a no-op that
    /// returns that size immediately (the idempotent-resume fast path: a
    /// second mirror run over the same inputs should not re-fetch completed
    /// files). Otherwise copying resumes from the current file size; if the
    /// server refuses the resulting Range request the file is truncated and
    /// the fetch restarts from byte zero exactly once.
    pub fn retrieve(
        &self,
        url: &Url,
        dst_path: &Path,
        expected_size: Option<u64>,
    ) -> Result<u64> {
        if let Some(expected) = expected_size {
            if let Ok(metadata) = std::fs::metadata(dst_path) {
                if metadata.len() == expected {
                    return Ok(expected);
                }
            }
        }

        if let Some(parent) = dst_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let offset = std::fs::metadata(dst_path).map(|m| m.len()).unwrap_or(0);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(dst_path)?;

        let result = match self.copy_stream(&mut file, url, offset) {
            Ok(total) => Ok(total),
            Err(TransportError::RangeUnsupported(_)) if offset > 0 => {
                log::warn!("failed to resume download, starting from beginning: {url}");
                self.copy_stream(&mut file, url, 0)
            }
            Err(e) => Err(e),
        };

        file.sync_all()?;
        drop(file);

        result
    }

    fn copy_stream(&self, file: &mut File, url: &Url, offset: u64) -> Result<u64> {
        file.set_len(offset)?;
        file.seek(SeekFrom::Start(offset))?;

        let mut source = self.open_stream(url, offset)?;
        let mut buffer = [0u8; CHUNK_SIZE];
        let mut written = offset;

        loop {
            let n = source.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n])?;
            written += n as u64;
        }

        Ok(written)
    }
}

/// A bounded pool of connections, each gated by a preloaded token channel.
pub struct ConnectionPool {
    client: Client,
    retries: u32,
    tokens_tx: SyncSender<()>,
    tokens_rx: std::sync::Mutex<Receiver<()>>,
}

impl ConnectionPool {
    pub fn new(
        connection_count: usize,
        retries: u32,
        http_proxy: Option<&str>,
        https_proxy: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let connection_count = connection_count.max(1);

        let mut builder = Client::builder();
        if let Some(proxy) = http_proxy {
            builder = builder.proxy(reqwest::Proxy::http(proxy)?);
        }
        if let Some(proxy) = https_proxy {
            builder = builder.proxy(reqwest::Proxy::https(proxy)?);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;

        let (tx, rx) = sync_channel(connection_count);
        for _ in 0..connection_count {
            let _ = tx.try_send(());
        }

        Ok(Self {
            client,
            retries,
            tokens_tx: tx,
            tokens_rx: std::sync::Mutex::new(rx),
        })
    }

    /// Acquire from the pool; environment proxy variables seed the client
    /// when explicit proxy arguments were not given to [ConnectionPool::new].
    pub fn from_env(connection_count: usize, retries: u32) -> Result<Self> {
        let http_proxy = std::env::var("HTTP_PROXY").ok();
        let https_proxy = std::env::var("HTTPS_PROXY").ok();
        Self::new(
            connection_count,
            retries,
            http_proxy.as_deref(),
            https_proxy.as_deref(),
            None,
        )
    }

    /// Parse an origin location string, accepting both proper URLs and bare
    /// absolute filesystem paths.
    pub fn parse_location(&self, location: &str) -> Result<Url> {
        parse_location(location)
    }

    /// Acquire a connection slot, blocking until one is free.
    pub fn acquire(&self) -> Connection<'_> {
        self.tokens_rx
            .lock()
            .expect("token channel mutex poisoned")
            .recv()
            .expect("token channel closed while pool alive");
        Connection { pool: self }
    }
}

impl<'p> Drop for Connection<'p> {
    fn drop(&mut self) {
        let _ = self.pool.tokens_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_absolute_path() {
        let url = parse_location("/srv/mirror/pool/a.deb").unwrap();
        assert_eq!(url.scheme(), "file");
    }

    #[test]
    fn parses_http_url() {
        let url = parse_location("http://example.com/dists").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn retrieve_skips_when_already_complete() {
        let dir = tempfile::tempdir().unwrap();
        let dst = dir.path().join("file.bin");
        std::fs::write(&dst, b"0123456789").unwrap();

        let pool = ConnectionPool::new(1, 0, None, None, None).unwrap();
        let conn = pool.acquire();
        let url = Url::parse("file:///does/not/matter").unwrap();
        let total = conn.retrieve(&url, &dst, Some(10)).unwrap();
        assert_eq!(total, 10);
    }
}
