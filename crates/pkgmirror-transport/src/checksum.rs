/*! A checksum tee: a [Read] wrapper that feeds every byte through md5, sha1,
and sha256 concurrently as it streams past, matching the originating
implementation's per-chunk multi-hash checksum helpers. */

use {
    digest::Digest,
    std::io::{Read, Result},
};

/// Final digests and byte count produced by a [ChecksumTee] once fully read.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Digests {
    pub md5: Vec<u8>,
    pub sha1: Vec<u8>,
    pub sha256: Vec<u8>,
    pub bytes_read: u64,
}

/// Tees every byte read from `inner` through md5/sha1/sha256 hashers.
///
/// Digests are only meaningful once the stream has been read to EOF;
/// reading a prefix and discarding the rest yields a partial, meaningless
/// digest (same caveat as the corpus's own `ContentValidatingReader`).
pub struct ChecksumTee<R> {
    inner: R,
    md5: md5::Md5,
    sha1: sha1::Sha1,
    sha256: sha2::Sha256,
    bytes_read: u64,
}

impl<R: Read> ChecksumTee<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            md5: md5::Md5::new(),
            sha1: sha1::Sha1::new(),
            sha256: sha2::Sha256::new(),
            bytes_read: 0,
        }
    }

    /// Consume self, returning final digests. Only call after reading to EOF.
    pub fn finish(self) -> Digests {
        Digests {
            md5: self.md5.finalize().to_vec(),
            sha1: self.sha1.finalize().to_vec(),
            sha256: self.sha256.finalize().to_vec(),
            bytes_read: self.bytes_read,
        }
    }
}

impl<R: Read> Read for ChecksumTee<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.md5.update(&buf[..n]);
            self.sha1.update(&buf[..n]);
            self.sha256.update(&buf[..n]);
            self.bytes_read += n as u64;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read as _};

    #[test]
    fn tees_known_digests() {
        let mut tee = ChecksumTee::new(Cursor::new(b"hello world".to_vec()));
        let mut out = Vec::new();
        tee.read_to_end(&mut out).unwrap();
        let digests = tee.finish();

        assert_eq!(digests.bytes_read, 11);
        assert_eq!(hex::encode(&digests.md5), "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(
            hex::encode(&digests.sha256),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
