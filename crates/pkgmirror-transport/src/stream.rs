/*! Buffered line reading over an arbitrary byte source.

Grounded in the originating `Stream` class (a thin buffering wrapper adding
`read`/`readline`/`readlines` with an internal residual buffer on top of a
raw file-like object), expressed here on top of [std::io::BufReader] rather
than a hand-rolled buffer — the residual-buffer contract is exactly what
`BufReader` already guarantees.
*/

use std::io::{BufRead, BufReader, Read, Result};

/// A buffered line reader over `R`.
pub struct LineStream<R> {
    reader: BufReader<R>,
}

impl<R: Read> LineStream<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::with_capacity(64 * 1024, inner),
        }
    }

    /// Read up to `size` bytes, or everything remaining if `size` is `None`.
    pub fn read(&mut self, size: Option<usize>) -> Result<Vec<u8>> {
        match size {
            None => {
                let mut buf = Vec::new();
                self.reader.read_to_end(&mut buf)?;
                Ok(buf)
            }
            Some(size) => {
                let mut buf = vec![0u8; size];
                let mut filled = 0;
                while filled < size {
                    let n = self.reader.read(&mut buf[filled..])?;
                    if n == 0 {
                        break;
                    }
                    filled += n;
                }
                buf.truncate(filled);
                Ok(buf)
            }
        }
    }

    /// Read through and including the next newline, or to EOF. Returns an
    /// empty vector at EOF.
    pub fn readline(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        self.reader.read_until(b'\n', &mut line)?;
        Ok(line)
    }

    /// Iterate remaining lines (each including its trailing newline, except
    /// possibly the last).
    pub fn readlines(&mut self) -> impl Iterator<Item = Result<Vec<u8>>> + '_ {
        std::iter::from_fn(move || match self.readline() {
            Ok(line) if line.is_empty() => None,
            Ok(line) => Some(Ok(line)),
            Err(e) => Some(Err(e)),
        })
    }

    /// Regain the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_then_readlines() {
        let mut s = LineStream::new(Cursor::new(b"line1\nline2\nline3\n".to_vec()));
        assert_eq!(s.read(Some(5)).unwrap(), b"line1");
        let rest: Vec<Vec<u8>> = s.readlines().collect::<Result<_>>().unwrap();
        assert_eq!(rest, vec![b"\nline2\n".to_vec(), b"line3\n".to_vec()]);
    }

    #[test]
    fn readlines_from_start() {
        let mut s = LineStream::new(Cursor::new(b"a\nb\nc\n".to_vec()));
        let lines: Vec<Vec<u8>> = s.readlines().collect::<Result<_>>().unwrap();
        assert_eq!(lines, vec![b"a\n".to_vec(), b"b\n".to_vec(), b"c\n".to_vec()]);
    }
}
