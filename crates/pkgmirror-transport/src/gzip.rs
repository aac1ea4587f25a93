/*! Transparent gzip inflate over a raw member stream.

Uses [flate2::read::GzDecoder], the synchronous counterpart of the gzip
decoders the corpus reaches for asynchronously (`async-compression`) —
`flate2` understands the gzip header itself, equivalent to the originating
implementation's `zlib.decompressobj(16 + zlib.MAX_WBITS)` window
configuration rather than a raw-deflate window.
*/

use {flate2::read::GzDecoder, std::io::Read};

/// Wrap `inner` in a gzip-decompressing reader.
pub fn decompress<R: Read>(inner: R) -> GzDecoder<R> {
    GzDecoder::new(inner)
}
