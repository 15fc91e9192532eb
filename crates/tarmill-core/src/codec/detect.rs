//! Read-side filter detection by magic bytes.

use super::CompressionType;
use super::lzip;
use super::uu;
use crate::ArchiveError;
use crate::Result;
use std::io;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;

/// Number of leading bytes inspected; large enough to reach the ustar magic.
pub const PROBE_LEN: usize = 512;

const USTAR_MAGIC_OFFSET: usize = 257;

/// Identifies the compression filter of a stream from its first bytes.
///
/// Returns `None` for an uncompressed tar stream or unrecognized data; the
/// tar reader reports the latter when it fails to parse a header.
///
/// # Examples
///
/// ```
/// use tarmill_core::CompressionType;
/// use tarmill_core::codec::detect;
///
/// assert_eq!(detect(&[0x1f, 0x8b, 0x08]), Some(CompressionType::Gzip));
/// assert_eq!(detect(b"BZh91AY"), Some(CompressionType::Bzip));
/// assert_eq!(detect(b"plain"), None);
/// ```
#[must_use]
pub fn detect(prefix: &[u8]) -> Option<CompressionType> {
    if prefix.starts_with(&[0x1f, 0x8b]) {
        return Some(CompressionType::Gzip);
    }
    if prefix.starts_with(b"BZh") {
        return Some(CompressionType::Bzip);
    }
    if prefix.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
        return Some(CompressionType::Xz);
    }
    if prefix.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
        return Some(CompressionType::Zstd);
    }
    if prefix.starts_with(&[0x04, 0x22, 0x4d, 0x18]) {
        return Some(CompressionType::Lz4);
    }
    if prefix.starts_with(b"LZIP") {
        return Some(CompressionType::Lzip);
    }
    if prefix.len() >= USTAR_MAGIC_OFFSET + 5
        && &prefix[USTAR_MAGIC_OFFSET..USTAR_MAGIC_OFFSET + 5] == b"ustar"
    {
        return None;
    }
    if prefix.starts_with(b"begin ") {
        return Some(CompressionType::Uu);
    }
    if is_lzma_alone(prefix) {
        return Some(CompressionType::Lzma);
    }
    None
}

/// `.lzma` has no magic: a properties byte below 225 followed by a
/// dictionary size and an uncompressed size that is either unknown
/// (all ones) or plausibly small.
fn is_lzma_alone(prefix: &[u8]) -> bool {
    if prefix.len() < 13 || prefix[0] >= 225 {
        return false;
    }
    let dictionary = u32::from_le_bytes([prefix[1], prefix[2], prefix[3], prefix[4]]);
    let size_unknown = prefix[5..13].iter().all(|&b| b == 0xff);
    let size_plausible = prefix[11] == 0 && prefix[12] == 0;
    dictionary.is_power_of_two() && dictionary >= 1 << 12 && (size_unknown || size_plausible)
}

/// Sniffs `reader` and wraps it in the matching decoder.
///
/// The probed bytes are replayed in front of the remaining input, so the
/// returned reader yields the complete decoded stream.
pub fn open_decoder<R: Read + 'static>(
    mut reader: R,
) -> Result<(Option<CompressionType>, Box<dyn Read>)> {
    let mut prefix = Vec::with_capacity(PROBE_LEN);
    (&mut reader)
        .take(PROBE_LEN as u64)
        .read_to_end(&mut prefix)?;

    let compression = detect(&prefix);
    let stream = Cursor::new(prefix).chain(reader);
    let unavailable = |source: io::Error, compression: CompressionType| {
        ArchiveError::FilterUnavailable {
            compression: compression.name(),
            source,
        }
    };

    let decoder: Box<dyn Read> = match compression {
        None => Box::new(stream),
        Some(CompressionType::Gzip) => Box::new(flate2::read::MultiGzDecoder::new(stream)),
        Some(CompressionType::Bzip) => Box::new(bzip2::read::MultiBzDecoder::new(stream)),
        Some(CompressionType::Lz4) => Box::new(lz4_flex::frame::FrameDecoder::new(stream)),
        Some(CompressionType::Lzma) => {
            let decoder = liblzma::stream::Stream::new_lzma_decoder(u64::MAX).map_err(|e| {
                unavailable(io::Error::other(e), CompressionType::Lzma)
            })?;
            Box::new(liblzma::read::XzDecoder::new_stream(stream, decoder))
        }
        Some(CompressionType::Lzip) => Box::new(lzip::LzipDecoder::new(BufReader::new(stream))),
        Some(CompressionType::Xz) => Box::new(liblzma::read::XzDecoder::new_multi_decoder(stream)),
        Some(CompressionType::Uu) => Box::new(uu::UuDecoder::new(BufReader::new(stream))),
        Some(CompressionType::Zstd) => Box::new(
            zstd::Decoder::new(stream)
                .map_err(|e| unavailable(e, CompressionType::Zstd))?,
        ),
    };

    Ok((compression, decoder))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::install;
    use std::io::Write;

    fn roundtrip(compression: CompressionType, payload: &[u8]) -> (Option<CompressionType>, Vec<u8>) {
        let mut writer = install(Vec::new(), compression, Some(1)).unwrap();
        writer.write_all(payload).unwrap();
        let bytes = writer.finish().unwrap();

        let (detected, mut reader) = open_decoder(Cursor::new(bytes)).unwrap();
        let mut decoded = Vec::new();
        reader.read_to_end(&mut decoded).unwrap();
        (detected, decoded)
    }

    #[test]
    fn test_every_filter_is_detected_and_decoded() {
        let payload = b"The quick brown fox jumps over the lazy dog. ".repeat(40);
        for compression in CompressionType::ALL {
            let (detected, decoded) = roundtrip(compression, &payload);
            assert_eq!(detected, Some(compression), "{compression}");
            assert_eq!(decoded, payload, "{compression}");
        }
    }

    #[test]
    fn test_plain_tar_is_not_filtered() {
        let mut header = vec![0u8; 512];
        header[257..262].copy_from_slice(b"ustar");
        assert_eq!(detect(&header), None);

        let (detected, mut reader) = open_decoder(Cursor::new(header.clone())).unwrap();
        let mut decoded = Vec::new();
        reader.read_to_end(&mut decoded).unwrap();
        assert_eq!(detected, None);
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_short_input() {
        assert_eq!(detect(&[]), None);
        assert_eq!(detect(&[0x1f]), None);
        let (detected, _) = open_decoder(Cursor::new(Vec::new())).unwrap();
        assert_eq!(detected, None);
    }

    #[test]
    fn test_lzma_heuristic_rejects_text() {
        assert!(!is_lzma_alone(b"hello world, not lzma"));
    }
}
