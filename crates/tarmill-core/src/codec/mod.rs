//! Compression filter registry.
//!
//! Every archive stream passes through exactly one filter selected by
//! [`CompressionType`]. The write side is a fixed dispatch from the type's
//! ordinal to the encoder that wraps the output file; the read side sniffs
//! the leading bytes of an archive and picks the matching decoder (see
//! [`detect`]).
//!
//! | Ordinal | Type   | Encoder                                |
//! |---------|--------|----------------------------------------|
//! | 0       | Gzip   | `flate2` gzip member                   |
//! | 1       | Bzip   | `bzip2` stream                         |
//! | 2       | Lz4    | `lz4_flex` frame                       |
//! | 3       | Lzma   | `liblzma` legacy `.lzma` stream        |
//! | 4       | Lzip   | raw LZMA1 in an lzip member            |
//! | 5       | Xz     | `liblzma` `.xz` stream                 |
//! | 6       | Uu     | uuencoded text                         |
//! | 7       | Zstd   | `zstd` frame                           |

pub mod detect;
pub mod level;
pub mod lzip;
pub mod uu;

use crate::ArchiveError;
use crate::Result;
use std::fmt;
use std::io;
use std::io::Write;
use std::str::FromStr;

pub use detect::detect;
pub use detect::open_decoder;

/// Compression filter applied to the archive byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompressionType {
    /// Deflate in a gzip wrapper.
    Gzip = 0,
    /// Burrows-Wheeler bzip2.
    Bzip = 1,
    /// LZ4 frame format.
    Lz4 = 2,
    /// Legacy `.lzma` (LZMA-alone) stream.
    Lzma = 3,
    /// lzip member format.
    Lzip = 4,
    /// LZMA2 in an `.xz` container.
    Xz = 5,
    /// uuencoded text; no compression.
    Uu = 6,
    /// Zstandard frame.
    Zstd = 7,
}

impl CompressionType {
    /// All filters, indexed by ordinal.
    pub const ALL: [Self; 8] = [
        Self::Gzip,
        Self::Bzip,
        Self::Lz4,
        Self::Lzma,
        Self::Lzip,
        Self::Xz,
        Self::Uu,
        Self::Zstd,
    ];

    /// Returns the short name used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip => "bzip2",
            Self::Lz4 => "lz4",
            Self::Lzma => "lzma",
            Self::Lzip => "lzip",
            Self::Xz => "xz",
            Self::Uu => "uu",
            Self::Zstd => "zstd",
        }
    }

    /// Returns the conventional file extension of a tar archive with this
    /// filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarmill_core::CompressionType;
    ///
    /// assert_eq!(CompressionType::Gzip.extension(), "tar.gz");
    /// assert_eq!(CompressionType::Lzip.extension(), "tar.lz");
    /// ```
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Gzip => "tar.gz",
            Self::Bzip => "tar.bz2",
            Self::Lz4 => "tar.lz4",
            Self::Lzma => "tar.lzma",
            Self::Lzip => "tar.lz",
            Self::Xz => "tar.xz",
            Self::Uu => "tar.uu",
            Self::Zstd => "tar.zst",
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for CompressionType {
    type Error = ArchiveError;

    fn try_from(value: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| ArchiveError::UnsupportedCompression {
                value: value.to_string(),
            })
    }
}

impl FromStr for CompressionType {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        let found = match lower.as_str() {
            "gz" | "gzip" => Self::Gzip,
            "bz2" | "bzip" | "bzip2" => Self::Bzip,
            "lz4" => Self::Lz4,
            "lzma" => Self::Lzma,
            "lz" | "lzip" => Self::Lzip,
            "xz" => Self::Xz,
            "uu" | "uuencode" => Self::Uu,
            "zst" | "zstd" => Self::Zstd,
            _ => {
                return Err(ArchiveError::UnsupportedCompression {
                    value: s.to_string(),
                });
            }
        };
        Ok(found)
    }
}

/// Writer with one compression filter installed over `W`.
///
/// [`finish`](Self::finish) must be called to flush the filter trailer and
/// get the underlying writer back. Dropping a `FilterWriter` without
/// finishing leaves a truncated stream for most filters.
pub enum FilterWriter<W: Write> {
    /// gzip encoder.
    Gzip(flate2::write::GzEncoder<W>),
    /// bzip2 encoder.
    Bzip(bzip2::write::BzEncoder<W>),
    /// LZ4 frame encoder.
    Lz4(lz4_flex::frame::FrameEncoder<W>),
    /// `.lzma` encoder.
    Lzma(liblzma::write::XzEncoder<W>),
    /// lzip member encoder.
    Lzip(lzip::LzipEncoder<W>),
    /// `.xz` encoder.
    Xz(liblzma::write::XzEncoder<W>),
    /// uuencoder.
    Uu(uu::UuEncoder<W>),
    /// zstd encoder.
    Zstd(zstd::Encoder<'static, W>),
}

impl<W: Write> FilterWriter<W> {
    /// Returns which filter is installed.
    #[must_use]
    pub const fn compression(&self) -> CompressionType {
        match self {
            Self::Gzip(_) => CompressionType::Gzip,
            Self::Bzip(_) => CompressionType::Bzip,
            Self::Lz4(_) => CompressionType::Lz4,
            Self::Lzma(_) => CompressionType::Lzma,
            Self::Lzip(_) => CompressionType::Lzip,
            Self::Xz(_) => CompressionType::Xz,
            Self::Uu(_) => CompressionType::Uu,
            Self::Zstd(_) => CompressionType::Zstd,
        }
    }

    /// Writes the filter trailer and returns the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Gzip(encoder) => encoder.finish(),
            Self::Bzip(encoder) => encoder.finish(),
            Self::Lz4(encoder) => encoder.finish().map_err(io::Error::other),
            Self::Lzma(encoder) | Self::Xz(encoder) => encoder.finish(),
            Self::Lzip(encoder) => encoder.finish(),
            Self::Uu(encoder) => encoder.finish(),
            Self::Zstd(encoder) => encoder.finish(),
        }
    }

    fn as_write(&mut self) -> &mut dyn Write {
        match self {
            Self::Gzip(encoder) => encoder,
            Self::Bzip(encoder) => encoder,
            Self::Lz4(encoder) => encoder,
            Self::Lzma(encoder) | Self::Xz(encoder) => encoder,
            Self::Lzip(encoder) => encoder,
            Self::Uu(encoder) => encoder,
            Self::Zstd(encoder) => encoder,
        }
    }
}

impl<W: Write> Write for FilterWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.as_write().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.as_write().flush()
    }
}

impl<W: Write> fmt::Debug for FilterWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FilterWriter")
            .field(&self.compression())
            .finish()
    }
}

/// Installs the write filter for `compression` over `sink`.
///
/// `level` is on the 1-9 scale and mapped per codec (see [`level`]).
///
/// # Errors
///
/// Returns [`ArchiveError::FilterUnavailable`] if the codec refuses the
/// requested parameters or fails to write its header.
///
/// # Examples
///
/// ```
/// use std::io::Write;
/// use tarmill_core::CompressionType;
/// use tarmill_core::codec::install;
///
/// let mut writer = install(Vec::new(), CompressionType::Gzip, None)?;
/// writer.write_all(b"payload")?;
/// let bytes = writer.finish()?;
/// assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn install<W: Write>(
    sink: W,
    compression: CompressionType,
    level: Option<u8>,
) -> Result<FilterWriter<W>> {
    let unavailable = |source: io::Error| ArchiveError::FilterUnavailable {
        compression: compression.name(),
        source,
    };

    let writer = match compression {
        CompressionType::Gzip => FilterWriter::Gzip(flate2::write::GzEncoder::new(
            sink,
            level::to_flate2(level),
        )),
        CompressionType::Bzip => {
            FilterWriter::Bzip(bzip2::write::BzEncoder::new(sink, level::to_bzip2(level)))
        }
        CompressionType::Lz4 => FilterWriter::Lz4(lz4_flex::frame::FrameEncoder::new(sink)),
        CompressionType::Lzma => {
            let options = liblzma::stream::LzmaOptions::new_preset(level::to_xz(level))
                .map_err(|e| unavailable(io::Error::other(e)))?;
            let stream = liblzma::stream::Stream::new_lzma_encoder(&options)
                .map_err(|e| unavailable(io::Error::other(e)))?;
            FilterWriter::Lzma(liblzma::write::XzEncoder::new_stream(sink, stream))
        }
        CompressionType::Lzip => {
            FilterWriter::Lzip(lzip::LzipEncoder::new(sink, level).map_err(unavailable)?)
        }
        CompressionType::Xz => {
            FilterWriter::Xz(liblzma::write::XzEncoder::new(sink, level::to_xz(level)))
        }
        CompressionType::Uu => FilterWriter::Uu(uu::UuEncoder::new(sink).map_err(unavailable)?),
        CompressionType::Zstd => FilterWriter::Zstd(
            zstd::Encoder::new(sink, level::to_zstd(level)).map_err(unavailable)?,
        ),
    };

    log::debug!("installed {compression} write filter");
    Ok(writer)
}
