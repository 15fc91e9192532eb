//! Mapping from the 1-9 compression level scale to codec parameters.
//!
//! - **1-3**: fast
//! - **6** or unset: codec default
//! - **7-9**: best
//!
//! Filters without a level (lz4, uu) ignore it.

/// Maps a level to a `flate2` compression setting.
#[must_use]
pub fn to_flate2(level: Option<u8>) -> flate2::Compression {
    match level {
        None | Some(6) => flate2::Compression::default(),
        Some(1..=3) => flate2::Compression::fast(),
        Some(7..=9) => flate2::Compression::best(),
        Some(n) => flate2::Compression::new(u32::from(n)),
    }
}

/// Maps a level to a `bzip2` block size.
#[must_use]
pub fn to_bzip2(level: Option<u8>) -> bzip2::Compression {
    match level {
        None | Some(6) => bzip2::Compression::default(),
        Some(1) => bzip2::Compression::fast(),
        Some(7..=9) => bzip2::Compression::best(),
        Some(n) => bzip2::Compression::new(u32::from(n.clamp(1, 9))),
    }
}

/// Maps a level to an liblzma preset, shared by xz, lzma and lzip.
#[must_use]
pub fn to_xz(level: Option<u8>) -> u32 {
    level.map_or(6, |n| u32::from(n.min(9)))
}

/// Maps a level to a zstd level; the zstd scale runs to 22.
#[must_use]
pub fn to_zstd(level: Option<u8>) -> i32 {
    match level {
        Some(1) => 1,
        Some(2) => 2,
        Some(7) => 10,
        Some(8) => 15,
        Some(9) => 19,
        _ => 3,
    }
}

/// Maps a level to the base-2 logarithm of the lzip dictionary size.
///
/// lzip headers can only encode a power of two without a fraction field, so
/// the dictionary is always a whole power of two between 1 MiB and 64 MiB.
#[must_use]
pub fn to_lzip_dictionary_log2(level: Option<u8>) -> u8 {
    match level {
        Some(1 | 2) => 20,
        Some(3 | 4) => 21,
        Some(5) => 22,
        Some(7) => 24,
        Some(8) => 25,
        Some(9) => 26,
        _ => 23,
    }
}
