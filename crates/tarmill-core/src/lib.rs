//! Tar archive construction and extraction with pluggable compression.
//!
//! `tarmill-core` builds ustar archives from filesystem trees through an
//! iterative, depth-bounded traversal, and replays archives onto disk
//! through a severity-classified extraction loop that always restores the
//! process working directory.
//!
//! # Examples
//!
//! ```no_run
//! use tarmill_core::ArchiveBuilder;
//! use tarmill_core::ArchiveOptions;
//! use tarmill_core::CompressionType;
//! use tarmill_core::ExtractOptions;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ArchiveOptions::default().with_compression(CompressionType::Xz);
//! let mut builder = ArchiveBuilder::new("backup.tar.xz", options)?;
//! builder.add_directory("project")?;
//! let created = builder.close()?;
//! println!("Archived {} files", created.files_added);
//!
//! let extracted = tarmill_core::decompress("backup.tar.xz", "restore", ExtractOptions::default())?;
//! println!("Extracted {} files", extracted.files_extracted);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod creation;
pub mod error;
pub mod extraction;
pub mod io;
pub mod probe;
pub mod report;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export main API types
pub use codec::CompressionType;
pub use config::ArchiveOptions;
pub use config::ExtractOptions;
pub use creation::ArchiveBuilder;
pub use creation::CreationReport;
pub use creation::UNBOUNDED_DEPTH;
pub use error::ArchiveError;
pub use error::Result;
pub use extraction::EntryHeader;
pub use extraction::ExtractionEngine;
pub use extraction::decompress;
pub use extraction::list_archive;
pub use probe::FileMetadata;
pub use probe::MetadataProbe;
pub use report::ExtractionReport;
pub use types::EntryKind;
