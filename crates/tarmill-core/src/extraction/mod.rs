//! Archive extraction and listing.
//!
//! The engine pairs a read side ([`ArchiveReader`]) with a write side
//! ([`DiskWriter`]) and replays entries from one into the other, classifying
//! every step by [`Severity`].

pub mod disk;
pub mod engine;
pub mod reader;
pub mod severity;
pub mod workdir;

pub use disk::DiskWriter;
pub use disk::FsDiskWriter;
pub use engine::DATA_BLOCK_SIZE;
pub use engine::ExtractionEngine;
pub use engine::decompress;
pub use engine::list_archive;
pub use engine::replay;
pub use reader::ArchiveReader;
pub use reader::DataBlock;
pub use reader::EntryHeader;
pub use reader::TarEntryReader;
pub use severity::ExtractionOutcome;
pub use severity::Severity;
pub use severity::Status;
pub use severity::Step;
pub use workdir::WorkingDirGuard;
