//! Archive construction.
//!
//! [`ArchiveBuilder`] owns the output stream. Single files go straight to
//! [`entry::write_entry`]; directories go through [`walker::walk`], which
//! feeds every directory and leaf it finds back into the builder.

pub mod builder;
pub mod entry;
pub mod report;
pub mod walker;

pub use builder::ArchiveBuilder;
pub use entry::ArchiveEntryDescriptor;
pub use report::CreationReport;
pub use walker::UNBOUNDED_DEPTH;
