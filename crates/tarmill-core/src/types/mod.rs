//! Shared value types for archive entries.

pub mod entry_kind;

pub use entry_kind::EntryKind;
