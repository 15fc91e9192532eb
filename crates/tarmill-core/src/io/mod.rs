//! Stream adapters used on the write path.

pub mod counting;

pub use counting::CountingWriter;
