//! Byte-counting stream adapters.
//!
//! The archive builder wraps its output file in a [`CountingWriter`] below
//! the compression filter to report the compressed size, and the lzip
//! encoder uses one to size its member trailer.

use std::io;
use std::io::Write;

/// Writer adapter that counts bytes accepted by the inner writer.
///
/// Only bytes the inner writer reports as written are counted, so a failed
/// `write_all` leaves the count at what actually reached the sink.
///
/// # Examples
///
/// ```
/// use std::io::Write;
/// use tarmill_core::io::CountingWriter;
///
/// let mut writer = CountingWriter::new(Vec::new());
/// writer.write_all(b"ustar")?;
/// assert_eq!(writer.total_bytes(), 5);
/// assert_eq!(writer.into_inner(), b"ustar");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W> CountingWriter<W> {
    /// Wraps `inner` with a zero count.
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.count
    }

    /// Returns the wrapped writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Borrows the wrapped writer.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.count += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
