//! uuencode wrapper.
//!
//! Output is a `begin 644 -` line, one line per 45 input bytes (a length
//! character followed by four characters per three bytes), a lone backquote
//! line and `end`.

use std::io;
use std::io::BufRead;
use std::io::Read;
use std::io::Write;

const LINE_BYTES: usize = 45;
const HEADER: &[u8] = b"begin 644 -\n";
const FOOTER: &[u8] = b"`\nend\n";

#[inline]
const fn encode_char(value: u8) -> u8 {
    let value = value & 0x3f;
    if value == 0 { b'`' } else { value + 0x20 }
}

#[inline]
const fn decode_char(c: u8) -> u8 {
    c.wrapping_sub(0x20) & 0x3f
}

/// Streaming uuencoder.
pub struct UuEncoder<W: Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: Write> UuEncoder<W> {
    /// Writes the `begin` line to `inner`.
    pub fn new(mut inner: W) -> io::Result<Self> {
        inner.write_all(HEADER)?;
        Ok(Self {
            inner,
            pending: Vec::with_capacity(LINE_BYTES),
        })
    }

    /// Flushes the last partial line and the trailer, returning the writer.
    pub fn finish(mut self) -> io::Result<W> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit_line(&line)?;
        }
        self.inner.write_all(FOOTER)?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn emit_line(&mut self, chunk: &[u8]) -> io::Result<()> {
        let mut line = Vec::with_capacity(2 + chunk.len().div_ceil(3) * 4);
        // chunk.len() <= 45, fits in six bits
        #[allow(clippy::cast_possible_truncation)]
        line.push(encode_char(chunk.len() as u8));
        for group in chunk.chunks(3) {
            let b0 = group[0];
            let b1 = group.get(1).copied().unwrap_or(0);
            let b2 = group.get(2).copied().unwrap_or(0);
            line.push(encode_char(b0 >> 2));
            line.push(encode_char((b0 << 4) | (b1 >> 4)));
            line.push(encode_char((b1 << 2) | (b2 >> 6)));
            line.push(encode_char(b2));
        }
        line.push(b'\n');
        self.inner.write_all(&line)
    }
}

impl<W: Write> Write for UuEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut rest = buf;
        while !rest.is_empty() {
            let take = (LINE_BYTES - self.pending.len()).min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.pending.len() == LINE_BYTES {
                let line = std::mem::take(&mut self.pending);
                self.emit_line(&line)?;
                self.pending = line;
                self.pending.clear();
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Line-oriented uudecoder.
///
/// Leading text before the `begin` line is skipped, as is anything after
/// the terminating zero-length line.
pub struct UuDecoder<R: BufRead> {
    inner: R,
    started: bool,
    done: bool,
    line: String,
    decoded: Vec<u8>,
    position: usize,
}

impl<R: BufRead> UuDecoder<R> {
    /// Wraps a buffered reader positioned at or before the `begin` line.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            started: false,
            done: false,
            line: String::new(),
            decoded: Vec::new(),
            position: 0,
        }
    }

    fn next_line(&mut self) -> io::Result<bool> {
        self.line.clear();
        Ok(self.inner.read_line(&mut self.line)? != 0)
    }

    fn refill(&mut self) -> io::Result<()> {
        self.decoded.clear();
        self.position = 0;

        while !self.started {
            if !self.next_line()? {
                return Err(invalid("missing uuencode begin line"));
            }
            self.started = self.line.starts_with("begin ");
        }

        while self.decoded.is_empty() && !self.done {
            if !self.next_line()? {
                return Err(invalid("uuencoded data ends without an end line"));
            }
            let bytes = self.line.trim_end_matches(['\r', '\n']).as_bytes();
            if bytes.is_empty() || bytes == b"end" {
                self.done = true;
                break;
            }
            let length = usize::from(decode_char(bytes[0]));
            if length == 0 {
                self.done = true;
                break;
            }
            let body = &bytes[1..];
            if body.len() < length.div_ceil(3) * 4 {
                return Err(invalid("short uuencoded line"));
            }
            for group in body.chunks(4).take(length.div_ceil(3)) {
                let c0 = decode_char(group[0]);
                let c1 = decode_char(group[1]);
                let c2 = decode_char(group[2]);
                let c3 = decode_char(group[3]);
                self.decoded.push((c0 << 2) | (c1 >> 4));
                self.decoded.push((c1 << 4) | (c2 >> 2));
                self.decoded.push((c2 << 6) | c3);
            }
            self.decoded.truncate(length);
        }
        Ok(())
    }
}

impl<R: BufRead> Read for UuDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position == self.decoded.len() {
            if self.done {
                return Ok(0);
            }
            self.refill()?;
        }
        let available = &self.decoded[self.position..];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.position += count;
        Ok(count)
    }
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(payload: &[u8]) -> Vec<u8> {
        let mut encoder = UuEncoder::new(Vec::new()).unwrap();
        encoder.write_all(payload).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_known_encoding() {
        // Classic example: "Cat" encodes to "#0V%T".
        let text = String::from_utf8(encode(b"Cat")).unwrap();
        assert_eq!(text, "begin 644 -\n#0V%T\n`\nend\n");
    }

    #[test]
    fn test_line_length() {
        let text = String::from_utf8(encode(&[0xaa; 100])).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "begin 644 -");
        assert_eq!(lines[1].len(), 61);
        assert!(lines[1].starts_with('M'));
        assert_eq!(lines[2].len(), 61);
        // 10 remaining bytes
        assert!(lines[3].starts_with('*'));
        assert_eq!(lines[4], "`");
        assert_eq!(lines[5], "end");
    }

    #[test]
    fn test_zero_bytes_use_backquote() {
        let text = String::from_utf8(encode(&[0, 0, 0])).unwrap();
        assert_eq!(text.lines().nth(1).unwrap(), "#````");
    }

    #[test]
    fn test_decode_skips_preamble() {
        let mut input = b"some mail header\n\n".to_vec();
        input.extend(encode(b"payload after preamble"));
        let mut decoded = Vec::new();
        UuDecoder::new(Cursor::new(input))
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, b"payload after preamble");
    }

    #[test]
    fn test_decode_missing_begin() {
        let mut decoded = Vec::new();
        let err = UuDecoder::new(Cursor::new(b"no header here\n".to_vec()))
            .read_to_end(&mut decoded)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_empty_payload() {
        let bytes = encode(b"");
        assert_eq!(bytes, b"begin 644 -\n`\nend\n");
        let mut decoded = Vec::new();
        UuDecoder::new(Cursor::new(bytes))
            .read_to_end(&mut decoded)
            .unwrap();
        assert!(decoded.is_empty());
    }
}
