//! lzip member encoder and streaming decoder.
//!
//! A member is a 6-byte header (`LZIP`, version 1, coded dictionary size),
//! a raw LZMA1 stream terminated by an end-of-payload marker, and a 20-byte
//! trailer holding the CRC32 and size of the decoded data plus the size of
//! the whole member. The LZMA1 coding itself is delegated to `liblzma`.

use super::level;
use crate::io::CountingWriter;
use liblzma::stream::Action;
use liblzma::stream::Filters;
use liblzma::stream::LzmaOptions;
use liblzma::stream::Status;
use liblzma::stream::Stream;
use std::io;
use std::io::BufRead;
use std::io::Read;
use std::io::Write;

const MAGIC: &[u8; 4] = b"LZIP";
const VERSION: u8 = 1;
const HEADER_LEN: usize = 6;
const TRAILER_LEN: usize = 20;
const MIN_DICTIONARY_LOG2: u8 = 12;
const MAX_DICTIONARY_LOG2: u8 = 29;

/// Streaming lzip encoder producing a single member.
pub struct LzipEncoder<W: Write> {
    inner: liblzma::write::XzEncoder<CountingWriter<W>>,
    crc: crc32fast::Hasher,
    data_size: u64,
}

impl<W: Write> LzipEncoder<W> {
    /// Writes the member header to `sink` and prepares the LZMA1 stream.
    pub fn new(mut sink: W, compression_level: Option<u8>) -> io::Result<Self> {
        let dictionary_log2 = level::to_lzip_dictionary_log2(compression_level);
        let options = lzma_options(level::to_xz(compression_level), 1 << dictionary_log2)?;
        let mut filters = Filters::new();
        filters.lzma1(&options);
        let stream = Stream::new_raw_encoder(&filters)?;

        sink.write_all(MAGIC)?;
        sink.write_all(&[VERSION, dictionary_log2])?;

        Ok(Self {
            inner: liblzma::write::XzEncoder::new_stream(CountingWriter::new(sink), stream),
            crc: crc32fast::Hasher::new(),
            data_size: 0,
        })
    }

    /// Finishes the LZMA1 stream, appends the trailer, and returns the sink.
    pub fn finish(self) -> io::Result<W> {
        let counting = self.inner.finish()?;
        let member_size = (HEADER_LEN + TRAILER_LEN) as u64 + counting.total_bytes();
        let mut sink = counting.into_inner();

        sink.write_all(&self.crc.finalize().to_le_bytes())?;
        sink.write_all(&self.data_size.to_le_bytes())?;
        sink.write_all(&member_size.to_le_bytes())?;
        Ok(sink)
    }
}

impl<W: Write> Write for LzipEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.crc.update(&buf[..written]);
        self.data_size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Member currently being decoded.
struct Member {
    stream: Stream,
    crc: crc32fast::Hasher,
    data_size: u64,
}

/// Streaming decoder for one or more concatenated lzip members.
///
/// Each member's trailer is checked as soon as its end-of-payload marker
/// is decoded, so a corrupt member fails before the next one is read.
pub struct LzipDecoder<R: BufRead> {
    inner: R,
    member: Option<Member>,
    members_read: usize,
    done: bool,
}

impl<R: BufRead> LzipDecoder<R> {
    /// Wraps `inner`; nothing is read until the first call to `read`.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            member: None,
            members_read: 0,
            done: false,
        }
    }

    /// Reads the next member header. Returns `false` at a clean end of
    /// input after at least one member.
    fn start_member(&mut self) -> io::Result<bool> {
        if self.inner.fill_buf()?.is_empty() {
            if self.members_read == 0 {
                return Err(invalid("empty lzip stream"));
            }
            return Ok(false);
        }

        let mut header = [0u8; HEADER_LEN];
        self.inner
            .read_exact(&mut header)
            .map_err(|_| invalid("truncated lzip header"))?;
        if &header[..4] != MAGIC {
            return Err(invalid("missing lzip magic"));
        }
        if header[4] != VERSION {
            return Err(invalid("unsupported lzip version"));
        }

        let options = lzma_options(6, decode_dictionary_size(header[5])?)?;
        let mut filters = Filters::new();
        filters.lzma1(&options);
        self.member = Some(Member {
            stream: Stream::new_raw_decoder(&filters)?,
            crc: crc32fast::Hasher::new(),
            data_size: 0,
        });
        Ok(true)
    }

    /// Reads and checks the trailer of the member that just ended.
    fn finish_member(&mut self, member: Member) -> io::Result<()> {
        let mut trailer = [0u8; TRAILER_LEN];
        self.inner
            .read_exact(&mut trailer)
            .map_err(|_| invalid("truncated lzip trailer"))?;

        let expected_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        if member.crc.finalize() != expected_crc {
            return Err(invalid("lzip CRC mismatch"));
        }
        if le_u64(&trailer[4..12]) != member.data_size {
            return Err(invalid("lzip data size mismatch"));
        }
        let member_size = (HEADER_LEN + TRAILER_LEN) as u64 + member.stream.total_in();
        if le_u64(&trailer[12..20]) != member_size {
            return Err(invalid("lzip member size mismatch"));
        }
        self.members_read += 1;
        Ok(())
    }
}

impl<R: BufRead> Read for LzipDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.done {
                return Ok(0);
            }
            let Some(mut member) = self.member.take() else {
                if !self.start_member()? {
                    self.done = true;
                }
                continue;
            };

            let (produced, consumed, eof, status) = {
                let input = self.inner.fill_buf()?;
                let eof = input.is_empty();
                let before_out = member.stream.total_out();
                let before_in = member.stream.total_in();
                let action = if eof { Action::Finish } else { Action::Run };
                let status = member.stream.process(input, buf, action)?;
                let produced = usize::try_from(member.stream.total_out() - before_out)
                    .map_err(|_| invalid("lzip block overflows"))?;
                let consumed = usize::try_from(member.stream.total_in() - before_in)
                    .map_err(|_| invalid("lzip block overflows"))?;
                (produced, consumed, eof, status)
            };
            self.inner.consume(consumed);
            member.crc.update(&buf[..produced]);
            member.data_size += produced as u64;

            if status == Status::StreamEnd {
                self.finish_member(member)?;
            } else if produced == 0 && eof {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated lzip member",
                ));
            } else if produced == 0 && consumed == 0 {
                return Err(invalid("corrupt lzip stream"));
            } else {
                self.member = Some(member);
            }

            if produced > 0 {
                return Ok(produced);
            }
        }
    }
}

fn decode_dictionary_size(coded: u8) -> io::Result<u32> {
    let log2 = coded & 0x1f;
    if !(MIN_DICTIONARY_LOG2..=MAX_DICTIONARY_LOG2).contains(&log2) {
        return Err(invalid("invalid lzip dictionary size"));
    }
    let base = 1u32 << log2;
    Ok(base - (base / 16) * u32::from(coded >> 5))
}

fn lzma_options(preset: u32, dictionary_size: u32) -> io::Result<LzmaOptions> {
    let mut options = LzmaOptions::new_preset(preset)?;
    options
        .dict_size(dictionary_size)
        .literal_context_bits(3)
        .literal_position_bits(0)
        .position_bits(2);
    Ok(options)
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}
