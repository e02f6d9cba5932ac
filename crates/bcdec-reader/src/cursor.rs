//! Buffered byte cursor over a `Read` source
//!
//! The cursor keeps an owned staging buffer. Callers announce how many bytes
//! they are about to consume with [`BcCursor::need`] (hard requirement) or
//! [`BcCursor::want`] (best effort); the buffer is compacted and refilled
//! from the source until the requirement is met.

use std::io::{self, Read};

use crate::error::{DecodeError, ErrorKind, Result};

/// Bytes requested from the source per refill step
pub const REFILL_CHUNK: usize = 64 * 1024;

/// Largest single buffering requirement
pub const MAX_BUF: usize = 0x7fff_ff00;

/// Read cursor with refill buffer
pub struct BcCursor<R> {
    reader: R,
    buf: Vec<u8>,
    pos: usize,
    /// Stream offset of `buf[0]`
    base: u64,
    eof: bool,
}

impl<R: Read> BcCursor<R> {
    /// Wrap a byte source
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pos: 0,
            base: 0,
            eof: false,
        }
    }

    /// Absolute stream offset of the next byte.
    pub fn position(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// Bytes buffered and not yet consumed.
    pub fn remaining_buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether the source is exhausted and every buffered byte consumed.
    pub fn at_eof(&self) -> bool {
        self.eof && self.remaining_buffered() == 0
    }

    /// Ensure `n` bytes are buffered.
    pub fn need(&mut self, n: usize) -> Result<()> {
        if self.remaining_buffered() >= n {
            return Ok(());
        }
        self.fill(n)?;
        if self.remaining_buffered() < n {
            return Err(self.error(ErrorKind::TruncatedInput));
        }
        Ok(())
    }

    /// Try to buffer `n` bytes. Running out of input is not an error here.
    pub fn want(&mut self, n: usize) -> Result<()> {
        if self.remaining_buffered() >= n || self.eof {
            return Ok(());
        }
        self.fill(n)
    }

    fn fill(&mut self, n: usize) -> Result<()> {
        if n > MAX_BUF {
            return Err(self.error(ErrorKind::BufferLimit(n)));
        }
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.base += self.pos as u64;
            self.pos = 0;
        }
        while self.buf.len() < n && !self.eof {
            let len = self.buf.len();
            // The buffer grows only by bytes actually received
            self.buf.resize(len + REFILL_CHUNK, 0);
            match self.reader.read(&mut self.buf[len..]) {
                Ok(0) => {
                    self.buf.truncate(len);
                    self.eof = true;
                }
                Ok(read) => self.buf.truncate(len + read),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => self.buf.truncate(len),
                Err(e) => {
                    self.buf.truncate(len);
                    return Err(self.error(ErrorKind::Io(e)));
                }
            }
        }
        Ok(())
    }

    /// Next buffered byte, without consuming it
    pub fn peek_u8(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Consume `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.need(n)?;
        self.pos += n;
        Ok(())
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.need(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    /// Borrow the next `n` bytes and consume them.
    pub fn read_block(&mut self, n: usize) -> Result<&[u8]> {
        self.need(n)?;
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..start + n])
    }

    /// Read a `u16` in the given byte order.
    pub fn read_u16(&mut self, big_endian: bool) -> Result<u16> {
        let b = self.read_block(2)?;
        let b = [b[0], b[1]];
        Ok(if big_endian {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        })
    }

    /// Read a `u32` in the given byte order.
    pub fn read_u32(&mut self, big_endian: bool) -> Result<u32> {
        let b = self.read_block(4)?;
        let b = [b[0], b[1], b[2], b[3]];
        Ok(if big_endian {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }

    /// Read an unsigned LEB128 value. Bits beyond 32 are dropped.
    pub fn read_varint(&mut self) -> Result<u32> {
        let mut v = 0u32;
        let mut shift = 0u32;
        loop {
            let b = self.read_u8()?;
            if shift < 32 {
                v |= ((b & 0x7f) as u32) << shift;
            }
            if b < 0x80 {
                return Ok(v);
            }
            shift = shift.saturating_add(7);
        }
    }

    /// Read a 33-bit varint: the first byte's low bit is a discriminant,
    /// followed by a 6-bit value chunk.
    pub fn read_varint33(&mut self) -> Result<(u32, bool)> {
        let first = self.read_u8()?;
        let tagged = first & 1 != 0;
        let mut v = ((first >> 1) & 0x3f) as u32;
        if first >= 0x80 {
            let mut shift = 6u32;
            loop {
                let b = self.read_u8()?;
                if shift < 32 {
                    v |= ((b & 0x7f) as u32) << shift;
                }
                if b < 0x80 {
                    break;
                }
                shift = shift.saturating_add(7);
            }
        }
        Ok((v, tagged))
    }

    /// Error of `kind` at the current position
    pub(crate) fn error(&self, kind: ErrorKind) -> DecodeError {
        DecodeError::new(kind, self.position())
    }
}
