//! Container driver

use std::io::Read;

use bcdec_bytecode::Prototype;
use bcdec_gc::{Heap, StrRef};

use crate::cursor::BcCursor;
use crate::error::{DecodeError, ErrorKind, Result, chunk_display_name};
use crate::header::{DumpFlags, read_header};

/// Deepest chain of child prototypes below a root
pub const MAX_NESTING: u32 = 200;

/// Decoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Accept containers that carry FFI constants (default: true)
    pub ffi: bool,
    /// Accept prototypes that carry debug info (default: false)
    pub allow_debug_info: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            ffi: true,
            allow_debug_info: false,
        }
    }
}

impl DecodeOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set FFI acceptance
    pub fn ffi(mut self, value: bool) -> Self {
        self.ffi = value;
        self
    }

    /// Set debug info acceptance
    pub fn allow_debug_info(mut self, value: bool) -> Self {
        self.allow_debug_info = value;
        self
    }
}

/// Decodes obfuscated containers into prototype trees
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    /// Create a decoder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with custom options
    pub fn with_options(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Current options
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode one container from `reader`, interning strings into `heap`.
    ///
    /// `source_name` names the chunk in errors and becomes the chunk name of
    /// stripped containers.
    pub fn decode<R: Read>(
        &self,
        heap: &mut Heap,
        reader: R,
        source_name: &str,
    ) -> Result<Prototype> {
        self.run(heap, BcCursor::new(reader), source_name)
            .map_err(|e| e.with_chunk(chunk_display_name(source_name)))
    }

    /// Decode a container held in memory
    pub fn decode_bytes(
        &self,
        heap: &mut Heap,
        bytes: &[u8],
        source_name: &str,
    ) -> Result<Prototype> {
        self.decode(heap, bytes, source_name)
    }

    fn run<R: Read>(
        &self,
        heap: &mut Heap,
        mut cursor: BcCursor<R>,
        source_name: &str,
    ) -> Result<Prototype> {
        let header = read_header(&mut cursor, heap, &self.options, source_name.as_bytes())?;
        tracing::debug!(
            flags = header.flags.bits(),
            chunk = %header.chunk_name,
            "container header"
        );
        let mut session = Session {
            cursor,
            heap,
            flags: header.flags,
            options: self.options,
            chunk_name: header.chunk_name,
            stack: Vec::new(),
            scratch: Vec::new(),
        };
        session.read_container()
    }
}

/// State of one decode: the cursor, the heap, and the stack of finished
/// prototypes waiting to be claimed by a parent
pub(crate) struct Session<'h, R> {
    pub(crate) cursor: BcCursor<R>,
    pub(crate) heap: &'h mut Heap,
    pub(crate) flags: DumpFlags,
    pub(crate) options: DecodeOptions,
    pub(crate) chunk_name: StrRef,
    pub(crate) stack: Vec<(Prototype, u32)>,
    /// Reusable buffer for unmasked strings
    pub(crate) scratch: Vec<u8>,
}

impl<R: Read> Session<'_, R> {
    fn read_container(&mut self) -> Result<Prototype> {
        loop {
            self.cursor.want(1)?;
            match self.cursor.peek_u8() {
                Some(0) => {
                    self.cursor.skip(1)?;
                    break;
                }
                Some(_) => {}
                None => return Err(self.cursor.error(ErrorKind::TruncatedInput)),
            }

            self.cursor.want(5)?;
            let len = self.cursor.read_varint()? as usize;
            if len == 0 {
                break;
            }
            self.cursor.need(len)?;
            let start = self.cursor.position();
            let (proto, depth) = self.read_proto()?;
            let actual = self.cursor.position() - start;
            if actual != len as u64 {
                return Err(DecodeError::new(
                    ErrorKind::LengthMismatch {
                        expected: len as u64,
                        actual,
                    },
                    start,
                ));
            }

            tracing::debug!(
                offset = start,
                len,
                instructions = proto.instructions.len(),
                objects = proto.objects.len(),
                footprint = proto.footprint(),
                "decoded prototype"
            );
            self.stack.push((proto, depth));
        }

        self.cursor.want(1)?;
        if self.cursor.remaining_buffered() > 0 || self.stack.len() != 1 {
            return Err(self.cursor.error(ErrorKind::TrailingData));
        }
        self.stack
            .pop()
            .map(|(proto, _)| proto)
            .ok_or_else(|| self.cursor.error(ErrorKind::TrailingData))
    }

    /// Capacity hint for `count` elements: never more than the bytes buffered
    pub(crate) fn capacity_hint(&self, count: usize) -> usize {
        count.min(self.cursor.remaining_buffered())
    }
}
