//! Container header

use std::io::Read;

use bcdec_gc::{Heap, StrRef};

use crate::cursor::BcCursor;
use crate::decoder::DecodeOptions;
use crate::error::{DecodeError, ErrorKind, Result};

/// First byte of every container
pub const SIGNATURE: u8 = 0x1b;

/// Container format version
pub const VERSION: u8 = 2;

/// Prologue following the signature byte
pub const MAGIC: [u8; 3] = [b'L', b'J', VERSION];

/// Container flag word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpFlags(u32);

impl DumpFlags {
    /// Payload words are big-endian
    pub const BE: u32 = 0x01;
    /// Debug info stripped, chunk name not stored
    pub const STRIP: u32 = 0x02;
    /// FFI constants present
    pub const FFI: u32 = 0x04;
    /// Two-slot frame layout (unsupported)
    pub const FR2: u32 = 0x08;
    /// All defined bits
    pub const KNOWN: u32 = Self::BE | Self::STRIP | Self::FFI | Self::FR2;

    /// Wrap a raw flag word
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw flag word
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether payload words are big-endian
    #[inline]
    pub fn is_big_endian(self) -> bool {
        self.0 & Self::BE != 0
    }

    /// Whether the container is stripped
    #[inline]
    pub fn is_stripped(self) -> bool {
        self.0 & Self::STRIP != 0
    }

    /// Whether the container uses FFI constants
    #[inline]
    pub fn has_ffi(self) -> bool {
        self.0 & Self::FFI != 0
    }
}

/// Validated container header
#[derive(Debug, Clone)]
pub struct Header {
    /// Container flags
    pub flags: DumpFlags,
    /// Chunk name, from the stream or the caller
    pub chunk_name: StrRef,
}

/// Validate the container prologue and flags and resolve the chunk name.
///
/// `source_name` becomes the chunk name of stripped containers.
pub fn read_header<R: Read>(
    cursor: &mut BcCursor<R>,
    heap: &mut Heap,
    options: &DecodeOptions,
    source_name: &[u8],
) -> Result<Header> {
    cursor.want(4 + 5 + 5)?;
    if cursor.remaining_buffered() < 4 {
        let buffered = cursor.remaining_buffered();
        let found = cursor.read_block(buffered)?.to_vec();
        return Err(DecodeError::new(ErrorKind::BadMagic { found }, 0));
    }
    let prologue = cursor.read_block(4)?;
    if prologue[0] != SIGNATURE || prologue[1..] != MAGIC {
        let found = prologue.to_vec();
        return Err(DecodeError::new(ErrorKind::BadMagic { found }, 0));
    }

    let at = cursor.position();
    let bits = cursor.read_varint()?;
    let flags = DumpFlags::from_bits(bits);
    if bits & !DumpFlags::KNOWN != 0
        || bits & DumpFlags::FR2 != 0
        || (flags.has_ffi() && !options.ffi)
    {
        return Err(DecodeError::new(ErrorKind::BadFlags { flags: bits }, at));
    }

    let chunk_name = if flags.is_stripped() {
        heap.intern(source_name)
    } else {
        let len = cursor.read_varint()? as usize;
        let name = cursor.read_block(len)?;
        heap.intern(name)
    };

    Ok(Header { flags, chunk_name })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8], options: DecodeOptions) -> Result<Header> {
        let mut heap = Heap::new();
        let mut cursor = BcCursor::new(bytes);
        read_header(&mut cursor, &mut heap, &options, b"@caller")
    }

    #[test]
    fn test_stripped_uses_caller_name() {
        let header = parse(&[0x1b, b'L', b'J', 2, 0x02], DecodeOptions::default()).unwrap();
        assert!(header.flags.is_stripped());
        assert_eq!(header.chunk_name.as_bytes(), b"@caller");
    }

    #[test]
    fn test_embedded_name() {
        let bytes = [0x1b, b'L', b'J', 2, 0x01, 3, b'a', b'b', b'c'];
        let header = parse(&bytes, DecodeOptions::default()).unwrap();
        assert!(header.flags.is_big_endian());
        assert_eq!(header.chunk_name.as_bytes(), b"abc");
    }

    #[test]
    fn test_rejects_fr2_and_unknown_bits() {
        for flags in [0x08, 0x10, 0x0a] {
            let err = parse(&[0x1b, b'L', b'J', 2, flags], DecodeOptions::default()).unwrap_err();
            assert!(matches!(err.kind, ErrorKind::BadFlags { .. }), "flags {flags:#x}");
        }
    }

    #[test]
    fn test_ffi_gate() {
        let bytes = [0x1b, b'L', b'J', 2, 0x06];
        assert!(parse(&bytes, DecodeOptions::default()).is_ok());
        let err = parse(&bytes, DecodeOptions::new().ffi(false)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BadFlags { flags: 6 }));
    }

    #[test]
    fn test_bad_magic() {
        let err = parse(&[0x1b, b'L', b'J', 1, 0x02], DecodeOptions::default()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::BadMagic { .. }));

        let err = parse(&[0x1b, b'L'], DecodeOptions::default()).unwrap_err();
        match err.kind {
            ErrorKind::BadMagic { found } => assert_eq!(found, vec![0x1b, b'L']),
            other => panic!("unexpected {other:?}"),
        }
    }
}
