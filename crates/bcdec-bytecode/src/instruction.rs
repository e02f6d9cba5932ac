//! Bytecode instructions
//!
//! A canonical instruction is one 32-bit word:
//!
//! ```text
//!  31      24 23      16 15       8 7        0
//! +----------+----------+----------+----------+
//! |    B     |    C     |    A     |    OP    |
//! +----------+----------+----------+----------+
//! |          D          |
//! ```

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// A single canonical instruction word
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Instruction(u32);

impl Instruction {
    /// Wrap a raw word
    #[inline]
    pub const fn from_raw(word: u32) -> Self {
        Self(word)
    }

    /// Build an `A D` form instruction
    #[inline]
    pub const fn ad(op: u8, a: u8, d: u16) -> Self {
        Self(op as u32 | (a as u32) << 8 | (d as u32) << 16)
    }

    /// Build an `A B C` form instruction
    #[inline]
    pub const fn abc(op: u8, a: u8, b: u8, c: u8) -> Self {
        Self(op as u32 | (a as u32) << 8 | (c as u32) << 16 | (b as u32) << 24)
    }

    /// Raw word
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Opcode
    #[inline]
    pub const fn op(self) -> u8 {
        self.0 as u8
    }

    /// Operand A
    #[inline]
    pub const fn a(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Operand B
    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Operand C
    #[inline]
    pub const fn c(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Operand D (overlaps B and C)
    #[inline]
    pub const fn d(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Replace the opcode
    #[inline]
    pub const fn with_op(self, op: u8) -> Self {
        Self(self.0 & !0xff | op as u32)
    }

    /// Replace operand A
    #[inline]
    pub const fn with_a(self, a: u8) -> Self {
        Self(self.0 & !0xff00 | (a as u32) << 8)
    }

    /// Replace operand B
    #[inline]
    pub const fn with_b(self, b: u8) -> Self {
        Self(self.0 & 0x00ff_ffff | (b as u32) << 24)
    }
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Instruction {{ op: {}, a: {}, b: {}, c: {}, d: {} }}",
            self.op(),
            self.a(),
            self.b(),
            self.c(),
            self.d()
        )
    }
}

impl Serialize for Instruction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Instruction", 5)?;
        s.serialize_field("op", &self.op())?;
        s.serialize_field("a", &self.a())?;
        s.serialize_field("b", &self.b())?;
        s.serialize_field("c", &self.c())?;
        s.serialize_field("d", &self.d())?;
        s.end()
    }
}
