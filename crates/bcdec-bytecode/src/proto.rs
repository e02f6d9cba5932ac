//! Function prototype representation

use bcdec_gc::StrRef;
use serde::Serialize;

use crate::constant::{NumberConstant, ObjectConstant};
use crate::instruction::Instruction;

/// Prototype flag bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProtoFlags(u8);

impl ProtoFlags {
    /// Has child prototypes
    pub const CHILD: Self = Self(0x01);
    /// Vararg function
    pub const VARARG: Self = Self(0x02);
    /// Uses FFI cdata constants
    pub const FFI: Self = Self(0x04);
    /// JIT disabled for this function
    pub const NOJIT: Self = Self(0x08);
    /// Loop patched to interpreter-only
    pub const ILOOP: Self = Self(0x10);

    /// Wrap raw flag bits
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw flag bits
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether all bits of `other` are set
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ProtoFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Debug metadata of a prototype
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DebugInfo {
    /// Size of the debug block in bytes
    pub size: u32,
    /// First source line
    pub first_line: u32,
    /// Number of source lines spanned
    pub line_count: u32,
    /// Line offset per real instruction
    pub line_info: Vec<u32>,
    /// Upvalue names
    pub upvalue_names: Vec<Vec<u8>>,
    /// Raw variable info
    pub var_info: Vec<u8>,
}

/// Size of the canonical prototype header in the colocated layout
pub const PROTO_HEADER_SIZE: usize = 72;

/// Size of one object reference in the colocated layout
const GCREF_SIZE: usize = 4;

/// Size of one numeric slot in the colocated layout
const TVALUE_SIZE: usize = 8;

/// A decoded function prototype
#[derive(Debug, Clone, Serialize)]
pub struct Prototype {
    /// Flags
    pub flags: ProtoFlags,
    /// Number of fixed parameters
    pub param_count: u8,
    /// Number of stack slots
    pub frame_size: u8,
    /// Number of upvalues
    pub upvalue_count: u16,
    /// Instructions; index 0 is the synthesized entry instruction
    pub instructions: Vec<Instruction>,
    /// Raw upvalue descriptors
    pub upvalues: Vec<u16>,
    /// Numeric constants in wire order
    pub numbers: Vec<NumberConstant>,
    /// Object constants in addressing order
    pub objects: Vec<ObjectConstant>,
    /// Debug metadata, when present
    pub debug: Option<DebugInfo>,
    /// Chunk name
    pub chunk_name: StrRef,
}

impl Prototype {
    /// Create a new prototype builder
    pub fn builder(chunk_name: StrRef) -> PrototypeBuilder {
        PrototypeBuilder::new(chunk_name)
    }

    /// Check if function is vararg
    #[inline]
    pub fn is_vararg(&self) -> bool {
        self.flags.contains(ProtoFlags::VARARG)
    }

    /// Iterate over direct children in addressing order
    pub fn children(&self) -> impl Iterator<Item = &Prototype> {
        self.objects.iter().filter_map(ObjectConstant::as_child)
    }

    /// Bytes this prototype occupies in the canonical colocated layout
    pub fn footprint(&self) -> usize {
        let mut size = PROTO_HEADER_SIZE
            + self.instructions.len() * 4
            + self.objects.len() * GCREF_SIZE;
        size = (size + TVALUE_SIZE - 1) & !(TVALUE_SIZE - 1);
        size += self.numbers.len() * TVALUE_SIZE;
        size += ((self.upvalues.len() + 1) & !1) * 2;
        if let Some(debug) = &self.debug {
            size += debug.size as usize;
        }
        size
    }
}

impl Drop for Prototype {
    // Child chains can be as deep as the container is long
    fn drop(&mut self) {
        let mut pending = Vec::new();
        take_children(&mut self.objects, &mut pending);
        while let Some(mut child) = pending.pop() {
            take_children(&mut child.objects, &mut pending);
        }
    }
}

fn take_children(objects: &mut Vec<ObjectConstant>, out: &mut Vec<Box<Prototype>>) {
    if !objects.iter().any(|o| matches!(o, ObjectConstant::Child(_))) {
        return;
    }
    for obj in std::mem::take(objects) {
        if let ObjectConstant::Child(child) = obj {
            out.push(child);
        }
    }
}

/// Builder for creating prototypes
#[derive(Debug)]
pub struct PrototypeBuilder {
    flags: ProtoFlags,
    param_count: u8,
    frame_size: u8,
    upvalue_count: u16,
    instructions: Vec<Instruction>,
    upvalues: Vec<u16>,
    numbers: Vec<NumberConstant>,
    objects: Vec<ObjectConstant>,
    debug: Option<DebugInfo>,
    chunk_name: StrRef,
}

impl PrototypeBuilder {
    /// Create a new prototype builder
    pub fn new(chunk_name: StrRef) -> Self {
        Self {
            flags: ProtoFlags::default(),
            param_count: 0,
            frame_size: 0,
            upvalue_count: 0,
            instructions: Vec::new(),
            upvalues: Vec::new(),
            numbers: Vec::new(),
            objects: Vec::new(),
            debug: None,
            chunk_name,
        }
    }

    /// Set flags
    pub fn flags(mut self, flags: ProtoFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set parameter count
    pub fn param_count(mut self, count: u8) -> Self {
        self.param_count = count;
        self
    }

    /// Set frame size
    pub fn frame_size(mut self, size: u8) -> Self {
        self.frame_size = size;
        self
    }

    /// Set upvalue count
    pub fn upvalue_count(mut self, count: u16) -> Self {
        self.upvalue_count = count;
        self
    }

    /// Set all instructions
    pub fn instructions(mut self, instructions: Vec<Instruction>) -> Self {
        self.instructions = instructions;
        self
    }

    /// Set upvalue descriptors
    pub fn upvalues(mut self, upvalues: Vec<u16>) -> Self {
        self.upvalues = upvalues;
        self
    }

    /// Set numeric constants
    pub fn numbers(mut self, numbers: Vec<NumberConstant>) -> Self {
        self.numbers = numbers;
        self
    }

    /// Set object constants (addressing order)
    pub fn objects(mut self, objects: Vec<ObjectConstant>) -> Self {
        self.objects = objects;
        self
    }

    /// Set debug metadata
    pub fn debug(mut self, debug: Option<DebugInfo>) -> Self {
        self.debug = debug;
        self
    }

    /// Build the prototype
    pub fn build(self) -> Prototype {
        Prototype {
            flags: self.flags,
            param_count: self.param_count,
            frame_size: self.frame_size,
            upvalue_count: self.upvalue_count,
            instructions: self.instructions,
            upvalues: self.upvalues,
            numbers: self.numbers,
            objects: self.objects,
            debug: self.debug,
            chunk_name: self.chunk_name,
        }
    }
}
