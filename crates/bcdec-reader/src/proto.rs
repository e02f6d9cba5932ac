//! Prototype record decoding

use std::io::Read;

use bcdec_bytecode::{
    DebugInfo, FUNCF, FUNCV, Instruction, NumberConstant, ObjectConstant, ProtoFlags, Prototype,
};
use bcdec_gc::StrRef;

use crate::decoder::{MAX_NESTING, Session};
use crate::deobf::{restore_instruction, unchain_header, unmask_into};
use crate::error::{DecodeError, ErrorKind, Result};

/// Object constant discriminants
const KGC_CHILD: u32 = 0;
const KGC_TAB: u32 = 1;
const KGC_I64: u32 = 2;
const KGC_U64: u32 = 3;
const KGC_COMPLEX: u32 = 4;
const KGC_STR: u32 = 5;

/// Sizes announced by a record before its payload
struct DebugHeader {
    size: u32,
    first_line: u32,
    line_count: u32,
}

impl<R: Read> Session<'_, R> {
    /// Decode one prototype record and its nesting depth. The driver has
    /// already consumed the record length.
    pub(crate) fn read_proto(&mut self) -> Result<(Prototype, u32)> {
        let raw = self.cursor.read_block(4)?;
        let header = unchain_header([raw[0], raw[1], raw[2], raw[3]]);
        let flags = ProtoFlags::from_bits(header.flags);

        let num_count = self.cursor.read_varint()? as usize;
        let obj_count = self.cursor.read_varint()? as usize;
        let bc_count = self.cursor.read_varint()? as usize + 1;

        let debug = if self.flags.is_stripped() {
            None
        } else {
            self.read_debug_header()?
        };

        let entry = if flags.contains(ProtoFlags::VARARG) {
            FUNCV
        } else {
            FUNCF
        };
        let mut instructions = Vec::with_capacity(self.capacity_hint(bc_count));
        instructions.push(Instruction::ad(entry, header.frame_size, 0));
        self.read_instructions(bc_count - 1, &mut instructions)?;

        let big_endian = self.flags.is_big_endian();
        let uv_count = header.upvalue_count as usize;
        let mut upvalues = Vec::with_capacity(uv_count);
        for _ in 0..uv_count {
            upvalues.push(self.cursor.read_u16(big_endian)?);
        }

        let numbers = self.read_numbers(num_count)?;
        let (objects, depth) = self.read_objects(obj_count)?;
        tracing::trace!(
            numbers = numbers.len(),
            objects = objects.len(),
            upvalues = upvalues.len(),
            "constant pools"
        );

        let debug = match debug {
            Some(h) => Some(self.read_debug_block(h, bc_count - 1, uv_count)?),
            None => None,
        };

        let proto = Prototype::builder(self.chunk_name.clone())
            .flags(flags)
            .param_count(header.param_count)
            .frame_size(header.frame_size)
            .upvalue_count(header.upvalue_count as u16)
            .instructions(instructions)
            .upvalues(upvalues)
            .numbers(numbers)
            .objects(objects)
            .debug(debug)
            .build();
        Ok((proto, depth))
    }

    fn read_debug_header(&mut self) -> Result<Option<DebugHeader>> {
        let at = self.cursor.position();
        let size = self.cursor.read_varint()?;
        if size == 0 {
            return Ok(None);
        }
        if !self.options.allow_debug_info {
            // Step over what a debug-carrying record places next. The record
            // is rejected either way, so read failures here do not matter.
            let _ = self.cursor.skip(4);
            for _ in 0..5 {
                let _ = self.cursor.read_varint();
            }
            return Err(DecodeError::new(ErrorKind::UnexpectedDebugInfo, at));
        }
        let first_line = self.cursor.read_varint()?;
        let line_count = self.cursor.read_varint()?;
        Ok(Some(DebugHeader {
            size,
            first_line,
            line_count,
        }))
    }

    fn read_instructions(&mut self, count: usize, out: &mut Vec<Instruction>) -> Result<()> {
        let base = self.cursor.position();
        let big_endian = self.flags.is_big_endian();
        let block = self.cursor.read_block(count.saturating_mul(4))?;
        for (i, word) in block.chunks_exact(4).enumerate() {
            let word = [word[0], word[1], word[2], word[3]];
            let word = if big_endian {
                u32::from_be_bytes(word)
            } else {
                u32::from_le_bytes(word)
            };
            let ins = restore_instruction(word, i as u8).map_err(|op| {
                DecodeError::new(ErrorKind::BadOpcode(op), base + 4 * i as u64)
            })?;
            out.push(ins);
        }
        Ok(())
    }

    fn read_numbers(&mut self, count: usize) -> Result<Vec<NumberConstant>> {
        let mut numbers = Vec::with_capacity(self.capacity_hint(count));
        for _ in 0..count {
            let (lo, wide) = self.cursor.read_varint33()?;
            let n = if wide {
                let hi = self.cursor.read_varint()?;
                NumberConstant::Float(f64::from_bits(join(lo, hi)))
            } else {
                NumberConstant::Int(lo as i32)
            };
            numbers.push(n);
        }
        Ok(numbers)
    }

    /// Object pool plus the nesting depth its children give the prototype
    fn read_objects(&mut self, count: usize) -> Result<(Vec<ObjectConstant>, u32)> {
        let mut objects = Vec::with_capacity(self.capacity_hint(count));
        let mut depth = 0u32;
        for _ in 0..count {
            let at = self.cursor.position();
            let tp = self.cursor.read_varint()?;
            let obj = match tp {
                KGC_CHILD => {
                    let Some((child, child_depth)) = self.stack.pop() else {
                        return Err(DecodeError::new(ErrorKind::StackUnderflow, at));
                    };
                    depth = depth.max(child_depth + 1);
                    if depth > MAX_NESTING {
                        return Err(DecodeError::new(ErrorKind::NestingTooDeep(depth), at));
                    }
                    ObjectConstant::Child(Box::new(child))
                }
                KGC_TAB => ObjectConstant::Table(self.read_template_table()?),
                KGC_I64 => ObjectConstant::Int64(self.read_u64()? as i64),
                KGC_U64 => ObjectConstant::UInt64(self.read_u64()?),
                KGC_COMPLEX => {
                    let re = f64::from_bits(self.read_u64()?);
                    let im = f64::from_bits(self.read_u64()?);
                    ObjectConstant::Complex { re, im }
                }
                _ => ObjectConstant::Str(self.read_masked_string((tp - KGC_STR) as usize)?),
            };
            objects.push(obj);
        }
        // The wire lists object constants farthest-first
        objects.reverse();
        Ok((objects, depth))
    }

    /// 64-bit payload as two varints, low word first
    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        let lo = self.cursor.read_varint()?;
        let hi = self.cursor.read_varint()?;
        Ok(join(lo, hi))
    }

    /// Read `len` masked bytes, unmask and intern them
    pub(crate) fn read_masked_string(&mut self, len: usize) -> Result<StrRef> {
        let masked = self.cursor.read_block(len)?;
        unmask_into(masked, &mut self.scratch);
        Ok(self.heap.intern(&self.scratch))
    }

    fn read_debug_block(
        &mut self,
        header: DebugHeader,
        line_entries: usize,
        uv_count: usize,
    ) -> Result<DebugInfo> {
        let at = self.cursor.position();
        let big_endian = self.flags.is_big_endian();
        let block = self.cursor.read_block(header.size as usize)?;
        parse_debug_block(block, &header, line_entries, uv_count, big_endian)
            .ok_or_else(|| {
                DecodeError::new(
                    ErrorKind::LengthMismatch {
                        expected: header.size as u64,
                        actual: block.len() as u64,
                    },
                    at,
                )
            })
    }
}

#[inline]
fn join(lo: u32, hi: u32) -> u64 {
    (hi as u64) << 32 | lo as u64
}

/// Split a debug block into line table, upvalue names and var info.
///
/// `None` when the line table or a name runs past the end of the block.
fn parse_debug_block(
    block: &[u8],
    header: &DebugHeader,
    line_entries: usize,
    uv_count: usize,
    big_endian: bool,
) -> Option<DebugInfo> {
    let width = match header.line_count {
        0..=0xff => 1,
        0x100..=0xffff => 2,
        _ => 4,
    };
    let line_bytes = line_entries.checked_mul(width)?;
    let lines = block.get(..line_bytes)?;
    let line_info = lines
        .chunks_exact(width)
        .map(|c| match (c, big_endian) {
            ([b], _) => *b as u32,
            ([a, b], false) => u16::from_le_bytes([*a, *b]) as u32,
            ([a, b], true) => u16::from_be_bytes([*a, *b]) as u32,
            ([a, b, c, d], false) => u32::from_le_bytes([*a, *b, *c, *d]),
            ([a, b, c, d], true) => u32::from_be_bytes([*a, *b, *c, *d]),
            _ => 0,
        })
        .collect();

    let mut rest = &block[line_bytes..];
    let mut upvalue_names = Vec::with_capacity(uv_count);
    for _ in 0..uv_count {
        let nul = rest.iter().position(|&b| b == 0)?;
        upvalue_names.push(rest[..nul].to_vec());
        rest = &rest[nul + 1..];
    }

    Some(DebugInfo {
        size: header.size,
        first_line: header.first_line,
        line_count: header.line_count,
        line_info,
        upvalue_names,
        var_info: rest.to_vec(),
    })
}
