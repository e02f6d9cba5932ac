//! Inverse transforms of the container obfuscation

use bcdec_bytecode::Instruction;
use bcdec_bytecode::opcode::canonical_opcode;

/// Fields of a prototype record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Number of stack slots
    pub frame_size: u8,
    /// Prototype flag bits
    pub flags: u8,
    /// Number of fixed parameters
    pub param_count: u8,
    /// Number of upvalues
    pub upvalue_count: u8,
}

/// Undo the XOR chain: each decoded byte keys the next one.
pub fn unchain_header(raw: [u8; 4]) -> RecordHeader {
    let frame_size = raw[0];
    let flags = raw[1] ^ frame_size;
    let param_count = raw[2] ^ flags;
    let upvalue_count = raw[3] ^ param_count;
    RecordHeader {
        frame_size,
        flags,
        param_count,
        upvalue_count,
    }
}

/// Restore the `index`-th real instruction of a prototype.
///
/// Fails with the obfuscated opcode when it is outside the substitution table.
pub fn restore_instruction(word: u32, index: u8) -> Result<Instruction, u8> {
    let ins = Instruction::from_raw(word);
    let op = canonical_opcode(ins.op()).ok_or(ins.op())?;
    Ok(ins.with_op(op).with_a(!ins.a()).with_b(ins.b() ^ index))
}

/// Unmask a string payload into `out`: byte `i` becomes `!(b ^ i)`.
pub fn unmask_into(masked: &[u8], out: &mut Vec<u8>) {
    out.clear();
    out.extend(
        masked
            .iter()
            .enumerate()
            .map(|(i, &b)| !(b ^ i as u8)),
    );
}
