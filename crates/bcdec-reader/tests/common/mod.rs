//! Test encoder: builds obfuscated containers from canonical values

#![allow(dead_code)]

use std::io::{self, Read};

use bcdec_bytecode::Instruction;
use bcdec_bytecode::opcode::obfuscated_opcode;

pub const BE: u32 = 0x01;
pub const STRIP: u32 = 0x02;
pub const FFI: u32 = 0x04;
pub const FR2: u32 = 0x08;

pub fn varint(out: &mut Vec<u8>, mut v: u32) {
    while v >= 0x80 {
        out.push((v & 0x7f) as u8 | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

pub fn varint33(out: &mut Vec<u8>, v: u32, tagged: bool) {
    let mut first = ((v & 0x3f) << 1) as u8 | tagged as u8;
    if v >= 0x40 {
        first |= 0x80;
    }
    out.push(first);
    if v >= 0x40 {
        varint(out, v >> 6);
    }
}

pub fn mask(plain: &[u8]) -> Vec<u8> {
    plain
        .iter()
        .enumerate()
        .map(|(i, &b)| !b ^ i as u8)
        .collect()
}

fn masked_string(out: &mut Vec<u8>, s: &[u8]) {
    varint(out, 5 + s.len() as u32);
    out.extend(mask(s));
}

fn u64_pair(out: &mut Vec<u8>, v: u64) {
    varint(out, v as u32);
    varint(out, (v >> 32) as u32);
}

/// Obfuscate the `index`-th real instruction
pub fn obfuscate(ins: Instruction, index: usize) -> u32 {
    let op = obfuscated_opcode(ins.op()).expect("canonical opcode in range");
    ins.with_op(op)
        .with_a(!ins.a())
        .with_b(ins.b() ^ index as u8)
        .raw()
}

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    False,
    True,
    Int(i32),
    Num(f64),
    Str(Vec<u8>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Self::Str(s.as_bytes().to_vec())
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Nil => varint(out, 0),
            Self::False => varint(out, 1),
            Self::True => varint(out, 2),
            Self::Int(i) => {
                varint(out, 3);
                varint(out, *i as u32);
            }
            Self::Num(n) => {
                varint(out, 4);
                u64_pair(out, n.to_bits());
            }
            Self::Str(s) => masked_string(out, s),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub array: Vec<Value>,
    pub hash: Vec<(Value, Value)>,
}

#[derive(Debug, Clone)]
pub enum Obj {
    Child,
    Table(Table),
    I64(i64),
    U64(u64),
    Complex(f64, f64),
    Str(Vec<u8>),
}

impl Obj {
    pub fn str(s: &str) -> Self {
        Self::Str(s.as_bytes().to_vec())
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Child => varint(out, 0),
            Self::Table(t) => {
                varint(out, 1);
                varint(out, t.hash.len() as u32);
                varint(out, t.array.len() as u32);
                for v in &t.array {
                    v.encode(out);
                }
                for (k, v) in &t.hash {
                    k.encode(out);
                    v.encode(out);
                }
            }
            Self::I64(v) => {
                varint(out, 2);
                u64_pair(out, *v as u64);
            }
            Self::U64(v) => {
                varint(out, 3);
                u64_pair(out, *v);
            }
            Self::Complex(re, im) => {
                varint(out, 4);
                u64_pair(out, re.to_bits());
                u64_pair(out, im.to_bits());
            }
            Self::Str(s) => masked_string(out, s),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Num {
    Int(i32),
    Float(f64),
}

/// Debug block of a record
#[derive(Debug, Clone)]
pub struct DebugBlock {
    pub first_line: u32,
    pub line_count: u32,
    /// Raw block bytes (line table, names, var info)
    pub block: Vec<u8>,
}

/// One prototype record in canonical form
#[derive(Debug, Clone, Default)]
pub struct Proto {
    pub frame_size: u8,
    pub flags: u8,
    pub params: u8,
    /// Real instructions, without the entry instruction
    pub code: Vec<Instruction>,
    pub upvalues: Vec<u16>,
    pub numbers: Vec<Num>,
    /// Object constants in wire order
    pub objects: Vec<Obj>,
    pub debug: Option<DebugBlock>,
}

impl Proto {
    pub fn new(frame_size: u8) -> Self {
        Self {
            frame_size,
            code: vec![Instruction::ad(75, 0, 1)],
            ..Self::default()
        }
    }

    /// Record body in the given container flavour
    pub fn encode(&self, flags: u32) -> Vec<u8> {
        let be = flags & BE != 0;
        let mut out = Vec::new();

        let b0 = self.frame_size;
        let b1 = self.flags ^ b0;
        let b2 = self.params ^ self.flags;
        let b3 = self.upvalues.len() as u8 ^ self.params;
        out.extend([b0, b1, b2, b3]);

        varint(&mut out, self.numbers.len() as u32);
        varint(&mut out, self.objects.len() as u32);
        varint(&mut out, self.code.len() as u32);

        if flags & STRIP == 0 {
            match &self.debug {
                Some(d) => {
                    varint(&mut out, d.block.len() as u32);
                    varint(&mut out, d.first_line);
                    varint(&mut out, d.line_count);
                }
                None => varint(&mut out, 0),
            }
        }

        for (i, ins) in self.code.iter().enumerate() {
            let word = obfuscate(*ins, i);
            out.extend(if be {
                word.to_be_bytes()
            } else {
                word.to_le_bytes()
            });
        }
        for uv in &self.upvalues {
            out.extend(if be { uv.to_be_bytes() } else { uv.to_le_bytes() });
        }
        for n in &self.numbers {
            match n {
                Num::Int(i) => varint33(&mut out, *i as u32, false),
                Num::Float(f) => {
                    let bits = f.to_bits();
                    varint33(&mut out, bits as u32, true);
                    varint(&mut out, (bits >> 32) as u32);
                }
            }
        }
        for obj in &self.objects {
            obj.encode(&mut out);
        }
        if let Some(d) = &self.debug {
            out.extend(&d.block);
        }
        out
    }
}

/// Container with the given flags, embedded name (when not stripped) and
/// pre-encoded record bodies, closed by the end sentinel
pub fn container(flags: u32, name: &[u8], records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0x1b, b'L', b'J', 2];
    varint(&mut out, flags);
    if flags & STRIP == 0 {
        varint(&mut out, name.len() as u32);
        out.extend(name);
    }
    for body in records {
        varint(&mut out, body.len() as u32);
        out.extend(body);
    }
    out.push(0);
    out
}

/// Stripped little-endian container of the given prototypes
pub fn stripped(protos: &[Proto]) -> Vec<u8> {
    let records: Vec<Vec<u8>> = protos.iter().map(|p| p.encode(STRIP)).collect();
    container(STRIP, b"", &records)
}

/// Source that hands out at most `step` bytes per read
pub struct Chunked<'a> {
    pub data: &'a [u8],
    pub step: usize,
}

impl Read for Chunked<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}
