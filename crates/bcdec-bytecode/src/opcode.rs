//! Opcode substitution
//!
//! The obfuscated container renumbers the opcode space. [`OPCODE_MAP`] is
//! indexed by the obfuscated id and yields the canonical id.

/// Number of opcodes in the substitution table
pub const OPCODE_COUNT: usize = 97;

/// Canonical fixed-argument function entry
pub const FUNCF: u8 = 90;

/// Canonical vararg function entry
pub const FUNCV: u8 = 93;

/// Obfuscated id to canonical id
pub const OPCODE_MAP: [u8; OPCODE_COUNT] = [
    12, 13, 14, 15, 16, 17, 39, 40, 41, 42, 43, 44, 77, 78, 79, 80, //
    81, 82, 83, 84, 85, 86, 87, 88, 0, 1, 2, 3, 4, 5, 6, 7, //
    8, 9, 10, 11, 65, 66, 67, 68, 69, 70, 71, 72, 18, 19, 20, 21, //
    73, 74, 75, 76, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, //
    34, 35, 36, 37, 38, 45, 46, 47, 48, 49, 50, 51, 52, 53, 54, 55, //
    56, 57, 58, 59, 64, 60, 61, 62, 63, 96, 89, 90, 91, 92, 93, 94, //
    95,
];

const INVERSE_MAP: [u8; OPCODE_COUNT] = {
    let mut inverse = [0u8; OPCODE_COUNT];
    let mut i = 0;
    while i < OPCODE_COUNT {
        inverse[OPCODE_MAP[i] as usize] = i as u8;
        i += 1;
    }
    inverse
};

/// Canonical id for an obfuscated opcode
#[inline]
pub fn canonical_opcode(obfuscated: u8) -> Option<u8> {
    OPCODE_MAP.get(obfuscated as usize).copied()
}

/// Obfuscated id for a canonical opcode
#[inline]
pub fn obfuscated_opcode(canonical: u8) -> Option<u8> {
    INVERSE_MAP.get(canonical as usize).copied()
}
