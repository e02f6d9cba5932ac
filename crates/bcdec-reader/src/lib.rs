//! # bcdec reader
//!
//! Decoder for the obfuscated LuaJIT 2.1 bytecode container.
//!
//! A [`Decoder`] validates the container header, decodes every prototype
//! record into a canonical [`Prototype`](bcdec_bytecode::Prototype), undoing
//! the header XOR chain, the opcode substitution, the operand transforms and
//! the string masking on the way, and interns all text into a
//! [`Heap`](bcdec_gc::Heap).
//!
//! ```text
//! Decoder ──► header ──► proto ──► table
//!    │           │          │        │
//!    └──────── BcCursor ◄───┴────────┘
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cursor;
pub mod decoder;
pub mod deobf;
pub mod error;
pub mod header;
mod proto;
mod table;

pub use cursor::{BcCursor, MAX_BUF, REFILL_CHUNK};
pub use decoder::{DecodeOptions, Decoder, MAX_NESTING};
pub use error::{DecodeError, ErrorKind, Result, chunk_display_name};
pub use header::{DumpFlags, Header, MAGIC, SIGNATURE, VERSION, read_header};
