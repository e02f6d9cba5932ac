//! # bcdec bytecode model
//!
//! Canonical form of a decoded LuaJIT 2.1 prototype tree.
//!
//! ## Design Principles
//!
//! - **Canonical**: every value here is already de-obfuscated
//! - **Owned tree**: a prototype owns its children through its object pool
//! - **Serializable**: the whole tree can be listed through a [`ProtoWriter`]

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constant;
pub mod error;
pub mod instruction;
pub mod opcode;
pub mod proto;
pub mod writer;

pub use constant::{NumberConstant, ObjectConstant, TableKey, TableValue, TemplateTable};
pub use error::WriteError;
pub use instruction::Instruction;
pub use opcode::{FUNCF, FUNCV, OPCODE_COUNT, OPCODE_MAP};
pub use proto::{DebugInfo, ProtoFlags, Prototype, PrototypeBuilder};
pub use writer::{JsonListing, ProtoWriter};
