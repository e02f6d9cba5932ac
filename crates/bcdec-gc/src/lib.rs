//! # bcdec GC heap
//!
//! The slice of a garbage-collected runtime heap that a bytecode reader
//! needs: content-addressed string interning with object identity.
//!
//! ## Design
//!
//! - **Identity**: equal bytes always resolve to the same [`StrRef`]
//! - **Open hashing**: power-of-two bucket array, singly linked chains
//! - **Liveness**: each string carries a live/condemned flag owned by the host
//!   collector; the table only ever resurrects, it never reclaims

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod heap;
pub mod object;
pub mod string;

pub use heap::{Heap, HeapConfig};
pub use object::{GcHeader, Liveness};
pub use string::{GcStr, StrRef, StringTable, hash_bytes};
