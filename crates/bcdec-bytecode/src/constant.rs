//! Constant pools of a prototype

use bcdec_gc::StrRef;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Serialize, Serializer};

use crate::proto::Prototype;

/// Entry of the numeric constant pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum NumberConstant {
    /// Small integer
    Int(i32),
    /// IEEE-754 double
    Float(#[serde(serialize_with = "serialize_float")] f64),
}

impl NumberConstant {
    /// Numeric value as a double
    #[inline]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(n) => n,
        }
    }
}

/// Entry of the object constant pool
#[derive(Debug, Clone, Serialize)]
pub enum ObjectConstant {
    /// Interned string
    Str(StrRef),
    /// Template table
    Table(TemplateTable),
    /// Nested function prototype
    Child(Box<Prototype>),
    /// Signed 64-bit cdata
    Int64(i64),
    /// Unsigned 64-bit cdata
    UInt64(u64),
    /// Complex cdata
    Complex {
        /// Real part
        #[serde(serialize_with = "serialize_float")]
        re: f64,
        /// Imaginary part
        #[serde(serialize_with = "serialize_float")]
        im: f64,
    },
}

impl ObjectConstant {
    /// Get as string if this is a string constant
    #[inline]
    pub fn as_str(&self) -> Option<&StrRef> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as child prototype
    #[inline]
    pub fn as_child(&self) -> Option<&Prototype> {
        match self {
            Self::Child(p) => Some(p),
            _ => None,
        }
    }

    /// Get as template table
    #[inline]
    pub fn as_table(&self) -> Option<&TemplateTable> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }
}

/// Scalar or string stored in a template table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableValue {
    /// nil
    Nil,
    /// false
    False,
    /// true
    True,
    /// Integer
    Int(i32),
    /// Double
    Num(#[serde(serialize_with = "serialize_float")] f64),
    /// Interned string
    Str(StrRef),
}

/// Hash key of a template table.
///
/// Like [`TableValue`] without nil. Integral floats that fit in an `i32`
/// are normalized to [`TableKey::Int`]; other floats compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TableKey {
    /// false
    False,
    /// true
    True,
    /// Integer
    Int(i32),
    /// Double, stored as its bits
    Num(#[serde(serialize_with = "serialize_bits")] u64),
    /// Interned string
    Str(StrRef),
}

fn serialize_bits<S: Serializer>(bits: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serialize_float(&f64::from_bits(*bits), serializer)
}

/// Finite doubles as JSON numbers; infinities as `"inf"`/`"-inf"`, NaN as
/// `"nan"` or, for any other payload, `"nan:0x<bits>"`.
fn serialize_float<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.is_finite() {
        serializer.serialize_f64(*n)
    } else if n.is_nan() {
        let bits = n.to_bits();
        if bits == f64::NAN.to_bits() {
            serializer.serialize_str("nan")
        } else {
            serializer.collect_str(&format_args!("nan:{bits:#018x}"))
        }
    } else if n.is_sign_positive() {
        serializer.serialize_str("inf")
    } else {
        serializer.serialize_str("-inf")
    }
}

impl TableKey {
    /// Convert a decoded value into a key; nil is not a valid key
    pub fn from_value(value: TableValue) -> Option<Self> {
        Some(match value {
            TableValue::Nil => return None,
            TableValue::False => Self::False,
            TableValue::True => Self::True,
            TableValue::Int(i) => Self::Int(i),
            TableValue::Num(n) => {
                let i = n as i32;
                if i as f64 == n {
                    Self::Int(i)
                } else {
                    Self::Num(n.to_bits())
                }
            }
            TableValue::Str(s) => Self::Str(s),
        })
    }

    /// Array slot this key addresses in an array part of `len` slots
    fn array_slot(&self, len: usize) -> Option<usize> {
        match *self {
            Self::Int(i) if i >= 0 && (i as usize) < len => Some(i as usize),
            _ => None,
        }
    }
}

/// Constant table template: dense array part plus hash part
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateTable {
    /// Array part, zero-based
    pub array: Vec<TableValue>,
    /// Hash part as key/value pairs
    #[serde(serialize_with = "serialize_pairs")]
    pub hash: IndexMap<TableKey, TableValue, FxBuildHasher>,
}

fn serialize_pairs<S: Serializer>(
    hash: &IndexMap<TableKey, TableValue, FxBuildHasher>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(hash.iter())
}

impl TemplateTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with pre-allocated parts
    pub fn with_capacity(array: usize, hash: usize) -> Self {
        Self {
            array: Vec::with_capacity(array),
            hash: IndexMap::with_capacity_and_hasher(hash, FxBuildHasher),
        }
    }

    /// Store a key/value pair.
    ///
    /// Keys that address the array part overwrite the array slot.
    pub fn insert(&mut self, key: TableKey, value: TableValue) {
        match key.array_slot(self.array.len()) {
            Some(slot) => self.array[slot] = value,
            None => {
                self.hash.insert(key, value);
            }
        }
    }

    /// Look up a key in either part
    pub fn get(&self, key: &TableKey) -> Option<&TableValue> {
        match key.array_slot(self.array.len()) {
            Some(slot) => self.array.get(slot),
            None => self.hash.get(key),
        }
    }

    /// Total number of entries in both parts
    pub fn len(&self) -> usize {
        self.array.len() + self.hash.len()
    }

    /// Check if both parts are empty
    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.hash.is_empty()
    }
}
