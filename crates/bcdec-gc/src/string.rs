//! Interned byte strings
//!
//! Strings are immutable and interned for deduplication.
//! Two strings with the same bytes are the same object, so equality is a
//! pointer comparison.

use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::object::GcHeader;

/// Largest bucket count the table grows to
pub const MAX_STRTAB: u32 = 1 << 26;

/// Default bucket mask (256 buckets)
pub const MIN_STRMASK: u32 = 255;

/// Compute the 32-bit string hash.
///
/// Mixing constants come from Bob Jenkins' lookup3. Long inputs sample the
/// first, last and two middle words; inputs of 1-3 bytes sample single bytes.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    let len = bytes.len();
    if len == 0 {
        return 0;
    }
    let mut h = len as u32;
    let mut a;
    let mut b;
    if len >= 4 {
        a = read_u32_le(bytes, 0);
        h ^= read_u32_le(bytes, len - 4);
        b = read_u32_le(bytes, (len >> 1) - 2);
        h ^= b;
        h = h.wrapping_sub(b.rotate_left(14));
        b = b.wrapping_add(read_u32_le(bytes, (len >> 2) - 1));
    } else {
        a = bytes[0] as u32;
        h ^= bytes[len - 1] as u32;
        b = bytes[len >> 1] as u32;
        h ^= b;
        h = h.wrapping_sub(b.rotate_left(14));
    }
    a ^= h;
    a = a.wrapping_sub(h.rotate_left(11));
    b ^= a;
    b = b.wrapping_sub(a.rotate_left(25));
    h ^= b;
    h.wrapping_sub(b.rotate_left(16))
}

#[inline]
fn read_u32_le(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// An interned byte string with GC support
pub struct GcStr {
    /// GC header
    header: GcHeader,
    /// Precomputed hash
    hash: u32,
    /// String bytes (not necessarily UTF-8)
    data: Box<[u8]>,
}

impl GcStr {
    fn new(bytes: &[u8], hash: u32) -> Self {
        Self {
            header: GcHeader::new(),
            hash,
            data: bytes.into(),
        }
    }

    /// Get the GC header
    pub fn gc_header(&self) -> &GcHeader {
        &self.header
    }

    /// Raw bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if string is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get precomputed hash value
    #[inline]
    pub fn hash_value(&self) -> u32 {
        self.hash
    }

    /// Lossy UTF-8 view
    pub fn to_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

impl std::fmt::Debug for GcStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GcStr({:?})", self.to_str_lossy())
    }
}

impl std::fmt::Display for GcStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

/// Shared handle to an interned string.
///
/// Equality and hashing are by identity, which for strings from one
/// [`StringTable`] coincides with equality of contents.
#[derive(Clone)]
pub struct StrRef(Arc<GcStr>);

impl StrRef {
    /// Whether two handles name the same string object
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for StrRef {
    type Target = GcStr;

    fn deref(&self) -> &GcStr {
        &self.0
    }
}

impl PartialEq for StrRef {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl Eq for StrRef {}

impl Hash for StrRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash.hash(state);
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl std::fmt::Debug for StrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.0, f)
    }
}

impl std::fmt::Display for StrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&*self.0, f)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for StrRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_str_lossy())
    }
}

/// One link of a bucket chain
struct Node {
    string: StrRef,
    next: Option<Box<Node>>,
}

/// String interning table.
///
/// Open hash with `mask + 1` buckets. Growth happens after an insertion
/// leaves more entries than `mask`, so the table runs at up to 100% load.
pub struct StringTable {
    buckets: Vec<Option<Box<Node>>>,
    mask: u32,
    count: u32,
    empty: StrRef,
}

impl StringTable {
    /// Create a table with the default bucket count
    pub fn new() -> Self {
        Self::with_mask(MIN_STRMASK)
    }

    /// Create a table with `mask + 1` buckets, rounding up to a power of two
    pub fn with_mask(mask: u32) -> Self {
        let buckets = (mask as u64 + 1).next_power_of_two().min(MAX_STRTAB as u64) as u32;
        Self {
            buckets: empty_buckets(buckets),
            mask: buckets - 1,
            count: 0,
            empty: StrRef(Arc::new(GcStr::new(&[], 0))),
        }
    }

    /// Intern a byte string in this table
    pub fn intern(&mut self, bytes: &[u8]) -> StrRef {
        if bytes.is_empty() {
            return self.empty.clone();
        }
        let hash = hash_bytes(bytes);

        // Check if already interned
        if let Some(existing) = self.find(bytes, hash) {
            existing.gc_header().resurrect();
            return existing.clone();
        }

        // Create new interned string at the head of its chain
        let string = StrRef(Arc::new(GcStr::new(bytes, hash)));
        let slot = &mut self.buckets[(hash & self.mask) as usize];
        let next = slot.take();
        *slot = Some(Box::new(Node {
            string: string.clone(),
            next,
        }));
        self.count += 1;
        if self.count > self.mask {
            self.resize((self.mask << 1) + 1);
        }
        string
    }

    /// Find an interned string without inserting or resurrecting it
    pub fn lookup(&self, bytes: &[u8]) -> Option<StrRef> {
        if bytes.is_empty() {
            return Some(self.empty.clone());
        }
        self.find(bytes, hash_bytes(bytes)).cloned()
    }

    /// Check if a byte string is interned in this table
    pub fn contains(&self, bytes: &[u8]) -> bool {
        bytes.is_empty() || self.find(bytes, hash_bytes(bytes)).is_some()
    }

    /// The empty-string singleton
    pub fn empty(&self) -> &StrRef {
        &self.empty
    }

    /// Number of interned strings (the empty singleton is not counted)
    pub fn len(&self) -> usize {
        self.count as usize
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current bucket mask
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Condemn every entry, as the host does when it starts a collection cycle
    pub fn condemn_all(&self) {
        for string in self.iter() {
            string.gc_header().condemn();
        }
    }

    /// Iterate over all interned strings in bucket order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            buckets: self.buckets.iter(),
            node: None,
        }
    }

    fn find(&self, bytes: &[u8], hash: u32) -> Option<&StrRef> {
        let mut node = self.buckets[(hash & self.mask) as usize].as_deref();
        while let Some(n) = node {
            let s = &n.string;
            if s.hash == hash && s.as_bytes() == bytes {
                return Some(s);
            }
            node = n.next.as_deref();
        }
        None
    }

    /// Rehash every chain into `new_mask + 1` buckets
    fn resize(&mut self, new_mask: u32) {
        if new_mask >= MAX_STRTAB - 1 {
            return;
        }
        let mut buckets = empty_buckets(new_mask + 1);
        for slot in &mut self.buckets {
            let mut chain = slot.take();
            while let Some(mut node) = chain {
                chain = node.next.take();
                let idx = (node.string.hash & new_mask) as usize;
                node.next = buckets[idx].take();
                buckets[idx] = Some(node);
            }
        }
        #[cfg(feature = "gc_logging")]
        tracing::debug!(
            old_mask = self.mask,
            new_mask,
            count = self.count,
            "string table grown"
        );
        self.buckets = buckets;
        self.mask = new_mask;
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StringTable {
    fn drop(&mut self) {
        // Unlink chains iteratively so long chains cannot exhaust the stack
        for slot in &mut self.buckets {
            let mut chain = slot.take();
            while let Some(mut node) = chain {
                chain = node.next.take();
            }
        }
    }
}

impl std::fmt::Debug for StringTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringTable")
            .field("mask", &self.mask)
            .field("count", &self.count)
            .finish()
    }
}

fn empty_buckets(n: u32) -> Vec<Option<Box<Node>>> {
    std::iter::repeat_with(|| None).take(n as usize).collect()
}

/// Iterator over the strings of a [`StringTable`]
pub struct Iter<'a> {
    buckets: std::slice::Iter<'a, Option<Box<Node>>>,
    node: Option<&'a Node>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a StrRef;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.node {
                self.node = node.next.as_deref();
                return Some(&node.string);
            }
            self.node = self.buckets.next()?.as_deref();
        }
    }
}
