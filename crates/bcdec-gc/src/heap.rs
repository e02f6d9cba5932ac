//! Heap management

use crate::string::{MIN_STRMASK, StrRef, StringTable};

/// Heap configuration
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Initial string table bucket mask (default: 255)
    pub initial_mask: u32,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            initial_mask: MIN_STRMASK,
        }
    }
}

/// Runtime heap owning the string table.
///
/// The decoder mutates it through `&mut`, so one heap serves one decode at
/// a time.
#[derive(Debug)]
pub struct Heap {
    config: HeapConfig,
    strings: StringTable,
}

impl Heap {
    /// Create new heap with default config
    pub fn new() -> Self {
        Self::with_config(HeapConfig::default())
    }

    /// Create new heap with custom config
    pub fn with_config(config: HeapConfig) -> Self {
        Self {
            strings: StringTable::with_mask(config.initial_mask),
            config,
        }
    }

    /// Heap configuration
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Intern a byte string
    #[inline]
    pub fn intern(&mut self, bytes: &[u8]) -> StrRef {
        self.strings.intern(bytes)
    }

    /// The string table
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// Start a collection cycle: every string becomes condemned until
    /// something interns it again.
    pub fn begin_cycle(&self) {
        #[cfg(feature = "gc_logging")]
        tracing::debug!(strings = self.strings.len(), "collection cycle started");
        self.strings.condemn_all();
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
