//! # Mapping Buffer
//!
//! A growable character buffer that accumulates phenotype terminals in
//! left-to-right production order during genotype-to-phenotype mapping.
//! Capacity management is hidden entirely behind the abstraction; callers
//! only append symbols and reset. Re-mapping identical genome content always
//! yields byte-identical buffer content.

use std::fmt;

/// The phenotype text buffer owned by each individual.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    buffer: String,
}

impl Mapping {
    /// Creates an empty mapping buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a terminal symbol to the phenotype stream.
    pub fn append_symbol(&mut self, symbol: &str) {
        self.buffer.push_str(symbol);
    }

    /// Resets the buffer to an empty phenotype, keeping its capacity.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// The accumulated phenotype text.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// The length of the accumulated phenotype text, in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True if no symbols have been appended since the last reset.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buffer)
    }
}
