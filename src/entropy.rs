//! Entropy sources for generated-key credentials.
//!
//! The engine only needs unpredictable bytes; the default source is the
//! operating system RNG. Tests inject deterministic sources through the
//! same trait.

use core::fmt;
use std::sync::{Mutex, PoisonError};

use rand_core::{OsRng, RngCore};

/// Error types for entropy collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyError {
    /// Failed to collect sufficient entropy bytes.
    CollectionFailed,
}

impl fmt::Display for EntropyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntropyError::CollectionFailed => write!(f, "entropy collection failed"),
        }
    }
}

impl std::error::Error for EntropyError {}

/// A trait for entropy sources.
pub trait EntropySource: Send {
    /// Returns a unique identifier for the source.
    fn name(&self) -> &'static str;

    /// Fills `dest` with random bytes from the source.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError>;
}

/// Operating system RNG (`getrandom`).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn name(&self) -> &'static str {
        "OsRng"
    }

    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|_| EntropyError::CollectionFailed)
    }
}

/// An entropy source shared by every slot of an engine.
///
/// The lock is held only while a generated key is being filled; list-mode
/// operations never touch it.
pub struct SharedEntropy {
    inner: Mutex<Box<dyn EntropySource>>,
}

impl SharedEntropy {
    pub fn new(source: Box<dyn EntropySource>) -> Self {
        log::debug!("Entropy source: {}", source.name());
        Self {
            inner: Mutex::new(source),
        }
    }

    pub fn fill(&self, dest: &mut [u8]) -> Result<(), EntropyError> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill(dest)
    }
}

impl Default for SharedEntropy {
    fn default() -> Self {
        Self::new(Box::new(OsEntropy))
    }
}
