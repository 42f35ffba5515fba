//! Content hashing for memoizing elaborated library elements.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit content hash computed using XXH3.
///
/// Library elaboration is deterministic for a given class name and set of
/// generator values, so the hash of those inputs identifies a cached result.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data).to_le_bytes())
    }

    /// Hashes the `bincode` encoding of a serializable value.
    ///
    /// Fails only if the value cannot be encoded (for example, a map with
    /// non-serializable keys), which is reported as an internal error.
    pub fn of_value<T: Serialize + ?Sized>(value: &T) -> crate::TrellisResult<Self> {
        let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| crate::InternalError::new(format!("unhashable value: {e}")))?;
        Ok(Self::from_bytes(&bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}
