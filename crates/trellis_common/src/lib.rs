//! Shared foundational types used across the Trellis elaboration toolchain.
//!
//! This crate provides the content hash used to key memoized elaborations and
//! the internal-error result type that marks defects in Trellis itself.

#![warn(missing_docs)]

pub mod hash;
pub mod result;

pub use hash::ContentHash;
pub use result::{InternalError, TrellisResult};
