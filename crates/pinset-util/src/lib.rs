//! Shared utilities for pinset.
//!
//! Cross-cutting concerns used by the other pinset crates: the unified error
//! type, filesystem helpers, hashing for cache keys, and terminal status output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
