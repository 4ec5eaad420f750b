//! Public facade over [`projectql_core`].
//!
//! Splits an implementation crate from a thin, stable-named facade:
//! application code depends on `projectql`, while `projectql-core` is free
//! to evolve its internal module layout.

pub use projectql_core::*;
