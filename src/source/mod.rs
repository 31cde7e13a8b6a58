//! Credential sources.
//!
//! Each slot mode is backed by one source:
//! - `list`: round-robin over the shared password list.
//! - `generated`: fresh printable keys folded with the shared seed.
//!
//! Sources own only per-slot cursor/key storage. The shared material
//! (password list, seed) is passed in on every call.

pub mod generated;
pub mod list;

pub use generated::GeneratedKey;
pub use list::ListCursor;
