//! Multi-slot one-time password engine.
//!
//! Each slot is an independently addressable endpoint that issues a
//! single-use credential and later validates a caller's response against
//! it. Slots run in one of two modes:
//! - **List**: round-robin over a pre-shared password list.
//! - **Generated**: fresh printable keys folded with a shared seed.
//!
//! The endpoint layer drives an [`OtpEngine`]: `open` a slot, `read` the
//! credential, `write` the response, `close`. Administrative calls resize the
//! slot pool and reload credential material at runtime.
//!
//! All state is volatile.

pub mod codec;
pub mod config;
pub mod engine;
pub mod entropy;
pub mod error;
pub mod registry;
pub mod slot;
pub mod snapshot;
pub mod source;

pub use config::{ConfigError, EngineConfig};
pub use engine::{ControlCommand, OtpEngine};
pub use error::OtpError;
pub use registry::{EndpointObserver, LoggingObserver};
pub use slot::{Mode, SessionToken};
pub use snapshot::{SlotStatus, Snapshot};
