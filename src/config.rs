//! Configuration management for the OTP engine.
//!
//! Defines the structure for administrator-supplied settings and the
//! bounds they must satisfy before an engine accepts them.

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use zeroize::Zeroizing;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::codec::{SubmissionTransform, MAX_SUBMISSION_LEN};

/// Default upper bound on the number of slots.
pub const DEFAULT_MAX_SLOTS: usize = 256;

/// Default generated credential length in bytes.
pub const DEFAULT_CREDENTIAL_LENGTH: usize = 16;

/// Maximum number of entries in the password list.
pub const MAX_PASSWORDS: usize = 4096;

/// Errors raised when validating configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `initial_count` outside `[1, max_slots]`.
    InvalidSlotCount,
    /// `max_slots` is zero.
    InvalidMaxSlots,
    /// `credential_length` is zero or above the submission limit.
    InvalidCredentialLength,
    /// A password list entry is empty.
    EmptyPassword,
    /// A password is longer than any submission could be.
    PasswordTooLong,
    /// More passwords than the list can hold.
    TooManyPasswords,
    /// Configuration document could not be parsed.
    Malformed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidSlotCount => write!(f, "slot count outside [1, max_slots]"),
            ConfigError::InvalidMaxSlots => write!(f, "max_slots must be at least 1"),
            ConfigError::InvalidCredentialLength => write!(
                f,
                "credential length must be in [1, {}]",
                MAX_SUBMISSION_LEN
            ),
            ConfigError::EmptyPassword => write!(f, "password list contains an empty entry"),
            ConfigError::PasswordTooLong => write!(
                f,
                "password longer than {} bytes",
                MAX_SUBMISSION_LEN
            ),
            ConfigError::TooManyPasswords => {
                write!(f, "password list holds more than {} entries", MAX_PASSWORDS)
            }
            ConfigError::Malformed => write!(f, "malformed configuration document"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Main configuration structure for the engine.
///
/// Populated by the host (parameter loader, CLI, tests) and handed to
/// [`crate::engine::OtpEngine::new`].
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Ordered password list used by list mode. May be empty.
    pub passwords: Vec<String>,

    /// Numeric key folded into every generated credential.
    pub generation_seed: u64,

    /// Length of generated credentials in bytes.
    pub credential_length: usize,

    /// Lifetime of a pending credential. `None` keeps credentials valid
    /// until consumed.
    pub expiration_window: Option<Duration>,

    /// Capacity of the slot table.
    pub max_slots: usize,

    /// Number of slots active at startup.
    pub initial_count: usize,

    /// Whether snapshots show pending generated keys in plaintext.
    pub expose_generated_credential: bool,

    /// Whether a mode switch discards the slot's pending credential.
    pub reset_on_mode_switch: bool,

    /// Transform applied to generated-mode submissions.
    pub submission_transform: SubmissionTransform,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            passwords: Vec::new(),
            generation_seed: 0,
            credential_length: DEFAULT_CREDENTIAL_LENGTH,
            expiration_window: None,
            max_slots: DEFAULT_MAX_SLOTS,
            initial_count: 1,
            expose_generated_credential: false,
            reset_on_mode_switch: false,
            submission_transform: SubmissionTransform::Direct,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("passwords", &Redacted(self.passwords.len()))
            .field("generation_seed", &format_args!("<redacted>"))
            .field("credential_length", &self.credential_length)
            .field("expiration_window", &self.expiration_window)
            .field("max_slots", &self.max_slots)
            .field("initial_count", &self.initial_count)
            .field("expose_generated_credential", &self.expose_generated_credential)
            .field("reset_on_mode_switch", &self.reset_on_mode_switch)
            .field("submission_transform", &self.submission_transform)
            .finish()
    }
}

impl EngineConfig {
    pub fn with_passwords<I, S>(mut self, passwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.passwords = passwords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.generation_seed = seed;
        self
    }

    pub fn with_initial_count(mut self, count: usize) -> Self {
        self.initial_count = count;
        self
    }

    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = max_slots;
        self
    }

    pub fn with_credential_length(mut self, len: usize) -> Self {
        self.credential_length = len;
        self
    }

    pub fn with_expiration(mut self, window: Duration) -> Self {
        self.expiration_window = Some(window);
        self
    }

    pub fn with_expose_generated_credential(mut self, expose: bool) -> Self {
        self.expose_generated_credential = expose;
        self
    }

    pub fn with_reset_on_mode_switch(mut self, reset: bool) -> Self {
        self.reset_on_mode_switch = reset;
        self
    }

    pub fn with_submission_transform(mut self, transform: SubmissionTransform) -> Self {
        self.submission_transform = transform;
        self
    }

    /// Checks every bound. Nothing is applied when this fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_slots == 0 {
            return Err(ConfigError::InvalidMaxSlots);
        }
        if self.initial_count < 1 || self.initial_count > self.max_slots {
            return Err(ConfigError::InvalidSlotCount);
        }
        if self.credential_length == 0 || self.credential_length > MAX_SUBMISSION_LEN {
            return Err(ConfigError::InvalidCredentialLength);
        }
        validate_passwords(&self.passwords)
    }

    /// Parses and validates a JSON configuration document.
    #[cfg(feature = "serde")]
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            serde_json::from_str(doc).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }
}

/// Checks a password list without taking ownership of it.
pub fn validate_passwords(passwords: &[String]) -> Result<(), ConfigError> {
    if passwords.len() > MAX_PASSWORDS {
        return Err(ConfigError::TooManyPasswords);
    }
    for p in passwords {
        if p.is_empty() {
            return Err(ConfigError::EmptyPassword);
        }
        if p.len() > MAX_SUBMISSION_LEN {
            return Err(ConfigError::PasswordTooLong);
        }
    }
    Ok(())
}

/// Immutable, shared view of the password list.
pub type PasswordList = Arc<[Zeroizing<String>]>;

/// Credential material read by slot operations.
///
/// Replaced wholesale on reload; operations clone the `Arc` once and see a
/// consistent view for their whole duration.
#[derive(Clone)]
pub struct SharedConfig {
    pub passwords: PasswordList,
    pub generation_seed: u64,
    pub credential_length: usize,
    pub expiration_window: Option<Duration>,
    pub expose_generated_credential: bool,
    pub reset_on_mode_switch: bool,
    pub submission_transform: SubmissionTransform,
}

impl fmt::Debug for SharedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedConfig")
            .field("passwords", &Redacted(self.passwords.len()))
            .field("generation_seed", &format_args!("<redacted>"))
            .field("credential_length", &self.credential_length)
            .field("expiration_window", &self.expiration_window)
            .field("expose_generated_credential", &self.expose_generated_credential)
            .field("reset_on_mode_switch", &self.reset_on_mode_switch)
            .field("submission_transform", &self.submission_transform)
            .finish()
    }
}

impl SharedConfig {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            passwords: password_list(config.passwords.clone()),
            generation_seed: config.generation_seed,
            credential_length: config.credential_length,
            expiration_window: config.expiration_window,
            expose_generated_credential: config.expose_generated_credential,
            reset_on_mode_switch: config.reset_on_mode_switch,
            submission_transform: config.submission_transform,
        }
    }
}

/// Stand-in printed for secret fields: only the item count survives.
struct Redacted(usize);

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} redacted>", self.0)
    }
}

/// Moves plain strings into a zeroizing, shared list.
pub fn password_list(passwords: Vec<String>) -> PasswordList {
    passwords.into_iter().map(Zeroizing::new).collect()
}
