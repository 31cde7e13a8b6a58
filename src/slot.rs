//! Slot State Machine.
//!
//! Owns the session and credential state of one endpoint.
//!
//! # States
//! - **Closed / Open**: session exclusivity, held in a single atomic word.
//!   `0` is closed; any other value is the id of the live [`SessionToken`].
//! - **Resolved / Pending**: whether a fully delivered credential awaits
//!   validation.
//! - **Mode**: which credential source backs the slot.
//!
//! Issue and validate are serialized per slot by an internal mutex; opening
//! and closing never block.

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::codec::{length_matches, read_window};
use crate::config::SharedConfig;
use crate::entropy::SharedEntropy;
use crate::error::OtpError;
use crate::snapshot::SlotStatus;
use crate::source::{GeneratedKey, ListCursor};

const CLOSED: u64 = 0;

/// Credential mode of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Mode {
    /// Pre-shared password list.
    #[default]
    List,
    /// Freshly generated keys.
    Generated,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::List => "list",
            Mode::Generated => "generated",
        }
    }
}

/// Mode-specific payload. Exactly one is live per slot.
#[derive(Debug)]
pub enum Credential {
    List(ListCursor),
    Generated(GeneratedKey),
}

impl Credential {
    fn fresh(mode: Mode) -> Self {
        match mode {
            Mode::List => Credential::List(ListCursor::new()),
            Mode::Generated => Credential::Generated(GeneratedKey::new()),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Credential::List(_) => Mode::List,
            Credential::Generated(_) => Mode::Generated,
        }
    }

    /// Issue time of this payload's current credential. Travels with the
    /// payload when it is parked.
    pub fn issued_at(&self) -> Option<Instant> {
        match self {
            Credential::List(cursor) => cursor.issued_at(),
            Credential::Generated(key) => key.issued_at(),
        }
    }
}

/// Capability returned by [`Slot::acquire`].
///
/// Every session-scoped operation must present it; a token from an earlier
/// session, or from a slot that has since been recreated, is rejected.
#[derive(Debug, PartialEq, Eq)]
pub struct SessionToken {
    slot: usize,
    id: u64,
}

impl SessionToken {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
struct SlotState {
    pending: bool,
    credential: Credential,
    /// Payload of the previously active mode, restored on switching back.
    parked: Option<Credential>,
}

impl Default for SlotState {
    fn default() -> Self {
        Self {
            pending: false,
            credential: Credential::fresh(Mode::List),
            parked: None,
        }
    }
}

/// One OTP endpoint.
#[derive(Debug)]
pub struct Slot {
    index: usize,
    session: AtomicU64,
    state: Mutex<SlotState>,
}

impl Slot {
    /// A closed, resolved, list-mode slot.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            session: AtomicU64::new(CLOSED),
            state: Mutex::new(SlotState::default()),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the slot for the session `id` (must be non-zero).
    ///
    /// # Errors
    /// `Busy` if another session holds the slot.
    pub fn acquire(&self, id: u64) -> Result<SessionToken, OtpError> {
        debug_assert_ne!(id, CLOSED);
        self.session
            .compare_exchange(CLOSED, id, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| OtpError::Busy)?;
        log::debug!("otp{}: opened", self.index);
        Ok(SessionToken { slot: self.index, id })
    }

    /// Closes the session held by `token`.
    pub fn release(&self, token: &SessionToken) -> Result<(), OtpError> {
        self.check_token(token)?;
        self.session
            .compare_exchange(token.id, CLOSED, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| OtpError::InvalidState)?;
        log::debug!("otp{}: closed", self.index);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.session.load(Ordering::Acquire) != CLOSED
    }

    fn check_token(&self, token: &SessionToken) -> Result<(), OtpError> {
        if token.slot != self.index || self.session.load(Ordering::Acquire) != token.id {
            return Err(OtpError::InvalidState);
        }
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.lock().credential.mode()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    /// Reads up to `max_len` bytes of the credential starting at `offset`.
    ///
    /// `offset == 0` issues a fresh credential first. Once `offset` reaches
    /// the end, an empty buffer is returned and the slot becomes pending.
    pub fn issue(
        &self,
        token: &SessionToken,
        offset: usize,
        max_len: usize,
        config: &SharedConfig,
        entropy: &SharedEntropy,
    ) -> Result<Vec<u8>, OtpError> {
        self.check_token(token)?;
        let mut guard = self.lock();
        let state = &mut *guard;

        let credential: &[u8] = match &mut state.credential {
            Credential::List(cursor) => {
                if config.passwords.is_empty() {
                    return Err(OtpError::InvalidState);
                }
                if offset == 0 {
                    let position = cursor.advance(&config.passwords)?;
                    log::debug!("otp{}: issued list entry {}", self.index, position);
                }
                cursor
                    .current(&config.passwords)
                    .ok_or(OtpError::InvalidState)?
            }
            Credential::Generated(key) => {
                if offset == 0 {
                    key.regenerate(config.credential_length, config.generation_seed, entropy)?;
                    log::debug!("otp{}: issued generated key", self.index);
                }
                if !key.is_issued() {
                    return Err(OtpError::InvalidState);
                }
                key.as_bytes()
            }
        };

        match read_window(credential, offset, max_len) {
            Some(window) => {
                log::trace!("otp{}: read {} bytes at {}", self.index, window.len(), offset);
                Ok(window.to_vec())
            }
            None => {
                state.pending = true;
                Ok(Vec::new())
            }
        }
    }

    /// Validates `submitted` against the pending credential.
    ///
    /// A match consumes the credential. A mismatch leaves it pending so the
    /// caller may retry.
    pub fn validate(
        &self,
        token: &SessionToken,
        submitted: &[u8],
        config: &SharedConfig,
    ) -> Result<usize, OtpError> {
        self.check_token(token)?;
        let mut state = self.lock();

        if !state.pending {
            return Err(OtpError::InvalidState);
        }

        let expected_len = match &state.credential {
            Credential::List(cursor) => cursor
                .current(&config.passwords)
                .ok_or(OtpError::InvalidState)?
                .len(),
            Credential::Generated(key) if key.is_issued() => key.as_bytes().len(),
            Credential::Generated(_) => return Err(OtpError::InvalidState),
        };

        if let (Some(window), Some(issued_at)) = (config.expiration_window, state.credential.issued_at()) {
            if issued_at.elapsed() >= window {
                state.pending = false;
                log::warn!("otp{}: pending credential expired", self.index);
                return Err(OtpError::Expired);
            }
        }

        if !length_matches(expected_len, submitted.len()) {
            return Err(OtpError::LengthMismatch);
        }

        let accepted = match &state.credential {
            Credential::List(cursor) => cursor.matches(&config.passwords, submitted)?,
            Credential::Generated(key) => key.matches(
                submitted,
                config.generation_seed,
                config.submission_transform,
            ),
        };

        if !accepted {
            log::warn!("otp{}: credential rejected", self.index);
            return Err(OtpError::Mismatch);
        }

        state.pending = false;
        log::debug!("otp{}: credential validated", self.index);
        Ok(submitted.len())
    }

    /// Switches the slot to `mode`. Returns whether anything changed.
    ///
    /// With `reset` unset, the pending flag survives and the outgoing mode's
    /// payload is parked so switching back resumes it. With `reset` set, the
    /// new mode starts from scratch and nothing is pending.
    pub fn set_mode(&self, mode: Mode, reset: bool) -> bool {
        let mut state = self.lock();
        if state.credential.mode() == mode {
            return false;
        }

        if reset {
            state.parked = None;
            state.pending = false;
            state.credential = Credential::fresh(mode);
        } else {
            let next = match state.parked.take() {
                Some(parked) if parked.mode() == mode => parked,
                _ => Credential::fresh(mode),
            };
            let previous = mem::replace(&mut state.credential, next);
            state.parked = Some(previous);
        }

        log::info!("otp{}: switched to {} mode", self.index, mode.as_str());
        true
    }

    /// Diagnostic view of this slot.
    pub(crate) fn status(&self, config: &SharedConfig) -> SlotStatus {
        let state = self.lock();
        let credential = if !state.pending {
            None
        } else {
            match &state.credential {
                Credential::List(cursor) => cursor
                    .current(&config.passwords)
                    .map(|p| String::from_utf8_lossy(p).into_owned()),
                Credential::Generated(key)
                    if config.expose_generated_credential && key.is_issued() =>
                {
                    Some(String::from_utf8_lossy(key.as_bytes()).into_owned())
                }
                Credential::Generated(_) => None,
            }
        };

        SlotStatus {
            slot: self.index,
            mode: state.credential.mode(),
            pending: state.pending,
            open: self.is_open(),
            credential,
        }
    }
}
