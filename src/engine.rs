//! Engine facade.
//!
//! The interface the endpoint layer calls into: open/close/read/write per
//! slot, out-of-band mode control, and the administrative paths that resize
//! the registry or reload credential material.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{password_list, validate_passwords, EngineConfig, SharedConfig};
use crate::entropy::{EntropySource, OsEntropy, SharedEntropy};
use crate::error::OtpError;
use crate::registry::{EndpointObserver, LoggingObserver, SlotRegistry};
use crate::slot::{Mode, SessionToken};
use crate::snapshot::Snapshot;

/// Out-of-band control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    SetListMode,
    SetGeneratedMode,
}

impl ControlCommand {
    pub fn mode(&self) -> Mode {
        match self {
            ControlCommand::SetListMode => Mode::List,
            ControlCommand::SetGeneratedMode => Mode::Generated,
        }
    }
}

impl TryFrom<u32> for ControlCommand {
    type Error = OtpError;

    /// Raw codes: `0` list mode, `1` generated mode.
    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ControlCommand::SetListMode),
            1 => Ok(ControlCommand::SetGeneratedMode),
            other => Err(OtpError::InvalidCommand(other)),
        }
    }
}

/// Multi-slot OTP engine.
pub struct OtpEngine {
    registry: SlotRegistry,
    shared: RwLock<Arc<SharedConfig>>,
    entropy: SharedEntropy,
    next_session: AtomicU64,
}

impl OtpEngine {
    /// Creates an engine backed by the OS RNG that logs endpoint changes.
    pub fn new(config: EngineConfig) -> Result<Self, OtpError> {
        Self::with_entropy(config, Box::new(OsEntropy))
    }

    pub fn with_entropy(
        config: EngineConfig,
        entropy: Box<dyn EntropySource>,
    ) -> Result<Self, OtpError> {
        Self::with_observer(config, entropy, Box::new(LoggingObserver))
    }

    pub fn with_observer(
        config: EngineConfig,
        entropy: Box<dyn EntropySource>,
        observer: Box<dyn EndpointObserver>,
    ) -> Result<Self, OtpError> {
        config.validate()?;
        let registry = SlotRegistry::new(config.initial_count, config.max_slots, observer)?;
        log::info!(
            "OTP engine ready: {} of {} slots, {} passwords",
            config.initial_count,
            config.max_slots,
            config.passwords.len()
        );
        Ok(Self {
            registry,
            shared: RwLock::new(Arc::new(SharedConfig::from_config(&config))),
            entropy: SharedEntropy::new(entropy),
            next_session: AtomicU64::new(1),
        })
    }

    fn shared(&self) -> Arc<SharedConfig> {
        Arc::clone(&self.shared.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn update_shared(&self, f: impl FnOnce(&mut SharedConfig)) {
        let mut guard = self.shared.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = SharedConfig::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }

    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }

    pub fn max_slots(&self) -> usize {
        self.registry.max_slots()
    }

    /// Opens `slot` for exclusive use.
    pub fn open(&self, slot: usize) -> Result<SessionToken, OtpError> {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        self.registry.with_slot(slot, |s| s.acquire(id))?
    }

    pub fn close(&self, token: &SessionToken) -> Result<(), OtpError> {
        self.registry.with_slot(token.slot(), |s| s.release(token))?
    }

    /// Reads the credential at `offset`; `offset == 0` issues a fresh one.
    pub fn read(
        &self,
        token: &SessionToken,
        offset: usize,
        max_len: usize,
    ) -> Result<Vec<u8>, OtpError> {
        let config = self.shared();
        self.registry.with_slot(token.slot(), |s| {
            s.issue(token, offset, max_len, &config, &self.entropy)
        })?
    }

    /// Submits a response. Returns the number of bytes consumed.
    pub fn write(&self, token: &SessionToken, submitted: &[u8]) -> Result<usize, OtpError> {
        let config = self.shared();
        self.registry
            .with_slot(token.slot(), |s| s.validate(token, submitted, &config))?
    }

    /// Switches the mode of `slot`. Does not require an open session.
    pub fn control(&self, slot: usize, command: ControlCommand) -> Result<(), OtpError> {
        let reset = self.shared().reset_on_mode_switch;
        self.registry
            .with_slot(slot, |s| s.set_mode(command.mode(), reset))?;
        Ok(())
    }

    pub fn reconfigure_count(&self, count: usize) -> Result<(), OtpError> {
        self.registry.set_active_count(count)
    }

    pub fn snapshot(&self) -> Snapshot {
        let config = self.shared();
        Snapshot::collect(&self.registry, &config)
    }

    /// Replaces the password list. Cursors are kept; a cursor past the end
    /// of the new list wraps on its next issue.
    pub fn reload_passwords(&self, passwords: Vec<String>) -> Result<(), OtpError> {
        if let Err(e) = validate_passwords(&passwords) {
            log::warn!("Rejected password list: {}", e);
            return Err(e.into());
        }
        let count = passwords.len();
        let list = password_list(passwords);
        self.update_shared(|c| c.passwords = list);
        log::info!("Password list reloaded: {} entries", count);
        Ok(())
    }

    pub fn set_generation_seed(&self, seed: u64) {
        self.update_shared(|c| c.generation_seed = seed);
        log::info!("Generation seed updated");
    }
}
