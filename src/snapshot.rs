//! Read-only status view across active slots.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::SharedConfig;
use crate::registry::{endpoint_name, SlotRegistry};
use crate::slot::Mode;

/// State of one slot at the time of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotStatus {
    pub slot: usize,
    pub mode: Mode,
    pub pending: bool,
    pub open: bool,
    /// Plaintext of the pending credential, when the exposure rules allow
    /// it: always for list mode, only on request for generated mode.
    pub credential: Option<String>,
}

/// Statuses of every active slot, in index order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    pub slots: Vec<SlotStatus>,
}

impl Snapshot {
    pub(crate) fn collect(registry: &SlotRegistry, config: &SharedConfig) -> Self {
        Self {
            slots: registry.map_slots(|slot| slot.status(config)),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&SlotStatus> {
        self.slots.get(slot)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: mode={} pending={} open={} credential={}",
            endpoint_name(self.slot),
            self.mode.as_str(),
            self.pending,
            self.open,
            self.credential.as_deref().unwrap_or("-")
        )
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for status in &self.slots {
            writeln!(f, "{}", status)?;
        }
        Ok(())
    }
}
