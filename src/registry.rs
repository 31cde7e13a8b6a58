//! Slot Registry.
//!
//! Fixed-capacity table of slots whose active prefix can grow or shrink at
//! runtime. Growing appends default slots, shrinking drops trailing ones;
//! slots below the smaller of the two counts are never touched.
//!
//! # Locking
//! Slot operations run under the read side of a registry-wide `RwLock`.
//! Resizing takes the write side, so a slot can never be removed while an
//! operation on it is in flight.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::OtpError;
use crate::slot::Slot;

/// Prefix of endpoint node names.
pub const ENDPOINT_PREFIX: &str = "otp";

/// Name under which the node layer exposes slot `index`.
pub fn endpoint_name(index: usize) -> String {
    format!("{}{}", ENDPOINT_PREFIX, index)
}

/// Observer for endpoint creation and removal.
///
/// Called with the registry write lock held; implementations must not call
/// back into the registry.
pub trait EndpointObserver: Send + Sync {
    fn on_endpoint_created(&self, index: usize);
    fn on_endpoint_removed(&self, index: usize);
}

/// Observer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl EndpointObserver for LoggingObserver {
    fn on_endpoint_created(&self, index: usize) {
        log::info!("Endpoint created: {}", endpoint_name(index));
    }

    fn on_endpoint_removed(&self, index: usize) {
        log::info!("Endpoint removed: {}", endpoint_name(index));
    }
}

/// The slot table.
pub struct SlotRegistry {
    max_slots: usize,
    slots: RwLock<Vec<Slot>>,
    observer: Box<dyn EndpointObserver>,
}

impl SlotRegistry {
    /// Creates a registry with `initial` active slots.
    ///
    /// # Errors
    /// `OutOfRange` if `initial` is outside `[1, max_slots]`.
    pub fn new(
        initial: usize,
        max_slots: usize,
        observer: Box<dyn EndpointObserver>,
    ) -> Result<Self, OtpError> {
        if initial < 1 || initial > max_slots {
            return Err(OtpError::OutOfRange);
        }
        let mut slots = Vec::with_capacity(max_slots);
        for index in 0..initial {
            slots.push(Slot::new(index));
            observer.on_endpoint_created(index);
        }
        Ok(Self {
            max_slots,
            slots: RwLock::new(slots),
            observer,
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Slot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Slot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    pub fn active_count(&self) -> usize {
        self.read().len()
    }

    /// Changes the number of active slots.
    ///
    /// New slots `[old, count)` are created in ascending order; removed
    /// slots `[count, old)` are dropped in descending order. The observer
    /// hears about each one.
    pub fn set_active_count(&self, count: usize) -> Result<(), OtpError> {
        if count < 1 || count > self.max_slots {
            log::warn!(
                "Rejected slot count {} (allowed 1..={})",
                count,
                self.max_slots
            );
            return Err(OtpError::OutOfRange);
        }

        let mut slots = self.write();
        let old = slots.len();
        if count == old {
            return Ok(());
        }
        log::info!("Slot count changed from {} to {}", old, count);

        if count > old {
            for index in old..count {
                slots.push(Slot::new(index));
                self.observer.on_endpoint_created(index);
            }
        } else {
            for index in (count..old).rev() {
                slots.pop();
                self.observer.on_endpoint_removed(index);
            }
        }
        Ok(())
    }

    /// Runs `f` on slot `index` while holding the read lock.
    pub fn with_slot<R>(&self, index: usize, f: impl FnOnce(&Slot) -> R) -> Result<R, OtpError> {
        let slots = self.read();
        let slot = slots.get(index).ok_or(OtpError::UnknownSlot(index))?;
        Ok(f(slot))
    }

    /// Maps every active slot in index order.
    pub fn map_slots<R>(&self, f: impl FnMut(&Slot) -> R) -> Vec<R> {
        self.read().iter().map(f).collect()
    }
}

impl Drop for SlotRegistry {
    fn drop(&mut self) {
        let slots = self.slots.get_mut().unwrap_or_else(PoisonError::into_inner);
        while let Some(slot) = slots.pop() {
            self.observer.on_endpoint_removed(slot.index());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Mode;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Created(usize),
        Removed(usize),
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<Event> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl EndpointObserver for Recorder {
        fn on_endpoint_created(&self, index: usize) {
            self.events.lock().unwrap().push(Event::Created(index));
        }
        fn on_endpoint_removed(&self, index: usize) {
            self.events.lock().unwrap().push(Event::Removed(index));
        }
    }

    fn registry(initial: usize, max: usize) -> (SlotRegistry, Recorder) {
        let recorder = Recorder::default();
        let registry = SlotRegistry::new(initial, max, Box::new(recorder.clone())).unwrap();
        (registry, recorder)
    }

    #[test]
    fn test_initial_slots_notified() {
        let (registry, recorder) = registry(2, 8);
        assert_eq!(registry.active_count(), 2);
        assert_eq!(recorder.take(), vec![Event::Created(0), Event::Created(1)]);
    }

    #[test]
    fn test_invalid_initial_count() {
        assert!(SlotRegistry::new(0, 8, Box::new(LoggingObserver)).is_err());
        assert!(SlotRegistry::new(9, 8, Box::new(LoggingObserver)).is_err());
    }

    #[test]
    fn test_grow_leaves_existing_untouched() {
        let (registry, recorder) = registry(3, 8);
        registry.with_slot(1, |s| s.set_mode(Mode::Generated, false)).unwrap();
        let token = registry.with_slot(2, |s| s.acquire(9)).unwrap().unwrap();
        recorder.take();

        registry.set_active_count(5).unwrap();
        assert_eq!(registry.active_count(), 5);
        assert_eq!(recorder.take(), vec![Event::Created(3), Event::Created(4)]);

        assert_eq!(registry.with_slot(1, |s| s.mode()).unwrap(), Mode::Generated);
        assert!(registry.with_slot(2, |s| s.is_open()).unwrap());
        registry.with_slot(2, |s| s.release(&token)).unwrap().unwrap();
        for index in 3..5 {
            let (mode, open, pending) = registry
                .with_slot(index, |s| (s.mode(), s.is_open(), s.is_pending()))
                .unwrap();
            assert_eq!((mode, open, pending), (Mode::List, false, false));
        }
    }

    #[test]
    fn test_shrink_removes_in_reverse() {
        let (registry, recorder) = registry(5, 8);
        registry.with_slot(0, |s| s.set_mode(Mode::Generated, false)).unwrap();
        recorder.take();

        registry.set_active_count(2).unwrap();
        assert_eq!(registry.active_count(), 2);
        assert_eq!(
            recorder.take(),
            vec![Event::Removed(4), Event::Removed(3), Event::Removed(2)]
        );
        assert_eq!(registry.with_slot(2, |_| ()), Err(OtpError::UnknownSlot(2)));
        assert_eq!(registry.with_slot(0, |s| s.mode()).unwrap(), Mode::Generated);
    }

    #[test]
    fn test_regrown_slot_is_fresh() {
        let (registry, _recorder) = registry(2, 4);
        registry.with_slot(1, |s| s.set_mode(Mode::Generated, false)).unwrap();
        registry.set_active_count(1).unwrap();
        registry.set_active_count(2).unwrap();
        assert_eq!(registry.with_slot(1, |s| s.mode()).unwrap(), Mode::List);
    }

    #[test]
    fn test_out_of_range_changes_nothing() {
        let (registry, recorder) = registry(3, 4);
        recorder.take();
        assert_eq!(registry.set_active_count(0), Err(OtpError::OutOfRange));
        assert_eq!(registry.set_active_count(5), Err(OtpError::OutOfRange));
        assert_eq!(registry.active_count(), 3);
        assert!(recorder.take().is_empty());

        registry.set_active_count(3).unwrap();
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_drop_removes_all_endpoints() {
        let (registry, recorder) = registry(3, 4);
        recorder.take();
        drop(registry);
        assert_eq!(
            recorder.take(),
            vec![Event::Removed(2), Event::Removed(1), Event::Removed(0)]
        );
    }

    #[test]
    fn test_map_slots_in_order() {
        let (registry, _recorder) = registry(4, 4);
        assert_eq!(registry.map_slots(|s| s.index()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_endpoint_name() {
        assert_eq!(endpoint_name(12), "otp12");
    }
}
