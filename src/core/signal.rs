//! Observer lists for synchronous event fan-out.
//!
//! A `Signal` holds registered callbacks and invokes them on the emitting
//! thread. Consumers living on other threads must forward what they receive
//! through their own queue.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle returned by [`Signal::connect`], used to disconnect a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

type Slot<T> = Box<dyn Fn(&T) + Send + Sync>;

/// List of callbacks receiving `&T` when the signal is emitted.
pub struct Signal<T> {
    slots: RwLock<Vec<(SlotId, Slot<T>)>>,
    next_id: AtomicU64,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a callback. It stays connected until [`Signal::disconnect`].
    pub fn connect(&self, slot: impl Fn(&T) + Send + Sync + 'static) -> SlotId {
        let id = SlotId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots
            .write()
            .expect("signal slots poisoned")
            .push((id, Box::new(slot)));
        id
    }

    /// Remove a callback. Returns false if it was not connected.
    pub fn disconnect(&self, id: SlotId) -> bool {
        let mut slots = self.slots.write().expect("signal slots poisoned");
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    /// Invoke every connected callback, in connection order.
    ///
    /// Callbacks must not connect or disconnect slots on the same signal.
    pub fn emit(&self, args: &T) {
        let slots = self.slots.read().expect("signal slots poisoned");
        for (_, slot) in slots.iter() {
            slot(args);
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.read().expect("signal slots poisoned").len()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slot_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_reaches_all_slots() {
        let signal = Signal::<u32>::new();
        let total = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let total = total.clone();
            signal.connect(move |value| {
                total.fetch_add(*value as usize, Ordering::Relaxed);
            });
        }

        signal.emit(&5);
        assert_eq!(total.load(Ordering::Relaxed), 15);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<()>::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let id = {
            let hits = hits.clone();
            signal.connect(move |_| {
                hits.fetch_add(1, Ordering::Relaxed);
            })
        };

        signal.emit(&());
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(&());

        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(signal.slot_count(), 0);
    }
}
