//! Observable value slots.
//!
//! A [`Slot`] holds an optional current value and notifies subscribers when it
//! is written. Subscribers poll a [`Subscription`] from whatever task owns the
//! presentation, so updates are delivered on that task and never from the
//! writer's context.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::watch;

/// Shared write counter. Slots built from the same clock can be ordered
/// against each other by the `seq` of their [`Stamped`] values.
#[derive(Debug, Clone, Default)]
pub struct SequenceClock(Arc<AtomicU64>);

impl SequenceClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// A slot value tagged with the clock reading at the time it was written.
/// `seq == 0` means the slot has never been written.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<T> {
    pub seq: u64,
    pub value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Do not deliver the value the slot holds at subscription time.
    pub skip_initial: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self { skip_initial: true }
    }
}

#[derive(Debug)]
pub struct Slot<T> {
    tx: watch::Sender<Stamped<Option<T>>>,
    clock: SequenceClock,
}

impl<T: Clone> Slot<T> {
    pub fn new(clock: SequenceClock) -> Self {
        let (tx, _) = watch::channel(Stamped { seq: 0, value: None });
        Self { tx, clock }
    }

    /// Store `value` and notify subscribers. Returns the write's sequence number.
    pub fn set(&self, value: T) -> u64 {
        let seq = self.clock.tick();
        self.tx.send_replace(Stamped { seq, value: Some(value) });
        seq
    }

    /// Reset the slot to empty without notifying anyone.
    pub fn clear_quiet(&self) {
        self.tx.send_if_modified(|current| {
            current.value = None;
            false
        });
    }

    pub fn get(&self) -> Option<T> {
        self.tx.borrow().value.clone()
    }

    /// Sequence number of the last write, 0 if never written.
    pub fn last_seq(&self) -> u64 {
        self.tx.borrow().seq
    }

    pub fn subscribe(&self, options: SubscribeOptions) -> Subscription<T> {
        let mut rx = self.tx.subscribe();
        if !options.skip_initial {
            rx.mark_changed();
        }
        Subscription { rx }
    }
}

/// Receiving half of a [`Slot`]. Writes made faster than the subscriber
/// polls are coalesced; the subscriber always sees the latest value.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: watch::Receiver<Stamped<Option<T>>>,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next write. `None` once the slot has been dropped.
    pub async fn changed(&mut self) -> Option<Stamped<Option<T>>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Take an unseen write, if there is one, without waiting.
    pub fn try_changed(&mut self) -> Option<Stamped<Option<T>>> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }
}
