//! Unread notification counter.

use std::sync::{Arc, Mutex};

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};

use crate::lock;

#[derive(Debug, Default)]
struct CounterInner {
    value: u32,
    listeners: Vec<UnboundedSender<u32>>,
}

/// Shared handle to a single non-negative unread count.
///
/// Clones refer to the same counter. One counter is owned per UI tree (see
/// `NotificationProvider`), never per process.
#[derive(Debug, Clone, Default)]
pub struct UnreadCounter {
    inner: Arc<Mutex<CounterInner>>,
}

impl UnreadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u32 {
        lock(&self.inner).value
    }

    /// Set an absolute value.
    pub fn set(&self, value: u32) {
        self.update(|_| value);
    }

    /// Add one; returns the new value.
    pub fn increment(&self) -> u32 {
        self.update(|v| v.saturating_add(1))
    }

    /// Remove one, never going below zero; returns the new value.
    pub fn decrement(&self) -> u32 {
        self.update(|v| v.saturating_sub(1))
    }

    /// Stream of values, starting with the current one.
    pub fn subscribe(&self) -> UnboundedReceiver<u32> {
        let (tx, rx) = unbounded();
        let mut inner = lock(&self.inner);
        if tx.unbounded_send(inner.value).is_ok() {
            inner.listeners.push(tx);
        }
        rx
    }

    fn update(&self, f: impl FnOnce(u32) -> u32) -> u32 {
        let mut inner = lock(&self.inner);
        let next = f(inner.value);
        if next != inner.value {
            inner.value = next;
            inner.listeners.retain(|tx| tx.unbounded_send(next).is_ok());
        }
        next
    }
}
