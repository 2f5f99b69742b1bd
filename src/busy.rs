//! Visible "operation pending" flag with guaranteed reset.
//!
//! Every suspension point the UI waits on (login submission, registration,
//! avatar upload, profile save) holds a [`BusyGuard`] for its duration. The
//! guard clears the flag when dropped, so neither an error return nor a
//! cancelled future can leave the UI stuck in "loading".

#[cfg(test)]
#[path = "busy_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

#[derive(Clone)]
pub struct BusyFlag {
    active: Arc<AtomicUsize>,
    tx: Arc<watch::Sender<bool>>,
}

impl Default for BusyFlag {
    fn default() -> Self {
        let (tx, _) = watch::channel(false);
        Self { active: Arc::new(AtomicUsize::new(0)), tx: Arc::new(tx) }
    }
}

impl BusyFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an operation as started. The flag stays set until every guard
    /// handed out has been dropped.
    #[must_use = "the flag resets as soon as the guard is dropped"]
    pub fn begin(&self) -> BusyGuard {
        if self.active.fetch_add(1, Ordering::SeqCst) == 0 {
            self.tx.send_replace(true);
        }
        BusyGuard { flag: self.clone() }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

pub struct BusyGuard {
    flag: BusyFlag,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if self.flag.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.flag.tx.send_replace(false);
        }
    }
}
