//! Consumer registry.
//!
//! Maps engine-issued keys to per-consumer delivery channels. The map owns
//! the only strong `Sender` of each channel and snapshots hand out weak
//! ones, so removing an entry is what closes the channel.

use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::mpsc;

use super::message::UpdateMessage;

/// Unique consumer identity, issued by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerKey(u64);

impl fmt::Display for ConsumerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer-{}", self.0)
    }
}

/// Hub/registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("broadcast hub is shut down")]
    Closed,
}

#[derive(Default)]
struct Inner {
    /// Set once by `close`; never reset
    closed: bool,
    next_key: u64,
    consumers: FxHashMap<ConsumerKey, mpsc::Sender<UpdateMessage>>,
}

/// Concurrent key -> channel mapping
#[derive(Default)]
pub struct ConsumerRegistry {
    inner: Mutex<Inner>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delivery channel under a fresh key.
    pub fn register(&self, tx: mpsc::Sender<UpdateMessage>) -> Result<ConsumerKey, HubError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(HubError::Closed);
        }
        let key = ConsumerKey(inner.next_key);
        inner.next_key += 1;
        inner.consumers.insert(key, tx);
        Ok(key)
    }

    /// Remove an entry, closing its channel. Returns `false` if already gone.
    pub fn remove(&self, key: ConsumerKey) -> bool {
        self.inner.lock().consumers.remove(&key).is_some()
    }

    /// Consistent copy of the current entries, for sending outside the lock.
    ///
    /// Senders are weak: an entry removed after the snapshot no longer
    /// upgrades.
    pub fn snapshot(&self) -> Vec<(ConsumerKey, mpsc::WeakSender<UpdateMessage>)> {
        self.inner
            .lock()
            .consumers
            .iter()
            .map(|(key, tx)| (*key, tx.downgrade()))
            .collect()
    }

    /// Refuse new registrations and close every remaining channel.
    ///
    /// Returns how many channels were closed. A second call closes nothing.
    pub fn close(&self) -> usize {
        let drained: Vec<_> = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.consumers.drain().collect()
        };
        drained.len()
    }

    pub fn contains(&self, key: ConsumerKey) -> bool {
        self.inner.lock().consumers.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl fmt::Debug for ConsumerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ConsumerRegistry")
            .field("consumers", &inner.consumers.len())
            .field("closed", &inner.closed)
            .finish()
    }
}
