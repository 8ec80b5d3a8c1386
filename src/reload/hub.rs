//! Broadcast hub - fans one update out to every live consumer.
//!
//! # Delivery policy
//!
//! Each consumer owns a bounded queue. `publish` snapshots the registry as
//! weak senders and sends outside the lock, waiting at most
//! `delivery_timeout` on a full queue. A consumer that is closed or still
//! full after the timeout is disconnected; the other consumers are
//! unaffected.
//!
//! Releasing a consumer marks its subscription before removing it, so a
//! send already in flight is never observed after `release` returns.
//!
//! ```text
//! publish(msg) --> [snapshot] --+--> consumer-0 queue --> transport
//!                               +--> consumer-1 queue --> transport
//!                               +--> consumer-n queue --> (slow: dropped)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TryRecvError};

use super::message::UpdateMessage;
use super::registry::{ConsumerKey, ConsumerRegistry, HubError};
use crate::config::WatchConfig;
use crate::logger::Logger;
use crate::{debug, log};

/// Receiving side of one consumer.
#[derive(Debug)]
pub struct Subscription {
    key: ConsumerKey,
    rx: mpsc::Receiver<UpdateMessage>,
    released: Arc<AtomicBool>,
}

impl Subscription {
    pub fn key(&self) -> ConsumerKey {
        self.key
    }

    /// Next message; `None` once released or the hub shut down.
    pub async fn recv(&mut self) -> Option<UpdateMessage> {
        if self.check_released() {
            return None;
        }
        let msg = self.rx.recv().await?;
        (!self.check_released()).then_some(msg)
    }

    /// Blocking variant for transport threads outside the runtime.
    ///
    /// Panics if called from within an async context.
    pub fn blocking_recv(&mut self) -> Option<UpdateMessage> {
        if self.check_released() {
            return None;
        }
        let msg = self.rx.blocking_recv()?;
        (!self.check_released()).then_some(msg)
    }

    pub fn try_recv(&mut self) -> Result<UpdateMessage, TryRecvError> {
        if self.check_released() {
            return Err(TryRecvError::Disconnected);
        }
        let msg = self.rx.try_recv()?;
        if self.check_released() {
            return Err(TryRecvError::Disconnected);
        }
        Ok(msg)
    }

    /// Once released, close the queue so in-flight sends fail too.
    fn check_released(&mut self) -> bool {
        let released = self.released.load(Ordering::SeqCst);
        if released {
            self.rx.close();
        }
        released
    }
}

/// Single-use token that unregisters a consumer.
///
/// `release` consumes the handle, so a consumer cannot be released twice.
/// Dropping an unreleased handle releases it.
#[derive(Debug)]
pub struct ReleaseHandle {
    key: ConsumerKey,
    registry: Option<Arc<ConsumerRegistry>>,
    released: Arc<AtomicBool>,
}

impl ReleaseHandle {
    pub fn key(&self) -> ConsumerKey {
        self.key
    }

    /// Remove the consumer and close its channel.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(registry) = self.registry.take() {
            self.released.store(true, Ordering::SeqCst);
            registry.remove(self.key);
        }
    }
}

impl Drop for ReleaseHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Fan-out of update messages to a dynamic set of consumers.
pub struct BroadcastHub {
    registry: Arc<ConsumerRegistry>,
    /// Per-consumer queue capacity
    buffer: usize,
    /// Max wait on one full consumer queue
    delivery_timeout: Duration,
    logger: Arc<dyn Logger>,
}

impl BroadcastHub {
    /// Create a hub over an explicitly owned registry.
    pub fn new(
        registry: Arc<ConsumerRegistry>,
        buffer: usize,
        delivery_timeout: Duration,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            registry,
            buffer: buffer.max(1),
            delivery_timeout,
            logger,
        }
    }

    /// Create a hub with a fresh registry and limits from config.
    pub fn from_config(config: &WatchConfig, logger: Arc<dyn Logger>) -> Self {
        Self::new(
            Arc::new(ConsumerRegistry::new()),
            config.consumer_buffer(),
            config.delivery_timeout(),
            logger,
        )
    }

    /// Register a new consumer.
    pub fn subscribe(&self) -> Result<(Subscription, ReleaseHandle), HubError> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let key = self.registry.register(tx)?;
        debug!(self.logger; "hub"; "{} subscribed (total: {})", key, self.registry.len());

        let released = Arc::new(AtomicBool::new(false));
        Ok((
            Subscription {
                key,
                rx,
                released: Arc::clone(&released),
            },
            ReleaseHandle {
                key,
                registry: Some(Arc::clone(&self.registry)),
                released,
            },
        ))
    }

    /// Deliver `msg` to every currently registered consumer.
    ///
    /// Returns the number of consumers that received it.
    pub async fn publish(&self, msg: &UpdateMessage) -> usize {
        let targets = self.registry.snapshot();
        if targets.is_empty() {
            debug!(self.logger; "hub"; "no consumers connected");
            return 0;
        }

        let mut delivered = 0;
        for (key, weak) in targets {
            // released since the snapshot
            let Some(tx) = weak.upgrade() else {
                continue;
            };
            match tx.send_timeout(msg.clone(), self.delivery_timeout).await {
                Ok(()) if self.registry.contains(key) => delivered += 1,
                Ok(()) => debug!(self.logger; "hub"; "{} released during send", key),
                Err(SendTimeoutError::Timeout(_)) => {
                    log!(self.logger; "hub"; "{} too slow, disconnecting", key);
                    self.registry.remove(key);
                }
                Err(SendTimeoutError::Closed(_)) => {
                    debug!(self.logger; "hub"; "{} gone", key);
                    self.registry.remove(key);
                }
            }
        }

        debug!(self.logger; "hub"; "broadcast {} to {} consumers", msg.path, delivered);
        delivered
    }

    /// Close every consumer channel and refuse new subscriptions.
    pub fn shutdown(&self) -> usize {
        let closed = self.registry.close();
        debug!(self.logger; "hub"; "shut down, closed {} consumers", closed);
        closed
    }

    pub fn consumer_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_closed(&self) -> bool {
        self.registry.is_closed()
    }
}
