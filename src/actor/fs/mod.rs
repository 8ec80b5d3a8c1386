//! FileSystem Actor
//!
//! Watches directory trees and routes relevant changes to the publish worker.
//!
//! Architecture:
//! ```text
//! notify --> bridge thread --> RawChangeEvent --> ChangeRouter --> UpdateMessage
//!              (std mpsc)        (tokio mpsc)    (classify, rebuild)  (update queue)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use notify::RecommendedWatcher;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::logger::Logger;
use crate::reload::UpdateMessage;
use crate::{debug, log};

// Raw change -> UpdateMessage (classification and rebuilds).
pub mod router;
// Shared fs event types.
mod types;
// Per-directory registration.
mod tree;


pub use router::{ChangeRouter, RouterState};
pub use types::{ChangeKind, RawChangeEvent};

const EVENT_BUFFER: usize = 256;
const ERROR_BUFFER: usize = 32;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create watcher")]
    Init(#[source] notify::Error),

    #[error("failed to watch `{}`", .path.display())]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to walk `{}`", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: jwalk::Error,
    },

    #[error("watcher delivery error")]
    Delivery(#[source] notify::Error),
}

/// Receiving ends produced by [`TreeWatcher::start`].
#[derive(Debug)]
pub struct WatchStreams {
    pub events: mpsc::Receiver<RawChangeEvent>,
    pub errors: mpsc::Receiver<WatchError>,
}

type SharedWatcher = Arc<Mutex<Option<RecommendedWatcher>>>;

/// Recursive watch over a set of directory trees.
///
/// Every directory is registered individually; directories created later
/// are registered when their `Create` event arrives.
pub struct TreeWatcher {
    watcher: SharedWatcher,
    roots: Vec<PathBuf>,
    logger: Arc<dyn Logger>,
}

impl TreeWatcher {
    /// Register every directory under `roots` and start delivering events.
    ///
    /// Fails if any root is missing or cannot be registered.
    pub fn start(
        roots: &[PathBuf],
        logger: Arc<dyn Logger>,
    ) -> Result<(Self, WatchStreams), WatchError> {
        // notify delivers on its own thread through a std channel
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })
        .map_err(WatchError::Init)?;

        for root in roots {
            let count = tree::watch_tree(&mut watcher, root)?;
            debug!(logger; "watch"; "{}: {} directories", root.display(), count);
        }

        let watcher: SharedWatcher = Arc::new(Mutex::new(Some(watcher)));
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (error_tx, error_rx) = mpsc::channel(ERROR_BUFFER);

        let bridge = Bridge {
            watcher: Arc::clone(&watcher),
            events: event_tx,
            errors: error_tx,
            logger: Arc::clone(&logger),
        };
        thread::Builder::new()
            .name("hotreload-watch".into())
            .spawn(move || bridge.run(notify_rx))
            .map_err(|err| WatchError::Init(notify::Error::io(err)))?;

        Ok((
            Self {
                watcher,
                roots: roots.to_vec(),
                logger,
            },
            WatchStreams {
                events: event_rx,
                errors: error_rx,
            },
        ))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_closed(&self) -> bool {
        self.watcher.lock().is_none()
    }

    /// Stop watching. The event stream ends once the bridge thread exits.
    pub fn close(&self) {
        if self.watcher.lock().take().is_some() {
            debug!(self.logger; "watch"; "watcher closed");
        }
    }
}

impl Drop for TreeWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Moves notify results into the tokio streams.
struct Bridge {
    watcher: SharedWatcher,
    events: mpsc::Sender<RawChangeEvent>,
    errors: mpsc::Sender<WatchError>,
    logger: Arc<dyn Logger>,
}

impl Bridge {
    /// Runs until the watcher is dropped or the event receiver goes away.
    fn run(self, notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>) {
        while let Ok(result) = notify_rx.recv() {
            let delivered = match result {
                Ok(event) => self.forward(event),
                Err(err) => self.report(err),
            };
            if !delivered {
                break;
            }
        }
    }

    fn forward(&self, event: notify::Event) -> bool {
        for change in RawChangeEvent::from_notify(event) {
            if change.kind == ChangeKind::Create && change.path.is_dir() {
                self.watch_new_dir(&change);
            }
            if self.events.blocking_send(change).is_err() {
                return false;
            }
        }
        true
    }

    fn watch_new_dir(&self, change: &RawChangeEvent) {
        let mut guard = self.watcher.lock();
        let Some(watcher) = guard.as_mut() else {
            return;
        };
        match tree::watch_tree(watcher, &change.path) {
            Ok(count) => {
                debug!(self.logger; "watch"; "watching new directory {} ({})", change.path.display(), count)
            }
            Err(err) => self.push_error(err),
        }
    }

    /// Errors naming paths also surface as `Error` events.
    fn report(&self, err: notify::Error) -> bool {
        let paths = err.paths.clone();
        self.push_error(WatchError::Delivery(err));
        for path in paths {
            if self
                .events
                .blocking_send(RawChangeEvent::new(path, ChangeKind::Error))
                .is_err()
            {
                return false;
            }
        }
        true
    }

    fn push_error(&self, err: WatchError) {
        if let Err(mpsc::error::TrySendError::Full(err)) = self.errors.try_send(err) {
            log!(self.logger; "watch"; "dropped watcher error: {}", err);
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

/// FileSystem Actor - routes watcher events into the update queue.
pub struct FsActor {
    streams: WatchStreams,
    router: ChangeRouter,
    updates: mpsc::Sender<UpdateMessage>,
    shutdown: watch::Receiver<bool>,
    logger: Arc<dyn Logger>,
}

impl FsActor {
    pub fn new(
        streams: WatchStreams,
        router: ChangeRouter,
        updates: mpsc::Sender<UpdateMessage>,
        shutdown: watch::Receiver<bool>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            streams,
            router,
            updates,
            shutdown,
            logger,
        }
    }

    /// Run until shutdown, end of the event stream, or the queue closing.
    ///
    /// Dropping `self` at the end closes the update queue.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                Some(err) = self.streams.errors.recv() => {
                    log!(self.logger; "watch"; "{}", crate::logger::error_chain(&err));
                }
                event = self.streams.events.recv() => {
                    let Some(event) = event else { break };
                    let Some(msg) = self.router.handle(&event).await else {
                        continue;
                    };
                    if self.updates.send(msg).await.is_err() {
                        break;
                    }
                }
            }
        }
        debug!(self.logger; "watch"; "fs worker stopped");
    }
}
