//! Reload Engine - wires up and owns the actor system.
//!
//! The engine is a thin orchestrator that:
//! - Normalizes config and builds the first template set
//! - Creates communication channels
//! - Spawns the fs worker and the publish worker
//! - Tears everything down in order on `stop`
//!
//! ```text
//! TreeWatcher --> FsActor (ChangeRouter) --> update queue --> BroadcastActor --> hub
//!                     |
//!                     +--> TemplateStore <-- render()
//! ```

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::broadcast::BroadcastActor;
use super::fs::{ChangeRouter, FsActor, TreeWatcher, WatchError};
use crate::config::{ConfigError, ReloadSettings, WatchConfig};
use crate::embed::serve::RELOAD_SCRIPT_ROUTE;
use crate::logger::{Logger, TerminalLogger};
use crate::reload::{BroadcastHub, HubError, ReleaseHandle, Subscription};
use crate::template::{CompileError, RenderError, TemplateCompiler, TemplateStore};
use crate::{debug, log};

#[cfg(test)]
mod tests;

const UPDATE_BUFFER: usize = 32;

/// Engine construction failure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    #[error("initial template build failed")]
    Compile(#[from] CompileError),

    #[error("failed to start watcher")]
    Watch(#[from] WatchError),
}

/// Running workers, taken out on stop.
struct Workers {
    shutdown: watch::Sender<bool>,
    watcher: TreeWatcher,
    fs: JoinHandle<()>,
    publish: JoinHandle<()>,
}

/// Watches templates and static files, keeps the compiled templates
/// current, and pushes an [`UpdateMessage`](crate::reload::UpdateMessage)
/// to every consumer on each relevant change.
///
/// Share it as `Arc<ReloadEngine>`; every operation takes `&self`.
pub struct ReloadEngine {
    config: WatchConfig,
    store: Arc<TemplateStore>,
    hub: Arc<BroadcastHub>,
    workers: Mutex<Option<Workers>>,
    logger: Arc<dyn Logger>,
}

impl ReloadEngine {
    /// Start with the default terminal logger.
    pub async fn start(settings: &ReloadSettings) -> Result<Self, EngineError> {
        Self::start_with_logger(settings, Arc::new(TerminalLogger::default())).await
    }

    /// Start watching. Must be called within a tokio runtime.
    ///
    /// Fails if the config is invalid, the initial template build fails,
    /// or a watch root cannot be registered.
    pub async fn start_with_logger(
        settings: &ReloadSettings,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, EngineError> {
        let config = WatchConfig::from_settings(settings)?;
        log!(logger; "reload"; "static root: {}", config.static_root());
        log!(logger; "reload"; "template glob: {}", config.template_glob());

        let compiler = Arc::new(TemplateCompiler::new(
            config.template_pattern().clone(),
            RELOAD_SCRIPT_ROUTE,
        ));
        let initial = compiler.rebuild()?;
        debug!(logger; "reload"; "compiled {} templates", initial.len());
        let store = Arc::new(TemplateStore::new(initial));

        let hub = Arc::new(BroadcastHub::from_config(&config, Arc::clone(&logger)));
        let (watcher, streams) = TreeWatcher::start(&config.watch_roots(), Arc::clone(&logger))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (update_tx, update_rx) = mpsc::channel(UPDATE_BUFFER);

        let router = ChangeRouter::new(
            &config,
            Arc::clone(&compiler),
            Arc::clone(&store),
            Arc::clone(&logger),
        );
        let fs = FsActor::new(streams, router, update_tx, shutdown_rx, Arc::clone(&logger));
        let publish = BroadcastActor::new(update_rx, Arc::clone(&hub), Arc::clone(&logger));

        let workers = Workers {
            shutdown: shutdown_tx,
            watcher,
            fs: tokio::spawn(fs.run()),
            publish: tokio::spawn(publish.run()),
        };

        log!(logger; "reload"; "hot reload engine started");
        Ok(Self {
            config,
            store,
            hub,
            workers: Mutex::new(Some(workers)),
            logger,
        })
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Whether transports should serve the live reload script.
    pub fn is_hot_reload_enabled(&self) -> bool {
        self.config.hot_reload()
    }

    pub fn is_auto_reload_enabled(&self) -> bool {
        self.config.auto_reload()
    }

    /// Render `name` with the currently published template set.
    pub fn render(&self, name: &str, data: &Value) -> Result<String, RenderError> {
        self.store.render(name, data)
    }

    pub fn render_to<W: Write + ?Sized>(
        &self,
        out: &mut W,
        name: &str,
        data: &Value,
    ) -> Result<(), RenderError> {
        self.store.render_to(out, name, data)
    }

    /// Template names in the current set.
    pub fn template_names(&self) -> Vec<String> {
        self.store.load().names().map(str::to_string).collect()
    }

    /// Register a new consumer. Fails once the engine has stopped.
    pub fn subscribe(&self) -> Result<(Subscription, ReleaseHandle), HubError> {
        self.hub.subscribe()
    }

    pub fn consumer_count(&self) -> usize {
        self.hub.consumer_count()
    }

    pub fn is_running(&self) -> bool {
        self.workers.lock().is_some()
    }

    /// Stop watching and close every consumer. Safe to call repeatedly.
    ///
    /// Messages already queued are delivered before consumers are closed.
    pub async fn stop(&self) {
        let Some(workers) = self.workers.lock().take() else {
            return;
        };

        let _ = workers.shutdown.send(true);
        workers.watcher.close();

        if let Err(err) = workers.fs.await {
            log!(self.logger; "error"; "fs worker failed: {}", err);
        }
        // the fs worker held the last queue sender
        if let Err(err) = workers.publish.await {
            log!(self.logger; "error"; "publish worker failed: {}", err);
        }

        log!(self.logger; "reload"; "hot reload engine stopped");
    }
}

impl Drop for ReloadEngine {
    fn drop(&mut self) {
        // unjoined workers wind down on their own
        if let Some(workers) = self.workers.get_mut().take() {
            let _ = workers.shutdown.send(true);
            workers.watcher.close();
        }
    }
}
