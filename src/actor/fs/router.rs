//! Raw change -> update message.
//!
//! ```text
//!            Write + Template              rebuild done (ok or err)
//!   Idle ------------------------> Recompiling ----------------------> Idle
//!    |                                                                  ^
//!    +-- Write + StaticAsset: emit --------------------------------------+
//!    +-- other kinds / Irrelevant: nothing
//! ```
//!
//! Only content writes trigger reloads; creates, removes and renames do not
//! change rendered output until something writes to the file.

use std::sync::Arc;

use super::types::{ChangeKind, RawChangeEvent};
use crate::config::WatchConfig;
use crate::logger::{Logger, error_chain};
use crate::reload::{Classification, PathClassifier, UpdateMessage};
use crate::template::{TemplateCompiler, TemplateStore};
use crate::{debug, log};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Idle,
    Recompiling,
}

pub struct ChangeRouter {
    classifier: PathClassifier,
    compiler: Arc<TemplateCompiler>,
    store: Arc<TemplateStore>,
    auto_reload: bool,
    state: RouterState,
    logger: Arc<dyn Logger>,
}

impl ChangeRouter {
    pub fn new(
        config: &WatchConfig,
        compiler: Arc<TemplateCompiler>,
        store: Arc<TemplateStore>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self::from_parts(
            PathClassifier::new(config),
            compiler,
            store,
            config.auto_reload(),
            logger,
        )
    }

    pub fn from_parts(
        classifier: PathClassifier,
        compiler: Arc<TemplateCompiler>,
        store: Arc<TemplateStore>,
        auto_reload: bool,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            classifier,
            compiler,
            store,
            auto_reload,
            state: RouterState::Idle,
            logger,
        }
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    /// Route one event. Returns the message to broadcast, if any.
    pub async fn handle(&mut self, event: &RawChangeEvent) -> Option<UpdateMessage> {
        if event.kind != ChangeKind::Write {
            debug!(self.logger; "watch"; "{}: {}", event.kind.label(), event.path.display());
            return None;
        }

        let (path, class) = self.classifier.classify_path(&event.path);
        match class {
            Classification::Irrelevant => return None,
            Classification::StaticAsset => {
                log!(self.logger; "watch"; "modified file: {}", path);
            }
            Classification::Template => {
                log!(self.logger; "watch"; "modified template: {}", path);
                self.recompile().await;
            }
        }

        Some(UpdateMessage::new(path, self.auto_reload))
    }

    /// Rebuild on the blocking pool; keep the old set on failure.
    async fn recompile(&mut self) {
        self.state = RouterState::Recompiling;

        let compiler = Arc::clone(&self.compiler);
        match tokio::task::spawn_blocking(move || compiler.rebuild()).await {
            Ok(Ok(set)) => {
                debug!(self.logger; "watch"; "rebuilt {} templates", set.len());
                self.store.publish(set);
            }
            Ok(Err(err)) => {
                log!(self.logger; "error"; "template rebuild failed: {}", error_chain(&err));
            }
            Err(err) => {
                log!(self.logger; "error"; "template rebuild aborted: {}", err);
            }
        }

        self.state = RouterState::Idle;
    }
}
