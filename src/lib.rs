//! Live reload for template-driven sites.
//!
//! Watches a static asset tree and a template glob, rebuilds the template
//! set on template changes, and pushes an [`UpdateMessage`] to every
//! connected consumer for each relevant change.
//!
//! ```ignore
//! let settings = ReloadSettings::new("./templates/*.html");
//! let engine = ReloadEngine::start(&settings).await?;
//! let (mut sub, handle) = engine.subscribe()?;
//! while let Some(msg) = sub.recv().await {
//!     println!("{}", msg.to_json());
//! }
//! handle.release();
//! engine.stop().await;
//! ```

pub mod logger;

pub mod actor;
pub mod config;
pub mod embed;
pub mod reload;
pub mod serve;
pub mod template;
pub mod utils;

pub use actor::{EngineError, ReloadEngine};
pub use config::{ConfigError, ConfigFile, ReloadSettings, WatchConfig};
pub use logger::{Logger, NullLogger, TerminalLogger};
pub use reload::{
    BroadcastHub, Classification, HubError, PathClassifier, ReleaseHandle, Subscription,
    UpdateMessage,
};
pub use template::{RenderError, TemplateCompiler, TemplateSet, TemplateStore};
