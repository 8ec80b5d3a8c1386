//! `[reload]` section configuration.
//!
//! Raw, user-facing settings for the reload engine. Normalized into an
//! immutable [`WatchConfig`](crate::config::WatchConfig) at engine start.
//!
//! # Example
//!
//! ```toml
//! [reload]
//! static_root = "./static"             # Static asset tree (prefix match)
//! template_glob = "./templates/*.html" # Template sources (required)
//! static_route = "/assets"             # URL prefix for static files
//! hot_reload = true                    # Serve the live reload script
//! auto_reload = true                   # Ask clients to reload on change
//! delivery_timeout_ms = 1000           # Max wait per slow consumer
//! consumer_buffer = 16                 # Queued messages per consumer
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default static file root.
pub const DEFAULT_STATIC_ROOT: &str = "./static";

/// Default URL prefix for static files.
pub const DEFAULT_STATIC_ROUTE: &str = "/assets";

/// Reload engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadSettings {
    /// Static asset directory. Writes under it trigger a reload.
    pub static_root: String,

    /// Glob selecting template sources. `*` does not cross `/`.
    pub template_glob: Option<String>,

    /// URL prefix the transport serves static files under.
    /// Not used by the engine itself.
    pub static_route: String,

    /// Serve the live reload script (otherwise an inert stub).
    pub hot_reload: bool,

    /// Value of `autoReload` in every update message.
    pub auto_reload: bool,

    /// How long a publish waits on one full consumer before dropping it.
    pub delivery_timeout_ms: u64,

    /// Per-consumer queue capacity.
    pub consumer_buffer: usize,
}

impl Default for ReloadSettings {
    fn default() -> Self {
        Self {
            static_root: DEFAULT_STATIC_ROOT.to_string(),
            template_glob: None,
            static_route: DEFAULT_STATIC_ROUTE.to_string(),
            hot_reload: true,
            auto_reload: true,
            delivery_timeout_ms: 1000,
            consumer_buffer: 16,
        }
    }
}

impl ReloadSettings {
    /// Settings with the required template glob and defaults elsewhere.
    pub fn new(template_glob: impl Into<String>) -> Self {
        Self {
            template_glob: Some(template_glob.into()),
            ..Self::default()
        }
    }

    pub fn with_static_root(mut self, root: impl Into<String>) -> Self {
        self.static_root = root.into();
        self
    }

    pub fn with_template_glob(mut self, glob: impl Into<String>) -> Self {
        self.template_glob = Some(glob.into());
        self
    }

    pub fn with_static_route(mut self, route: impl Into<String>) -> Self {
        self.static_route = route.into();
        self
    }

    pub fn with_hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload = enabled;
        self
    }

    pub fn with_auto_reload(mut self, enabled: bool) -> Self {
        self.auto_reload = enabled;
        self
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_consumer_buffer(mut self, capacity: usize) -> Self {
        self.consumer_buffer = capacity;
        self
    }
}
