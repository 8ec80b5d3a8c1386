//! Reload Message Protocol
//!
//! JSON format pushed to every connected client:
//!
//! ```json
//! {"path": "./templates/index.html", "autoReload": true}
//! ```

use serde::{Deserialize, Serialize};

/// One relevant change, as delivered to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessage {
    /// Changed path, in config form (e.g. `./static/app.css`)
    pub path: String,
    /// Whether the client should reload the page
    pub auto_reload: bool,
}

impl UpdateMessage {
    pub fn new(path: impl Into<String>, auto_reload: bool) -> Self {
        Self {
            path: path.into(),
            auto_reload,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"path":"","autoReload":{}}}"#, self.auto_reload)
        })
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}
