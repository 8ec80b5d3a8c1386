//! Embedded static resources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Reload client script, its inert stub, and the routes they use
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{RELOAD_JS, ReloadVars};
//!
//! let js = RELOAD_JS.render(&ReloadVars::default());
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// Route of the reload client script.
    pub const RELOAD_SCRIPT_ROUTE: &str = "/hotreload/reload.js";

    /// Route of the WebSocket endpoint.
    pub const RELOAD_SOCKET_ROUTE: &str = "/hotreload/ws";

    /// Served instead of the client script when hot reload is off.
    pub const RELOAD_STUB: &str = "// hot reload disabled";

    /// Client reconnect interval.
    pub const RECONNECT_MS: u64 = 1000;

    /// Variables for reload.js.
    pub struct ReloadVars<'a> {
        pub ws_path: &'a str,
        pub reconnect_ms: u64,
    }

    impl Default for ReloadVars<'_> {
        fn default() -> Self {
            Self {
                ws_path: RELOAD_SOCKET_ROUTE,
                reconnect_ms: RECONNECT_MS,
            }
        }
    }

    impl TemplateVars for ReloadVars<'_> {
        fn apply(&self, content: &str) -> String {
            content
                .replace("__WS_PATH__", self.ws_path)
                .replace("__RECONNECT_MS__", &self.reconnect_ms.to_string())
        }
    }

    /// Reload client: connects to the socket route and reloads on updates.
    pub const RELOAD_JS: Template<ReloadVars<'static>> =
        Template::new(include_str!("serve/reload.js"));

    /// Script body for the reload route.
    pub fn reload_script(hot_reload: bool) -> String {
        if hot_reload {
            RELOAD_JS.render(&ReloadVars::default())
        } else {
            RELOAD_STUB.to_string()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_live_script_has_no_placeholders() {
            let js = reload_script(true);
            assert!(js.contains("\"/hotreload/ws\""));
            assert!(js.contains("RECONNECT_MS = 1000;"));
            assert!(js.contains("msg.autoReload"));
            assert!(!js.contains("__"));
        }

        #[test]
        fn test_stub_when_disabled() {
            assert_eq!(reload_script(false), "// hot reload disabled");
        }

        #[test]
        fn test_raw_content_keeps_placeholders() {
            assert!(RELOAD_JS.content().contains("__WS_PATH__"));
        }
    }
}
