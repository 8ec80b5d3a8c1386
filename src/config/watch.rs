//! Normalized, immutable engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use super::section::ReloadSettings;
use super::types::ConfigError;
use crate::reload::TemplatePattern;
use crate::utils::path::{normalize_dir, normalize_glob};

/// Validated form of [`ReloadSettings`].
///
/// Invariants:
/// - `static_root` ends with `/`; relative roots start with `./`
/// - `template_glob` compiled successfully; relative globs start with `./`
#[derive(Debug, Clone)]
pub struct WatchConfig {
    static_root: String,
    template: TemplatePattern,
    static_route: String,
    hot_reload: bool,
    auto_reload: bool,
    delivery_timeout: Duration,
    consumer_buffer: usize,
}

impl WatchConfig {
    /// Normalize and validate settings.
    pub fn from_settings(settings: &ReloadSettings) -> Result<Self, ConfigError> {
        let glob = settings
            .template_glob
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .ok_or(ConfigError::MissingTemplateGlob)?;

        if settings.static_root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "`static_root` must not be empty".into(),
            ));
        }
        if settings.consumer_buffer == 0 {
            return Err(ConfigError::Validation(
                "`consumer_buffer` must be at least 1".into(),
            ));
        }

        let template = TemplatePattern::new(&normalize_glob(glob))?;

        Ok(Self {
            static_root: normalize_dir(settings.static_root.trim()),
            template,
            static_route: normalize_route(&settings.static_route),
            hot_reload: settings.hot_reload,
            auto_reload: settings.auto_reload,
            delivery_timeout: Duration::from_millis(settings.delivery_timeout_ms),
            consumer_buffer: settings.consumer_buffer,
        })
    }

    pub fn static_root(&self) -> &str {
        &self.static_root
    }

    pub fn template_glob(&self) -> &str {
        self.template.as_str()
    }

    pub fn template_pattern(&self) -> &TemplatePattern {
        &self.template
    }

    pub fn static_route(&self) -> &str {
        &self.static_route
    }

    pub fn hot_reload(&self) -> bool {
        self.hot_reload
    }

    pub fn auto_reload(&self) -> bool {
        self.auto_reload
    }

    pub fn delivery_timeout(&self) -> Duration {
        self.delivery_timeout
    }

    pub fn consumer_buffer(&self) -> usize {
        self.consumer_buffer
    }

    /// Directories to watch: the static root and the template base directory.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![PathBuf::from(&self.static_root)];
        let template_dir = self.template.base_dir();
        if !roots.contains(&template_dir) {
            roots.push(template_dir);
        }
        roots
    }
}

/// `assets` / `/assets/` -> `/assets`
fn normalize_route(route: &str) -> String {
    let trimmed = route.trim().trim_matches('/');
    format!("/{trimmed}")
}
