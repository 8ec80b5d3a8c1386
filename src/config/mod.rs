//! Configuration for `hotreload.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── reload     # [reload]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   └── error      # ConfigError
//! ├── watch          # WatchConfig (normalized [reload])
//! └── mod.rs         # ConfigFile (this file)
//! ```

pub mod section;
pub mod types;
mod watch;

pub use section::{DEFAULT_STATIC_ROOT, DEFAULT_STATIC_ROUTE, ReloadSettings, ServeConfig};
pub use types::ConfigError;
pub use watch::WatchConfig;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::logger::Logger;

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "hotreload.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing hotreload.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Reload engine settings
    #[serde(default)]
    pub reload: ReloadSettings,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl ConfigFile {
    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    ///
    /// Unknown fields are reported through `logger` and otherwise ignored.
    pub fn load(path: &Path, logger: &dyn Logger) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        for field in &ignored {
            logger.log(
                "config",
                &format!("unknown field `{}` in {}", field, path.display()),
            );
        }

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path, logger: &dyn Logger) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path, logger)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }
}

/// Parse a config snippet, failing on unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ConfigFile {
    let (parsed, ignored) = ConfigFile::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NullLogger;

    #[test]
    fn test_invalid_toml_syntax() {
        let result = ConfigFile::from_str("[reload\ntemplate_glob = \"x\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) =
            ConfigFile::parse_with_ignored("[reload]\ntemplate_glob = \"a/*.html\"\ncolour = 1")
                .unwrap();
        assert_eq!(ignored, vec!["reload.colour".to_string()]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[reload]\ntemplate_glob = \"./views/*.html\"\n").unwrap();

        let config = ConfigFile::load(&path, &NullLogger).unwrap();
        assert_eq!(config.reload.template_glob.as_deref(), Some("./views/*.html"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");

        assert!(matches!(
            ConfigFile::load(&path, &NullLogger),
            Err(ConfigError::Io(..))
        ));
        let config = ConfigFile::load_or_default(&path, &NullLogger).unwrap();
        assert_eq!(config.reload, ReloadSettings::default());
    }
}
