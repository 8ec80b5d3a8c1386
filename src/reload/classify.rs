//! Path Classification
//!
//! Pure functions deciding what a changed path means for the engine.
//! No watcher machinery, no side effects.
//!
//! Order matters: the template glob is tested first, so a template living
//! under the static root is routed as a template only.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use thiserror::Error;

use crate::config::WatchConfig;
use crate::utils::path::{display_path, glob_base_dir};

/// Malformed template glob.
#[derive(Debug, Error)]
#[error("invalid glob pattern `{pattern}`")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: globset::Error,
}

// =============================================================================
// Template pattern
// =============================================================================

/// Compiled template glob.
///
/// `*` matches within a single path segment; recursion must be spelled
/// out with `**`.
#[derive(Debug, Clone)]
pub struct TemplatePattern {
    raw: String,
    matcher: GlobMatcher,
}

impl TemplatePattern {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| PatternError {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            raw: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    #[inline]
    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Deepest literal directory containing every match.
    pub fn base_dir(&self) -> PathBuf {
        glob_base_dir(&self.raw)
    }
}

// =============================================================================
// Classification
// =============================================================================

/// What a changed path means for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Matches the template glob: recompile, then notify
    Template,
    /// Under the static root: notify only
    StaticAsset,
    /// Neither: ignore
    Irrelevant,
}

/// Classifies changed paths against the template and static-asset policies.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    template: TemplatePattern,
    static_root: String,
}

impl PathClassifier {
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            template: config.template_pattern().clone(),
            static_root: config.static_root().to_string(),
        }
    }

    /// Build from raw parts. Inputs are used verbatim (no normalization).
    pub fn from_parts(template_glob: &str, static_root: &str) -> Result<Self, PatternError> {
        Ok(Self {
            template: TemplatePattern::new(template_glob)?,
            static_root: static_root.to_string(),
        })
    }

    /// Classify a path already in config form (see [`display_path`]).
    pub fn classify(&self, path: &str) -> Classification {
        if self.template.is_match(path) {
            Classification::Template
        } else if path.starts_with(&self.static_root) {
            Classification::StaticAsset
        } else {
            Classification::Irrelevant
        }
    }

    /// Normalize a watcher path, then classify it.
    ///
    /// Returns the normalized path alongside, since it is what gets reported.
    pub fn classify_path(&self, path: &Path) -> (String, Classification) {
        let display = display_path(path);
        let class = self.classify(&display);
        (display, class)
    }
}
