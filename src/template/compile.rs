//! Template rebuilds.
//!
//! A rebuild enumerates every file matching the template glob, injects the
//! reload script reference before `</head>`, and parses the result into a
//! fresh [`TemplateSet`]. The first failure aborts the rebuild; callers
//! keep serving the previous set.

use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::parse::ParseError;
use super::set::{Template, TemplateSet};
use crate::reload::{PatternError, TemplatePattern};
use crate::utils::path::display_path;

/// Closing head tag, matched case-sensitively.
const HEAD_CLOSE: &str = "</head>";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("failed to walk `{}`", .0.display())]
    Walk(PathBuf, #[source] jwalk::Error),

    #[error("failed to read `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse `{}`", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("duplicate template name `{name}` (`{}` and `{}`)", .first.display(), .second.display())]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Insert `script_tag` right before the first `</head>`.
///
/// Sources without the marker are returned unchanged.
pub fn inject_reload_script(source: &str, script_tag: &str) -> String {
    match source.find(HEAD_CLOSE) {
        Some(pos) => {
            let mut result = String::with_capacity(source.len() + script_tag.len());
            result.push_str(&source[..pos]);
            result.push_str(script_tag);
            result.push_str(&source[pos..]);
            result
        }
        None => source.to_string(),
    }
}

/// Builds whole template sets from the files matching one glob.
#[derive(Debug, Clone)]
pub struct TemplateCompiler {
    pattern: TemplatePattern,
    script_tag: String,
}

impl TemplateCompiler {
    /// `script_src` is the URL the injected `<script>` loads.
    pub fn new(pattern: TemplatePattern, script_src: &str) -> Self {
        Self {
            pattern,
            script_tag: format!(r#"<script src="{script_src}"></script>"#),
        }
    }

    /// Compile from a raw glob string.
    pub fn from_glob(glob: &str, script_src: &str) -> Result<Self, CompileError> {
        Ok(Self::new(TemplatePattern::new(glob)?, script_src))
    }

    pub fn pattern(&self) -> &TemplatePattern {
        &self.pattern
    }

    /// Build a complete set, or fail without a partial one.
    ///
    /// Blocking: reads and parses every matching file.
    pub fn rebuild(&self) -> Result<TemplateSet, CompileError> {
        let mut set = TemplateSet::new();
        let mut origins: FxHashMap<String, PathBuf> = FxHashMap::default();

        for path in self.matching_files()? {
            let name = template_name(&path);
            if let Some(first) = origins.get(&name) {
                return Err(CompileError::DuplicateName {
                    name,
                    first: first.clone(),
                    second: path,
                });
            }

            let raw = fs::read_to_string(&path).map_err(|err| CompileError::Io(path.clone(), err))?;
            let source = inject_reload_script(&raw, &self.script_tag);
            let template = Template::parse(name.clone(), &source).map_err(|source| {
                CompileError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

            set.insert(template);
            origins.insert(name, path);
        }

        Ok(set)
    }

    /// Matching files in sorted walk order. A missing base dir matches nothing.
    fn matching_files(&self) -> Result<Vec<PathBuf>, CompileError> {
        let base = self.pattern.base_dir();
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&base).sort(true) {
            let entry = entry.map_err(|err| CompileError::Walk(base.clone(), err))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if self.pattern.is_match(&display_path(&path)) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

/// File base name, e.g. `./templates/index.html` -> `index.html`.
fn template_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
