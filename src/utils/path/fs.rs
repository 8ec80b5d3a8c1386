//! Path normalization utilities.
//!
//! Config paths and watcher paths must share one textual form so that
//! prefix and glob matching agree:
//! - relative paths always start with `./`
//! - absolute paths under the current directory are rewritten to `./relative`
//! - other absolute paths are kept as-is
//!
//! - `normalize_dir` - directory roots (trailing `/` enforced)
//! - `normalize_glob` - glob patterns
//! - `display_path` - paths reported by the watcher
//! - `glob_base_dir` - literal directory prefix of a glob

use std::path::{Path, PathBuf};

/// Characters that make a path component a glob pattern.
const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

/// Candidate spellings of the current directory (raw and canonical).
///
/// The watcher may report canonical paths (e.g. `/private/var` on macOS)
/// while config paths use the raw spelling, so both are tried.
pub fn current_dirs() -> Vec<PathBuf> {
    let Ok(cwd) = std::env::current_dir() else {
        return Vec::new();
    };
    let mut dirs = vec![cwd.clone()];
    if let Ok(canonical) = cwd.canonicalize()
        && canonical != cwd
    {
        dirs.push(canonical);
    }
    dirs
}

/// Normalize a path reported by the watcher into config form.
#[inline]
pub fn display_path(path: &Path) -> String {
    display_path_in(path, &current_dirs())
}

/// Same as [`display_path`], with explicit current-directory candidates.
pub fn display_path_in(path: &Path, cwds: &[PathBuf]) -> String {
    if path.is_absolute() {
        for cwd in cwds {
            if let Ok(rel) = path.strip_prefix(cwd) {
                return dot_relative(&to_slash(rel));
            }
        }
        return to_slash(path);
    }
    dot_relative(&to_slash(path))
}

/// Normalize a directory root: `./` prefix for relative paths, trailing `/`.
///
/// # Example
/// ```ignore
/// assert_eq!(normalize_dir("static"), "./static/");
/// ```
pub fn normalize_dir(dir: &str) -> String {
    let mut dir = display_path_in(Path::new(dir), &current_dirs());
    if !dir.ends_with('/') {
        dir.push('/');
    }
    dir
}

/// Normalize a glob pattern: `./` prefix for relative patterns.
pub fn normalize_glob(glob: &str) -> String {
    display_path_in(Path::new(glob), &current_dirs())
}

/// Literal directory part of a glob, i.e. the deepest directory that
/// contains every possible match.
///
/// # Example
/// ```ignore
/// assert_eq!(glob_base_dir("./templates/*.html"), PathBuf::from("./templates/"));
/// assert_eq!(glob_base_dir("./views/**/*.html"), PathBuf::from("./views/"));
/// ```
pub fn glob_base_dir(glob: &str) -> PathBuf {
    let components: Vec<&str> = glob.split('/').collect();
    // The last component is the file pattern itself
    let dirs = &components[..components.len().saturating_sub(1)];

    let literal: Vec<&str> = dirs
        .iter()
        .take_while(|c| !c.contains(GLOB_META))
        .copied()
        .collect();

    if literal.is_empty() || literal == [""] && !glob.starts_with('/') {
        return PathBuf::from("./");
    }
    PathBuf::from(format!("{}/", literal.join("/")))
}

/// Prefix relative paths with `./` (unless already `./` or `../`).
fn dot_relative(path: &str) -> String {
    if path.is_empty() || path == "." {
        return "./".to_string();
    }
    if path.starts_with('/') || path.starts_with("./") || path.starts_with("../") {
        return path.to_string();
    }
    format!("./{path}")
}

/// Lossy string with `/` separators.
fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dir_adds_prefix_and_slash() {
        assert_eq!(normalize_dir("static"), "./static/");
        assert_eq!(normalize_dir("./static"), "./static/");
        assert_eq!(normalize_dir("./static/"), "./static/");
    }

    #[test]
    fn test_normalize_dir_keeps_foreign_absolute() {
        assert_eq!(
            display_path_in(Path::new("/srv/site/static"), &[PathBuf::from("/home/me")]),
            "/srv/site/static"
        );
    }

    #[test]
    fn test_normalize_glob() {
        assert_eq!(normalize_glob("templates/*.html"), "./templates/*.html");
        assert_eq!(normalize_glob("./templates/*.html"), "./templates/*.html");
    }

    #[test]
    fn test_display_path_strips_cwd() {
        let cwds = [PathBuf::from("/work/site")];
        assert_eq!(
            display_path_in(Path::new("/work/site/templates/index.html"), &cwds),
            "./templates/index.html"
        );
        assert_eq!(
            display_path_in(Path::new("templates/index.html"), &cwds),
            "./templates/index.html"
        );
        assert_eq!(
            display_path_in(Path::new("./static/app.css"), &cwds),
            "./static/app.css"
        );
    }

    #[test]
    fn test_display_path_tries_every_cwd() {
        let cwds = [PathBuf::from("/var/site"), PathBuf::from("/private/var/site")];
        assert_eq!(
            display_path_in(Path::new("/private/var/site/static/a.css"), &cwds),
            "./static/a.css"
        );
    }

    #[test]
    fn test_glob_base_dir() {
        assert_eq!(glob_base_dir("./templates/*.html"), PathBuf::from("./templates/"));
        assert_eq!(glob_base_dir("./views/**/*.html"), PathBuf::from("./views/"));
        assert_eq!(glob_base_dir("./a/*/b/*.html"), PathBuf::from("./a/"));
        assert_eq!(glob_base_dir("./*.html"), PathBuf::from("./"));
        assert_eq!(glob_base_dir("/abs/tpl/*.html"), PathBuf::from("/abs/tpl/"));
        assert_eq!(
            glob_base_dir("./templates/index.html"),
            PathBuf::from("./templates/")
        );
    }
}
