//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Config/watcher path normalization (`normalize_dir`, `display_path`, `glob_base_dir`)

pub mod fs;

pub use fs::{display_path, glob_base_dir, normalize_dir, normalize_glob};
