//! Configuration section definitions.
//!
//! | Section    | Purpose                                        |
//! |------------|------------------------------------------------|
//! | `[reload]` | Watched paths, reload flags, delivery limits   |
//! | `[serve]`  | Development server (interface, port)           |

mod reload;
mod serve;

pub use reload::{DEFAULT_STATIC_ROOT, DEFAULT_STATIC_ROUTE, ReloadSettings};
pub use serve::ServeConfig;
