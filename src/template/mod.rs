//! Templates: a small Go-template-like language with hot rebuilds.
//!
//! # Module Structure
//!
//! - `parse` - source to node tree (`ParseError`)
//! - `exec` - node tree execution against `serde_json::Value` (`RenderError`)
//! - `set` - `TemplateSet`, the immutable name -> template map
//! - `compile` - `TemplateCompiler`, glob -> set with script injection
//! - `store` - `TemplateStore`, the atomically swapped current set

mod compile;
mod exec;
mod parse;
mod set;
mod store;

pub use compile::{CompileError, TemplateCompiler, inject_reload_script};
pub use exec::{MAX_DEPTH, RenderError, is_truthy};
pub use parse::{FieldPath, Node, ParseError, ParseErrorKind};
pub use set::{Template, TemplateSet};
pub use store::TemplateStore;
