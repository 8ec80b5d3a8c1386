//! Actor System for Hot Reload
//!
//! Message-passing concurrency for watch mode:
//!
//! ```text
//! FsActor --> BroadcastActor --> consumers
//! (watch)      (publish)
//! ```
//!
//! # Module Structure
//!
//! - `fs` - Tree watcher, change router and the fs worker
//! - `broadcast` - Publish worker draining the update queue
//! - `coordinator` - `ReloadEngine`, wires up and runs actors

pub mod broadcast;
pub mod coordinator;
pub mod fs;

pub use coordinator::{EngineError, ReloadEngine};
