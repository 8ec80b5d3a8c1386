//! Hot reload core.
//!
//! ```text
//! reload/
//! ├── classify   # PathClassifier: template / static asset / irrelevant
//! ├── message    # UpdateMessage wire format
//! ├── registry   # ConsumerRegistry: key -> delivery channel
//! └── hub        # BroadcastHub: subscribe / publish / shutdown
//! ```

pub mod classify;
pub mod hub;
pub mod message;
pub mod registry;

pub use classify::{Classification, PathClassifier, PatternError, TemplatePattern};
pub use hub::{BroadcastHub, ReleaseHandle, Subscription};
pub use message::UpdateMessage;
pub use registry::{ConsumerKey, ConsumerRegistry, HubError};
