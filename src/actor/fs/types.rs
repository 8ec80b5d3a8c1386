use std::path::PathBuf;

use notify::EventKind;
use notify::event::ModifyKind;

/// What happened to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Write,
    Create,
    Remove,
    Rename,
    /// The watcher reported an error naming this path
    Error,
}

impl ChangeKind {
    /// Map a notify event kind; metadata and access events map to `None`.
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Rename),
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Other) => {
                Some(Self::Write)
            }
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Create(_) => Some(Self::Create),
            EventKind::Remove(_) => Some(Self::Remove),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Write => "modified",
            Self::Create => "created",
            Self::Remove => "removed",
            Self::Rename => "renamed",
            Self::Error => "error",
        }
    }
}

/// One path, one kind. Multi-path notify events are split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl RawChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Split a notify event into per-path events.
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
            return Vec::new();
        };
        event
            .paths
            .into_iter()
            .map(|path| Self { path, kind })
            .collect()
    }
}
