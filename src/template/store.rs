//! Published template set with atomic replacement.
//!
//! Uses `arc-swap` for lock-free reads: a render sees either the old set or
//! the new one, never a mix.

use std::io::Write;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;

use super::exec::RenderError;
use super::set::TemplateSet;

#[derive(Debug)]
pub struct TemplateStore {
    current: ArcSwap<TemplateSet>,
}

impl TemplateStore {
    pub fn new(initial: TemplateSet) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Snapshot of the current set.
    #[inline]
    pub fn load(&self) -> Arc<TemplateSet> {
        self.current.load_full()
    }

    /// Replace the whole set.
    pub fn publish(&self, set: TemplateSet) {
        self.current.store(Arc::new(set));
    }

    pub fn render(&self, name: &str, data: &Value) -> Result<String, RenderError> {
        self.current.load().render(name, data)
    }

    pub fn render_to<W: Write + ?Sized>(
        &self,
        out: &mut W,
        name: &str,
        data: &Value,
    ) -> Result<(), RenderError> {
        self.current.load().render_to(out, name, data)
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new(TemplateSet::default())
    }
}
