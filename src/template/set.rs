//! Compiled template set.

use std::collections::BTreeMap;
use std::io::Write;

use serde_json::Value;

use super::exec::{Executor, RenderError};
use super::parse::{Node, ParseError, parse};

/// One parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, ParseError> {
        Ok(Self {
            name: name.into(),
            nodes: parse(source)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// Immutable once published: the engine swaps whole sets, never edits one.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: BTreeMap<String, Template>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template, replacing any previous one with the same name.
    pub fn insert(&mut self, template: Template) -> Option<Template> {
        self.templates.insert(template.name.clone(), template)
    }

    /// Parse `source` and add it under `name`.
    pub fn add(&mut self, name: impl Into<String>, source: &str) -> Result<(), ParseError> {
        self.insert(Template::parse(name, source)?);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Template names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Execute `name` into `out`.
    ///
    /// On error, `out` may hold partial output.
    pub fn render_to<W: Write + ?Sized>(
        &self,
        out: &mut W,
        name: &str,
        data: &Value,
    ) -> Result<(), RenderError> {
        Executor::new(self, out).run(name, data, 0)
    }

    /// Execute `name` into a fresh string.
    pub fn render(&self, name: &str, data: &Value) -> Result<String, RenderError> {
        let mut buf = Vec::new();
        self.render_to(&mut buf, name, data)?;
        // sources and escaped values are both valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
