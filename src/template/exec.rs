//! Node tree execution against JSON data.

use std::io::{self, Write};

use serde_json::Value;
use thiserror::Error;

use super::parse::{FieldPath, Node};
use super::set::TemplateSet;
use crate::utils::html::escape;

/// Max nesting of blocks and template invocations.
pub const MAX_DEPTH: usize = 32;

static NULL: Value = Value::Null;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template `{0}` not found")]
    NotFound(String),

    #[error("template `{template}`: no value for `{path}`")]
    MissingValue { template: String, path: String },

    #[error("template `{template}`: cannot range over `{path}`")]
    NotIterable { template: String, path: String },

    #[error("template `{template}`: unknown template `{name}`")]
    UnknownTemplate { template: String, name: String },

    #[error("template `{0}`: exceeded max nesting depth")]
    DepthExceeded(String),

    #[error("failed to write output")]
    Io(#[from] io::Error),
}

/// Go-style truthiness: false, null, 0, "", [] and {} are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

pub(super) struct Executor<'a, W: ?Sized> {
    set: &'a TemplateSet,
    out: &'a mut W,
}

impl<'a, W: Write + ?Sized> Executor<'a, W> {
    pub fn new(set: &'a TemplateSet, out: &'a mut W) -> Self {
        Self { set, out }
    }

    /// Execute template `name` with `data` as the root context.
    pub fn run(&mut self, name: &str, data: &Value, depth: usize) -> Result<(), RenderError> {
        let set = self.set;
        let template = set
            .get(name)
            .ok_or_else(|| RenderError::NotFound(name.to_string()))?;
        self.nodes(name, template.nodes(), data, depth)
    }

    fn nodes(
        &mut self,
        template: &str,
        nodes: &[Node],
        data: &Value,
        depth: usize,
    ) -> Result<(), RenderError> {
        if depth > MAX_DEPTH {
            return Err(RenderError::DepthExceeded(template.to_string()));
        }

        for node in nodes {
            match node {
                Node::Text(text) => self.out.write_all(text.as_bytes())?,
                Node::Value(path) => {
                    let value = lookup(template, data, path)?;
                    self.out.write_all(escape(&to_text(value)).as_bytes())?;
                }
                Node::If {
                    path,
                    then,
                    otherwise,
                } => {
                    let branch = if is_truthy(lookup(template, data, path)?) {
                        then
                    } else {
                        otherwise
                    };
                    self.nodes(template, branch, data, depth + 1)?;
                }
                Node::Range {
                    path,
                    body,
                    otherwise,
                } => self.range(template, path, body, otherwise, data, depth)?,
                Node::Invoke { name, context } => {
                    if !self.set.contains(name) {
                        return Err(RenderError::UnknownTemplate {
                            template: template.to_string(),
                            name: name.clone(),
                        });
                    }
                    let ctx = lookup(template, data, context)?;
                    self.run(name, ctx, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    fn range(
        &mut self,
        template: &str,
        path: &FieldPath,
        body: &[Node],
        otherwise: &[Node],
        data: &Value,
        depth: usize,
    ) -> Result<(), RenderError> {
        let items: Vec<&Value> = match lookup(template, data, path)? {
            Value::Null => Vec::new(),
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => map.values().collect(),
            _ => {
                return Err(RenderError::NotIterable {
                    template: template.to_string(),
                    path: path.to_string(),
                });
            }
        };

        if items.is_empty() {
            return self.nodes(template, otherwise, data, depth + 1);
        }
        for item in items {
            self.nodes(template, body, item, depth + 1)?;
        }
        Ok(())
    }
}

/// Field lookup.
///
/// A key missing from an object reads as `null` (renders empty, is falsy,
/// ranges over nothing), like Go templates over maps. Indexing past an
/// array or into a scalar is an error.
fn lookup<'v>(template: &str, data: &'v Value, path: &FieldPath) -> Result<&'v Value, RenderError> {
    path.segments()
        .iter()
        .try_fold(data, |current, seg| match current {
            Value::Object(map) => Some(map.get(seg).unwrap_or(&NULL)),
            Value::Null => Some(&NULL),
            Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .ok_or_else(|| RenderError::MissingValue {
            template: template.to_string(),
            path: path.to_string(),
        })
}

fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(1), json!(-0.5), json!("x"), json!([0]), json!({"a": 0})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text(&json!(null)), "");
        assert_eq!(to_text(&json!("a<b")), "a<b");
        assert_eq!(to_text(&json!(3)), "3");
        assert_eq!(to_text(&json!([1, 2])), "[1,2]");
    }
}
