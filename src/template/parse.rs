//! Template source -> node tree.
//!
//! Actions are delimited by `{{` and `}}`:
//!
//! | Action                      | Meaning                               |
//! |-----------------------------|---------------------------------------|
//! | `{{ .a.b }}` / `{{ . }}`    | escaped value lookup                  |
//! | `{{ range .xs }}`           | iterate array / object values         |
//! | `{{ if .x }}`               | branch on truthiness                  |
//! | `{{ else }}` / `{{ end }}`  | close or split a block                |
//! | `{{ template "n" .ctx }}`   | invoke another template of the set    |
//! | `{{/* ... */}}`             | comment                               |

use std::fmt;

use thiserror::Error;

use super::exec::MAX_DEPTH;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const COMMENT_OPEN: &str = "/*";
const COMMENT_CLOSE: &str = "*/";

// =============================================================================
// Errors
// =============================================================================

/// Syntax error, with the 1-based line of the offending action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unclosed action")]
    UnclosedAction,
    #[error("unclosed comment")]
    UnclosedComment,
    #[error("empty action")]
    EmptyAction,
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("unexpected `{0}`")]
    Unexpected(&'static str),
    #[error("missing `end` for `{0}`")]
    UnclosedBlock(&'static str),
    #[error("malformed path `{0}`")]
    BadPath(String),
    #[error("malformed string literal `{0}`")]
    BadString(String),
    #[error("blocks nested too deeply")]
    TooDeep,
}

// =============================================================================
// Tree
// =============================================================================

/// Dotted field path; empty means the current context (`.`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_current(&self) -> bool {
        self.0.is_empty()
    }

    fn parse(raw: &str, line: usize) -> Result<Self, ParseError> {
        let bad = || ParseError::new(line, ParseErrorKind::BadPath(raw.to_string()));

        let rest = raw.strip_prefix('.').ok_or_else(bad)?;
        if rest.is_empty() {
            return Ok(Self::default());
        }

        let segments = rest
            .split('.')
            .map(|seg| {
                let valid = !seg.is_empty()
                    && seg
                        .chars()
                        .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
                valid.then(|| seg.to_string()).ok_or_else(bad)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(segments))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        for seg in &self.0 {
            write!(f, ".{seg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Value(FieldPath),
    Range {
        path: FieldPath,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    If {
        path: FieldPath,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Invoke {
        name: String,
        context: FieldPath,
    },
}

// =============================================================================
// Lexing
// =============================================================================

#[derive(Debug)]
enum Action {
    Comment,
    Value(FieldPath),
    Range(FieldPath),
    If(FieldPath),
    Else,
    End,
    Invoke { name: String, context: FieldPath },
}

#[derive(Debug)]
enum Token {
    Text(String),
    Action { line: usize, action: Action },
}

fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut line = 1;

    while let Some(start) = rest.find(OPEN) {
        let (text, tail) = rest.split_at(start);
        if !text.is_empty() {
            tokens.push(Token::Text(text.to_string()));
        }
        line += text.matches('\n').count();
        let tail = &tail[OPEN.len()..];

        // comments may contain `}}`, so they close on `*/}}`
        if let Some(comment) = tail.trim_start().strip_prefix(COMMENT_OPEN) {
            let end = comment
                .find(COMMENT_CLOSE)
                .ok_or(ParseError::new(line, ParseErrorKind::UnclosedComment))?;
            let after = comment[end + COMMENT_CLOSE.len()..].trim_start();
            let after = after
                .strip_prefix(CLOSE)
                .ok_or(ParseError::new(line, ParseErrorKind::UnclosedComment))?;

            line += tail[..tail.len() - after.len()].matches('\n').count();
            tokens.push(Token::Action {
                line,
                action: Action::Comment,
            });
            rest = after;
            continue;
        }

        let end = tail
            .find(CLOSE)
            .ok_or(ParseError::new(line, ParseErrorKind::UnclosedAction))?;
        let body = &tail[..end];
        tokens.push(Token::Action {
            line,
            action: parse_action(body.trim(), line)?,
        });
        line += body.matches('\n').count();
        rest = &tail[end + CLOSE.len()..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest.to_string()));
    }
    Ok(tokens)
}

fn parse_action(body: &str, line: usize) -> Result<Action, ParseError> {
    if body.is_empty() {
        return Err(ParseError::new(line, ParseErrorKind::EmptyAction));
    }
    if body.starts_with('.') {
        return FieldPath::parse(body, line).map(Action::Value);
    }

    let (keyword, args) = body
        .split_once(char::is_whitespace)
        .map(|(k, a)| (k, a.trim()))
        .unwrap_or((body, ""));

    match keyword {
        "range" => FieldPath::parse(args, line).map(Action::Range),
        "if" => FieldPath::parse(args, line).map(Action::If),
        "else" if args.is_empty() => Ok(Action::Else),
        "end" if args.is_empty() => Ok(Action::End),
        "template" => parse_invoke(args, line),
        _ => Err(ParseError::new(
            line,
            ParseErrorKind::UnknownAction(body.to_string()),
        )),
    }
}

/// `"name"` or `"name" .ctx`; the context defaults to `.`.
fn parse_invoke(args: &str, line: usize) -> Result<Action, ParseError> {
    let bad = || ParseError::new(line, ParseErrorKind::BadString(args.to_string()));

    let quoted = args.strip_prefix('"').ok_or_else(bad)?;
    let end = quoted.find('"').ok_or_else(bad)?;
    let name = &quoted[..end];
    if name.is_empty() {
        return Err(bad());
    }

    let ctx = quoted[end + 1..].trim();
    let context = if ctx.is_empty() {
        FieldPath::default()
    } else {
        FieldPath::parse(ctx, line)?
    };

    Ok(Action::Invoke {
        name: name.to_string(),
        context,
    })
}

// =============================================================================
// Parsing
// =============================================================================

/// Why a node list stopped.
enum Stop {
    Eof,
    Else(usize),
    End(usize),
}

struct Parser {
    tokens: std::vec::IntoIter<Token>,
}

impl Parser {
    /// Nodes at block nesting `depth` (0 for the top level).
    fn nodes(&mut self, depth: usize) -> Result<(Vec<Node>, Stop), ParseError> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.next() {
            let (line, action) = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Token::Action { line, action } => (line, action),
            };

            match action {
                Action::Comment => {}
                Action::Value(path) => nodes.push(Node::Value(path)),
                Action::Else => return Ok((nodes, Stop::Else(line))),
                Action::End => return Ok((nodes, Stop::End(line))),
                Action::Range(path) => {
                    let (body, otherwise) = self.block(line, "range", depth + 1)?;
                    nodes.push(Node::Range {
                        path,
                        body,
                        otherwise,
                    });
                }
                Action::If(path) => {
                    let (then, otherwise) = self.block(line, "if", depth + 1)?;
                    nodes.push(Node::If {
                        path,
                        then,
                        otherwise,
                    });
                }
                Action::Invoke { name, context } => nodes.push(Node::Invoke { name, context }),
            }
        }

        Ok((nodes, Stop::Eof))
    }

    /// Body up to `end`, with an optional `else` branch.
    ///
    /// Nesting is capped at the executor's depth limit, so every parsed
    /// template can render and deep input cannot exhaust the stack.
    fn block(
        &mut self,
        line: usize,
        keyword: &'static str,
        depth: usize,
    ) -> Result<(Vec<Node>, Vec<Node>), ParseError> {
        if depth > MAX_DEPTH {
            return Err(ParseError::new(line, ParseErrorKind::TooDeep));
        }
        let unclosed = ParseError::new(line, ParseErrorKind::UnclosedBlock(keyword));

        let (body, stop) = self.nodes(depth)?;
        match stop {
            Stop::End(_) => Ok((body, Vec::new())),
            Stop::Eof => Err(unclosed),
            Stop::Else(_) => match self.nodes(depth)? {
                (otherwise, Stop::End(_)) => Ok((body, otherwise)),
                (_, Stop::Else(at)) => Err(ParseError::new(at, ParseErrorKind::Unexpected("else"))),
                (_, Stop::Eof) => Err(unclosed),
            },
        }
    }
}

/// Parse a whole template source.
pub fn parse(source: &str) -> Result<Vec<Node>, ParseError> {
    let mut parser = Parser {
        tokens: lex(source)?.into_iter(),
    };

    match parser.nodes(0)? {
        (nodes, Stop::Eof) => Ok(nodes),
        (_, Stop::Else(line)) => Err(ParseError::new(line, ParseErrorKind::Unexpected("else"))),
        (_, Stop::End(line)) => Err(ParseError::new(line, ParseErrorKind::Unexpected("end"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw, 1).unwrap()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            parse("<p>hello</p>").unwrap(),
            vec![Node::Text("<p>hello</p>".into())]
        );
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_value_and_current() {
        let nodes = parse("a{{ .user.name }}b{{.}}").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("a".into()),
                Node::Value(path(".user.name")),
                Node::Text("b".into()),
                Node::Value(FieldPath::default()),
            ]
        );
    }

    #[test]
    fn test_blocks_with_else() {
        let nodes = parse("{{ range .xs }}{{ . }}{{ else }}none{{ end }}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::Range {
                path: path(".xs"),
                body: vec![Node::Value(FieldPath::default())],
                otherwise: vec![Node::Text("none".into())],
            }]
        );

        let nodes = parse("{{ if .ok }}yes{{ end }}").unwrap();
        assert!(matches!(&nodes[0], Node::If { otherwise, .. } if otherwise.is_empty()));
    }

    #[test]
    fn test_invoke() {
        let nodes = parse(r#"{{ template "nav.html" .menu }}{{ template "foot.html" }}"#).unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Invoke {
                    name: "nav.html".into(),
                    context: path(".menu"),
                },
                Node::Invoke {
                    name: "foot.html".into(),
                    context: FieldPath::default(),
                },
            ]
        );
    }

    #[test]
    fn test_comment_is_dropped() {
        let nodes = parse("a{{/* {{ not parsed }} */}}b{{ /* spaced */ }}").unwrap();
        assert_eq!(nodes, vec![Node::Text("a".into()), Node::Text("b".into())]);
    }

    #[test]
    fn test_error_lines() {
        let err = parse("line1\nline2\n{{ .a ").unwrap_err();
        assert_eq!(err, ParseError::new(3, ParseErrorKind::UnclosedAction));

        let err = parse("{{ if .a }}\n\n{{ end }}\n{{ end }}").unwrap_err();
        assert_eq!(err, ParseError::new(4, ParseErrorKind::Unexpected("end")));
    }

    #[test]
    fn test_structural_errors() {
        let kind = |src: &str| parse(src).unwrap_err().kind;

        assert_eq!(kind("{{ }}"), ParseErrorKind::EmptyAction);
        assert_eq!(kind("{{ else }}"), ParseErrorKind::Unexpected("else"));
        assert_eq!(kind("{{ range .x }}"), ParseErrorKind::UnclosedBlock("range"));
        assert_eq!(
            kind("{{ if .x }}{{ else }}{{ else }}{{ end }}"),
            ParseErrorKind::Unexpected("else")
        );
        assert_eq!(kind("{{/* open"), ParseErrorKind::UnclosedComment);
        assert!(matches!(kind("{{ block x }}"), ParseErrorKind::UnknownAction(_)));
        assert!(matches!(kind("{{ .a..b }}"), ParseErrorKind::BadPath(_)));
        assert!(matches!(kind("{{ range xs }}"), ParseErrorKind::BadPath(_)));
        assert!(matches!(kind(r#"{{ template "x }}"#), ParseErrorKind::BadString(_)));
    }

    fn nested(depth: usize) -> String {
        format!("{}x{}", "{{ if . }}\n".repeat(depth), "{{ end }}".repeat(depth))
    }

    #[test]
    fn test_nesting_limit() {
        assert!(parse(&nested(MAX_DEPTH)).is_ok());

        let err = parse(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(err, ParseError::new(MAX_DEPTH + 1, ParseErrorKind::TooDeep));
    }

    #[test]
    fn test_deep_nesting_fails_on_small_stack() {
        // same stack size as tokio's blocking pool
        let result = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| parse(&nested(5000)).map(|_| ()))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(result.unwrap_err().kind, ParseErrorKind::TooDeep);
    }

    #[test]
    fn test_field_path_display() {
        assert_eq!(path(".").to_string(), ".");
        assert_eq!(path(".a.b").to_string(), ".a.b");
    }
}
