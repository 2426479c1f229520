//! Text templates for markdown blocks
//!
//! Supported actions:
//!
//! - `{{.Field}}` prints a field of the current scope, `{{.}}` the scope itself
//! - `{{range .Metrics}} ... {{else}} ... {{end}}` iterates the metrics
//! - `{{if .Field}} ... {{else if .Other}} ... {{else}} ... {{end}}`, optionally
//!   `{{if not .Field}}`
//! - `{{/* comment */}}`
//! - `{{-` and `-}}` trim whitespace around the action
//!
//! The root scope exposes `.Metrics`; inside `range` the scope is a metric
//! with `Name`, `DisplayName`, `Query`, `Threshold`, `LastValue`, `Leverage`
//! and `ThresholdExceeded` (snake_case spellings work too).

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use super::resolver::Metric;

/// Parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Print(String),
    Range {
        field: String,
        body: Vec<Node>,
        empty: Vec<Node>,
    },
    If {
        field: String,
        negate: bool,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug)]
enum Token {
    Text(String),
    Action(String),
}

/// Condition of an `if` or `else if`: (negate, field)
type Condition = (bool, String);

#[derive(Debug, PartialEq)]
enum Stop {
    Else(Option<Condition>),
    End,
}

/// Data visible to an action
#[derive(Clone, Copy)]
enum Scope<'a> {
    Root(&'a [Metric]),
    Metric(&'a Metric),
}

enum Resolved<'a> {
    Text(Cow<'a, str>),
    Bool(bool),
    List(&'a [Metric]),
}

impl Resolved<'_> {
    fn truthy(&self) -> bool {
        match self {
            Resolved::Text(s) => !s.is_empty(),
            Resolved::Bool(b) => *b,
            Resolved::List(l) => !l.is_empty(),
        }
    }
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };

        let (nodes, stop) = parser.parse_nodes()?;
        match stop {
            None => Ok(Self { nodes }),
            Some(Stop::Else(_)) => Err(TemplateError::Syntax("unexpected {{else}}".to_string())),
            Some(Stop::End) => Err(TemplateError::Syntax("unexpected {{end}}".to_string())),
        }
    }

    /// Render against an ordered sequence of metrics
    pub fn render(&self, metrics: &[Metric]) -> Result<String, TemplateError> {
        let mut out = String::new();
        render_nodes(&self.nodes, Scope::Root(metrics), &mut out)?;
        Ok(out)
    }
}

/// Parse and render in one go
pub fn render(source: &str, metrics: &[Metric]) -> Result<String, TemplateError> {
    Template::parse(source)?.render(metrics)
}

static ACTION_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn action_regex() -> Result<&'static Regex, TemplateError> {
    ACTION_RE
        .get_or_init(|| Regex::new(r"(?s)\{\{(-)?(.*?)(-)?\}\}"))
        .as_ref()
        .map_err(|e| TemplateError::Syntax(e.to_string()))
}

fn tokenize(source: &str) -> Result<Vec<Token>, TemplateError> {
    let re = action_regex()?;

    let mut tokens = Vec::new();
    let mut last = 0;
    let mut trim_next = false;

    for caps in re.captures_iter(source) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };

        let mut text = &source[last..whole.start()];
        if trim_next {
            text = text.trim_start();
        }
        if caps.get(1).is_some() {
            text = text.trim_end();
        }
        if !text.is_empty() {
            tokens.push(Token::Text(text.to_string()));
        }

        let action = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
        tokens.push(Token::Action(action.to_string()));

        trim_next = caps.get(3).is_some();
        last = whole.end();
    }

    let mut tail = &source[last..];
    if trim_next {
        tail = tail.trim_start();
    }
    if tail.contains("{{") {
        return Err(TemplateError::Unclosed("action".to_string()));
    }
    if !tail.is_empty() {
        tokens.push(Token::Text(tail.to_string()));
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    /// Parse until `{{else}}`, `{{end}}` or end of input
    fn parse_nodes(&mut self) -> Result<(Vec<Node>, Option<Stop>), TemplateError> {
        let mut nodes = Vec::new();

        loop {
            let action = match self.next() {
                None => return Ok((nodes, None)),
                Some(Token::Text(text)) => {
                    nodes.push(Node::Text(text.clone()));
                    continue;
                }
                Some(Token::Action(action)) => action.clone(),
            };

            let mut words = action.split_whitespace();
            match words.next() {
                None => return Err(TemplateError::Syntax("empty action".to_string())),
                Some(w) if w.starts_with("/*") => {
                    if !action.ends_with("*/") {
                        return Err(TemplateError::Unclosed("comment".to_string()));
                    }
                }
                Some("end") => {
                    if let Some(extra) = words.next() {
                        return Err(TemplateError::Syntax(format!("unexpected '{}' after end", extra)));
                    }
                    return Ok((nodes, Some(Stop::End)));
                }
                Some("else") => {
                    let stop = match words.next() {
                        None => Stop::Else(None),
                        Some("if") => Stop::Else(Some(condition(&mut words, "else if")?)),
                        Some(extra) => {
                            return Err(TemplateError::Syntax(format!("unexpected '{}' after else", extra)))
                        }
                    };
                    return Ok((nodes, Some(stop)));
                }
                Some("range") => {
                    let field = field_arg(&mut words, "range")?;
                    let (body, stop) = self.parse_nodes()?;
                    let empty = match stop {
                        Some(Stop::End) => Vec::new(),
                        Some(Stop::Else(None)) => self.parse_tail("range")?,
                        Some(Stop::Else(Some(_))) => {
                            return Err(TemplateError::Syntax("{{else if}} in range".to_string()))
                        }
                        None => return Err(TemplateError::Unclosed("range".to_string())),
                    };
                    nodes.push(Node::Range { field, body, empty });
                }
                Some("if") => {
                    let (negate, field) = condition(&mut words, "if")?;
                    let (then, stop) = self.parse_nodes()?;
                    let otherwise = self.parse_else_chain(stop)?;
                    nodes.push(Node::If {
                        field,
                        negate,
                        then,
                        otherwise,
                    });
                }
                Some(w) => {
                    if let Some(extra) = words.next() {
                        return Err(TemplateError::Syntax(format!("unexpected '{}' after {}", extra, w)));
                    }
                    nodes.push(Node::Print(parse_field(w)?));
                }
            }
        }
    }

    /// Parse an `{{else}}` branch, which must close with `{{end}}`
    fn parse_tail(&mut self, block: &str) -> Result<Vec<Node>, TemplateError> {
        match self.parse_nodes()? {
            (nodes, Some(Stop::End)) => Ok(nodes),
            (_, Some(Stop::Else(_))) => Err(TemplateError::Syntax(format!("second {{{{else}}}} in {}", block))),
            (_, None) => Err(TemplateError::Unclosed(block.to_string())),
        }
    }

    /// `{{else if}}` nests another `If` in the otherwise branch; the chain
    /// shares the single closing `{{end}}`
    fn parse_else_chain(&mut self, stop: Option<Stop>) -> Result<Vec<Node>, TemplateError> {
        match stop {
            Some(Stop::End) => Ok(Vec::new()),
            Some(Stop::Else(None)) => self.parse_tail("if"),
            Some(Stop::Else(Some((negate, field)))) => {
                let (then, stop) = self.parse_nodes()?;
                let otherwise = self.parse_else_chain(stop)?;
                Ok(vec![Node::If {
                    field,
                    negate,
                    then,
                    otherwise,
                }])
            }
            None => Err(TemplateError::Unclosed("if".to_string())),
        }
    }
}

fn condition<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    action: &str,
) -> Result<Condition, TemplateError> {
    match words.next() {
        Some("not") => Ok((true, field_arg(words, action)?)),
        Some(w) => {
            let field = parse_field(w)?;
            if let Some(extra) = words.next() {
                return Err(TemplateError::Syntax(format!("unexpected '{}' in {}", extra, action)));
            }
            Ok((false, field))
        }
        None => Err(TemplateError::Syntax(format!("missing condition for {}", action))),
    }
}

fn field_arg<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    action: &str,
) -> Result<String, TemplateError> {
    let field = words
        .next()
        .ok_or_else(|| TemplateError::Syntax(format!("missing field for {}", action)))
        .and_then(parse_field)?;
    if let Some(extra) = words.next() {
        return Err(TemplateError::Syntax(format!("unexpected '{}' in {}", extra, action)));
    }
    Ok(field)
}

/// `.Name` -> `Name`, `.` -> ``
fn parse_field(word: &str) -> Result<String, TemplateError> {
    let field = word
        .strip_prefix('.')
        .ok_or_else(|| TemplateError::Syntax(format!("expected a field, got '{}'", word)))?;
    if field.contains('.') {
        return Err(TemplateError::Syntax(format!("nested fields are not supported: '{}'", word)));
    }
    Ok(field.to_string())
}

fn lookup<'a>(scope: Scope<'a>, field: &str) -> Result<Resolved<'a>, TemplateError> {
    match scope {
        Scope::Root(metrics) => match field {
            "" | "Metrics" | "metrics" => Ok(Resolved::List(metrics)),
            _ => Err(TemplateError::UnknownField(field.to_string())),
        },
        Scope::Metric(metric) => match field {
            "Name" | "name" => Ok(Resolved::Text(Cow::Borrowed(metric.name.as_str()))),
            "DisplayName" | "display_name" => Ok(Resolved::Text(Cow::Borrowed(metric.display_name.as_str()))),
            "Query" | "query" => Ok(Resolved::Text(Cow::Borrowed(metric.query.as_str()))),
            "Threshold" | "threshold" => Ok(Resolved::Text(Cow::Borrowed(metric.threshold.as_str()))),
            "LastValue" | "last_value" => Ok(Resolved::Text(Cow::Borrowed(metric.last_value.as_str()))),
            "Leverage" | "leverage" => Ok(Resolved::Bool(metric.leverage)),
            "ThresholdExceeded" | "threshold_exceeded" => Ok(Resolved::Bool(metric.threshold_exceeded)),
            "" => Ok(Resolved::Text(Cow::Owned(metric.name.clone()))),
            _ => Err(TemplateError::UnknownField(field.to_string())),
        },
    }
}

fn render_nodes(nodes: &[Node], scope: Scope<'_>, out: &mut String) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Print(field) => match lookup(scope, field)? {
                Resolved::Text(text) => out.push_str(&text),
                Resolved::Bool(b) => out.push_str(if b { "true" } else { "false" }),
                Resolved::List(_) => {
                    return Err(TemplateError::Type(format!("cannot print list '.{}'", field)))
                }
            },
            Node::Range { field, body, empty } => {
                let metrics = match lookup(scope, field)? {
                    Resolved::List(metrics) => metrics,
                    _ => return Err(TemplateError::Type(format!("cannot range over '.{}'", field))),
                };
                if metrics.is_empty() {
                    render_nodes(empty, scope, out)?;
                }
                for metric in metrics {
                    render_nodes(body, Scope::Metric(metric), out)?;
                }
            }
            Node::If {
                field,
                negate,
                then,
                otherwise,
            } => {
                let truthy = lookup(scope, field)?.truthy();
                if truthy != *negate {
                    render_nodes(then, scope, out)?;
                } else {
                    render_nodes(otherwise, scope, out)?;
                }
            }
        }
    }
    Ok(())
}

/// Template errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("Template syntax error: {0}")]
    Syntax(String),

    #[error("Unclosed {0} in template")]
    Unclosed(String),

    #[error("Unknown template field: .{0}")]
    UnknownField(String),

    #[error("Template type error: {0}")]
    Type(String),
}
