//! XPath function table
//!
//! Functions are registered statically: the XPath 1.0 core library plus the
//! EXSLT regular expression functions (`re:match`, `re:test`, `re:replace`).
//! Names are resolved when an expression is compiled.

use crate::core::error::{PruneError, PruneResult};
use crate::core::namespace::ns;
use crate::core::xpath::ast::{Call, Expr};
use crate::core::xpath::eval::{Context, Evaluator, Value, XNode};
use regex::{Regex, RegexBuilder};

/// A function callable from an XPath expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Last,
    Position,
    Count,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
    RegexMatch,
    RegexTest,
    RegexReplace,
}

/// Core functions, called without a prefix
const CORE_FUNCTIONS: &[(&str, Function)] = &[
    ("last", Function::Last),
    ("position", Function::Position),
    ("count", Function::Count),
    ("local-name", Function::LocalName),
    ("namespace-uri", Function::NamespaceUri),
    ("name", Function::Name),
    ("string", Function::String),
    ("concat", Function::Concat),
    ("starts-with", Function::StartsWith),
    ("contains", Function::Contains),
    ("substring-before", Function::SubstringBefore),
    ("substring-after", Function::SubstringAfter),
    ("substring", Function::Substring),
    ("string-length", Function::StringLength),
    ("normalize-space", Function::NormalizeSpace),
    ("translate", Function::Translate),
    ("boolean", Function::Boolean),
    ("not", Function::Not),
    ("true", Function::True),
    ("false", Function::False),
    ("number", Function::Number),
    ("sum", Function::Sum),
    ("floor", Function::Floor),
    ("ceiling", Function::Ceiling),
    ("round", Function::Round),
];

/// EXSLT regular expression functions
const REGEXP_FUNCTIONS: &[(&str, Function)] = &[
    ("match", Function::RegexMatch),
    ("test", Function::RegexTest),
    ("replace", Function::RegexReplace),
];

impl Function {
    /// Resolve a function by namespace URI and local name
    pub fn lookup(namespace: Option<&str>, local: &str) -> Option<Self> {
        let table = match namespace {
            None => CORE_FUNCTIONS,
            Some(ns::EXSLT_REGEXP) => REGEXP_FUNCTIONS,
            Some(_) => return None,
        };
        table
            .iter()
            .find(|(name, _)| *name == local)
            .map(|(_, function)| *function)
    }

    /// Name as written in expressions
    pub fn name(self) -> &'static str {
        CORE_FUNCTIONS
            .iter()
            .chain(REGEXP_FUNCTIONS)
            .find(|(_, function)| *function == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }

    /// Minimum and maximum argument count; `None` is unbounded
    pub fn arity(self) -> (usize, Option<usize>) {
        use Function::*;
        match self {
            Last | Position | True | False => (0, Some(0)),
            LocalName | NamespaceUri | Name | String | StringLength | NormalizeSpace
            | Number => (0, Some(1)),
            Count | Boolean | Not | Sum | Floor | Ceiling | Round => (1, Some(1)),
            StartsWith | Contains | SubstringBefore | SubstringAfter => (2, Some(2)),
            Substring => (2, Some(3)),
            Translate => (3, Some(3)),
            Concat => (2, None),
            RegexMatch | RegexTest => (2, Some(3)),
            RegexReplace => (4, Some(4)),
        }
    }

    /// Whether the second argument is a regular expression pattern
    pub fn takes_pattern(self) -> bool {
        matches!(
            self,
            Function::RegexMatch | Function::RegexTest | Function::RegexReplace
        )
    }
}

/// Build a regular expression from an EXSLT pattern and flags
///
/// Flag `i` makes the match case-insensitive; `g` is handled by the caller.
pub fn build_regex(pattern: &str, flags: &str) -> PruneResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .build()
        .map_err(|e| PruneError::Query(format!("Invalid regular expression '{}': {}", pattern, e)))
}

impl<'d> Evaluator<'d> {
    /// Evaluate a function call
    pub(crate) fn call(&self, call: &Call, ctx: &Context) -> PruneResult<Value> {
        use Function::*;

        let args = &call.args;
        let value = match call.function {
            Last => Value::Number(ctx.size as f64),
            Position => Value::Number(ctx.position as f64),
            Count => {
                let count = match self.eval(&args[0], ctx)? {
                    Value::Nodes(nodes) => nodes.len(),
                    Value::Matches(items) => items.len(),
                    other => {
                        return Err(PruneError::Query(format!(
                            "Expected a node-set for count, got {:?}",
                            other
                        )))
                    }
                };
                Value::Number(count as f64)
            }
            LocalName | NamespaceUri | Name => {
                let node = match args.first() {
                    Some(arg) => self.node_set(arg, ctx, call.function.name())?.first().copied(),
                    None => Some(ctx.node),
                };
                let (prefix, local, namespace) =
                    node.map(|n| self.name_parts(n)).unwrap_or_default();
                Value::String(match call.function {
                    LocalName => local,
                    NamespaceUri => namespace,
                    _ => match prefix {
                        Some(prefix) => format!("{}:{}", prefix, local),
                        None => local,
                    },
                })
            }
            String => Value::String(self.string_arg(args.first(), ctx)?),
            Concat => {
                let mut result = std::string::String::new();
                for arg in args {
                    result.push_str(&self.string_of(arg, ctx)?);
                }
                Value::String(result)
            }
            StartsWith => {
                let (s, prefix) = self.two_strings(args, ctx)?;
                Value::Boolean(s.starts_with(&prefix))
            }
            Contains => {
                let (s, needle) = self.two_strings(args, ctx)?;
                Value::Boolean(s.contains(&needle))
            }
            SubstringBefore => {
                let (s, needle) = self.two_strings(args, ctx)?;
                Value::String(s.find(&needle).map(|i| s[..i].to_string()).unwrap_or_default())
            }
            SubstringAfter => {
                let (s, needle) = self.two_strings(args, ctx)?;
                Value::String(
                    s.find(&needle)
                        .map(|i| s[i + needle.len()..].to_string())
                        .unwrap_or_default(),
                )
            }
            Substring => {
                let s = self.string_of(&args[0], ctx)?;
                let start = round(self.number_of(&args[1], ctx)?);
                let end = match args.get(2) {
                    Some(len) => start + round(self.number_of(len, ctx)?),
                    None => f64::INFINITY,
                };
                Value::String(
                    s.chars()
                        .enumerate()
                        .filter(|(i, _)| {
                            let position = (*i + 1) as f64;
                            position >= start && position < end
                        })
                        .map(|(_, c)| c)
                        .collect(),
                )
            }
            StringLength => {
                Value::Number(self.string_arg(args.first(), ctx)?.chars().count() as f64)
            }
            NormalizeSpace => Value::String(
                self.string_arg(args.first(), ctx)?
                    .split_ascii_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Translate => {
                let s = self.string_of(&args[0], ctx)?;
                let from: Vec<char> = self.string_of(&args[1], ctx)?.chars().collect();
                let to: Vec<char> = self.string_of(&args[2], ctx)?.chars().collect();
                Value::String(
                    s.chars()
                        .filter_map(|c| match from.iter().position(|f| *f == c) {
                            Some(i) => to.get(i).copied(),
                            None => Some(c),
                        })
                        .collect(),
                )
            }
            Boolean => Value::Boolean(self.eval(&args[0], ctx)?.to_boolean()),
            Not => Value::Boolean(!self.eval(&args[0], ctx)?.to_boolean()),
            True => Value::Boolean(true),
            False => Value::Boolean(false),
            Number => {
                let value = match args.first() {
                    Some(arg) => self.eval(arg, ctx)?,
                    None => Value::Nodes(vec![ctx.node]),
                };
                Value::Number(self.to_number(&value))
            }
            Sum => Value::Number(
                self.node_set(&args[0], ctx, "sum")?
                    .iter()
                    .map(|n| parse_number(&self.string_value(*n)))
                    .sum(),
            ),
            Floor => Value::Number(self.number_of(&args[0], ctx)?.floor()),
            Ceiling => Value::Number(self.number_of(&args[0], ctx)?.ceil()),
            Round => Value::Number(round(self.number_of(&args[0], ctx)?)),
            RegexMatch => {
                let s = self.string_of(&args[0], ctx)?;
                let flags = self.flags(args.get(2), ctx)?;
                let regex = self.regex(call, ctx, &flags)?;
                let matches = if flags.contains('g') && regex.captures_len() > 1 {
                    // with groups, each match contributes its first group
                    regex
                        .captures_iter(&s)
                        .map(|caps| group_text(caps.get(1)))
                        .collect()
                } else if flags.contains('g') {
                    regex.find_iter(&s).map(|m| m.as_str().to_string()).collect()
                } else {
                    regex
                        .captures(&s)
                        .map(|caps| caps.iter().map(group_text).collect())
                        .unwrap_or_default()
                };
                Value::Matches(matches)
            }
            RegexTest => {
                let s = self.string_of(&args[0], ctx)?;
                let flags = self.flags(args.get(2), ctx)?;
                Value::Boolean(self.regex(call, ctx, &flags)?.is_match(&s))
            }
            RegexReplace => {
                let s = self.string_of(&args[0], ctx)?;
                let flags = self.flags(args.get(2), ctx)?;
                let replacement = self.string_of(&args[3], ctx)?;
                let regex = self.regex(call, ctx, &flags)?;
                let replaced = if flags.contains('g') {
                    regex.replace_all(&s, replacement.as_str())
                } else {
                    regex.replace(&s, replacement.as_str())
                };
                Value::String(replaced.into_owned())
            }
        };
        Ok(value)
    }

    fn string_arg(&self, arg: Option<&Expr>, ctx: &Context) -> PruneResult<String> {
        match arg {
            Some(arg) => self.string_of(arg, ctx),
            None => Ok(self.string_value(ctx.node)),
        }
    }

    fn two_strings(&self, args: &[Expr], ctx: &Context) -> PruneResult<(String, String)> {
        Ok((self.string_of(&args[0], ctx)?, self.string_of(&args[1], ctx)?))
    }

    fn flags(&self, arg: Option<&Expr>, ctx: &Context) -> PruneResult<String> {
        match arg {
            Some(arg) => self.string_of(arg, ctx),
            None => Ok(String::new()),
        }
    }

    fn regex(&self, call: &Call, ctx: &Context, flags: &str) -> PruneResult<Regex> {
        if let Some(regex) = &call.regex {
            return Ok(regex.clone());
        }
        let pattern = self.string_of(&call.args[1], ctx)?;
        build_regex(&pattern, flags)
    }

    /// Prefix, local name and namespace URI of a node, empty where it has none
    fn name_parts(&self, node: XNode) -> (Option<String>, String, String) {
        match node {
            XNode::Node(id) => match self.doc.element(id) {
                Some(element) => (
                    element.name.prefix.clone(),
                    element.name.local.clone(),
                    element.name.namespace.clone().unwrap_or_default(),
                ),
                None => Default::default(),
            },
            XNode::Attribute(id, index) => self
                .doc
                .element(id)
                .and_then(|element| element.attributes.get(index))
                .map(|attr| {
                    let prefix = attr.name.split_once(':').map(|(p, _)| p.to_string());
                    (prefix, attr.local.clone(), attr.namespace.clone().unwrap_or_default())
                })
                .unwrap_or_default(),
            XNode::Root | XNode::Text(..) => Default::default(),
        }
    }
}

/// XPath `round`: halves round towards positive infinity
fn group_text(group: Option<regex::Match<'_>>) -> String {
    group.map(|m| m.as_str().to_string()).unwrap_or_default()
}

pub(crate) fn round(value: f64) -> f64 {
    if value.is_nan() || value.is_infinite() {
        value
    } else {
        (value + 0.5).floor()
    }
}

/// XPath string to number conversion; anything malformed is NaN
pub(crate) fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim_matches([' ', '\t', '\r', '\n']);
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let valid = !digits.is_empty()
        && digits != "."
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if valid {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}
