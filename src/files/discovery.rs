//! Path pattern expansion
//!
//! Expands shell-style patterns into the files they name. Supported syntax:
//! - `*` any run of characters within one path component
//! - `?` a single character
//! - `[abc]`, `[a-z]`, `[!abc]` character classes
//! - `**` as a whole component, zero or more directories
//!
//! Entries whose name starts with `.` only match a component that starts with
//! a literal `.` as well; `*` and `**` never pick them up.

use crate::core::error::{PruneError, PruneResult};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// One `/`-separated component of a pattern
#[derive(Debug)]
enum Segment {
    /// Literal name, no wildcards
    Literal(String),
    /// `**`
    Recursive,
    /// Component with wildcards, compiled to an anchored regex
    Wildcard { regex: Regex, leading_dot: bool },
}

impl Segment {
    fn parse(component: &str) -> PruneResult<Self> {
        if component == "**" {
            return Ok(Segment::Recursive);
        }
        if !component.contains(['*', '?', '[']) {
            return Ok(Segment::Literal(component.to_string()));
        }
        let regex = Regex::new(&translate(component)).map_err(|e| {
            PruneError::Configuration(format!("Invalid path pattern '{}': {}", component, e))
        })?;
        Ok(Segment::Wildcard {
            regex,
            leading_dot: component.starts_with('.'),
        })
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Segment::Literal(literal) => literal == name,
            Segment::Recursive => false,
            Segment::Wildcard { regex, leading_dot } => {
                (*leading_dot || !name.starts_with('.')) && regex.is_match(name)
            }
        }
    }
}

/// Translate one glob component into an anchored regex
fn translate(component: &str) -> String {
    let mut out = String::from("^");
    let mut chars = component.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                // A `]` right after the opening bracket is literal
                if chars.peek() == Some(&']') {
                    chars.next();
                    class.push_str("\\]");
                }
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    match c {
                        '\\' | '[' | '&' | '~' | '^' => {
                            class.push('\\');
                            class.push(c);
                        }
                        _ => class.push(c),
                    }
                }
                if closed {
                    out.push('[');
                    out.push_str(&class);
                    out.push(']');
                } else {
                    // Unclosed bracket matches itself
                    out.push_str("\\[");
                    out.push_str(&regex::escape(&class));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

/// Split a pattern into the directory to walk and the segments below it
fn split_pattern(base: &Path, pattern: &str) -> PruneResult<(PathBuf, Vec<Segment>)> {
    let pattern_path = Path::new(pattern);
    let mut root = if pattern_path.is_absolute() {
        PathBuf::new()
    } else {
        base.to_path_buf()
    };

    let mut segments = Vec::new();
    for component in pattern_path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => root.push(component.as_os_str()),
            Component::CurDir => {}
            other => {
                let text = other.as_os_str().to_string_lossy();
                let segment = Segment::parse(&text)?;
                match segment {
                    Segment::Literal(name) if segments.is_empty() => root.push(name),
                    segment => segments.push(segment),
                }
            }
        }
    }
    Ok((root, segments))
}

/// Whether `names` (components below the walk root) match `segments`
fn matches_segments(segments: &[Segment], names: &[String]) -> bool {
    match segments.split_first() {
        None => names.is_empty(),
        Some((Segment::Recursive, rest)) => {
            // `**` consumes zero or more visible directories
            (0..=names.len()).any(|skip| {
                names[..skip].iter().all(|name| !name.starts_with('.'))
                    && matches_segments(rest, &names[skip..])
            })
        }
        Some((segment, rest)) => match names.split_first() {
            Some((name, tail)) => segment.matches(name) && matches_segments(rest, tail),
            None => false,
        },
    }
}

/// Expand `pattern` relative to `base` into matching regular files, sorted
///
/// A pattern that matches nothing yields an empty list.
pub fn discover(base: &Path, pattern: &str) -> PruneResult<Vec<PathBuf>> {
    let (root, segments) = split_pattern(base, pattern)?;

    if segments.is_empty() {
        return Ok(if root.is_file() { vec![root] } else { Vec::new() });
    }
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let max_depth = if segments.iter().any(|s| matches!(s, Segment::Recursive)) {
        usize::MAX
    } else {
        segments.len()
    };

    let mut found = Vec::new();
    for entry in WalkDir::new(&root).min_depth(1).max_depth(max_depth) {
        let entry = entry.map_err(|e| {
            PruneError::Io(std::io::Error::other(format!(
                "Cannot scan {}: {}",
                root.display(),
                e
            )))
        })?;
        // follows symlinks, so linked files are found too
        if !entry.path().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&root) else {
            continue;
        };
        let names: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if matches_segments(&segments, &names) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    log::debug!("Pattern '{}' matched {} files", pattern, found.len());
    Ok(found)
}
