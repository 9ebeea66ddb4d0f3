//! Path pattern compilation and matching.
//!
//! A pattern is a `/`-separated list of segments. Each segment is one of:
//!
//! - a literal (`user`, `metadata`), matched case-sensitively;
//! - a placeholder `:name`, matching any non-empty segment;
//! - a constrained placeholder `:name(a|b|c)`, matching only the listed values.
//!
//! Leading and trailing slashes are ignored on both the pattern and the
//! request path, and a match requires equal segment counts.
//!
//! Request paths are matched in their raw, percent-encoded form. Only the
//! values captured by placeholders are decoded, so an encoded `/` (`%2F`)
//! stays inside its segment.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Errors raised while compiling a pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("placeholder in pattern {pattern:?} has no name")]
    UnnamedPlaceholder { pattern: String },

    #[error("placeholder {name:?} in pattern {pattern:?} has an unclosed or empty constraint")]
    BadConstraint { pattern: String, name: String },

    #[error("placeholder {name:?} appears twice in pattern {pattern:?}")]
    DuplicatePlaceholder { pattern: String, name: String },

    #[error("pattern {pattern:?} contains an empty segment")]
    EmptySegment { pattern: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param {
        name: String,
        allowed: Option<Vec<String>>,
    },
}

impl Segment {
    fn parse(raw: &str, pattern: &str) -> Result<Self, PatternError> {
        let Some(placeholder) = raw.strip_prefix(':') else {
            return Ok(Self::Literal(raw.to_string()));
        };

        let (name, allowed) = match placeholder.find('(') {
            None => (placeholder, None),
            Some(open) => {
                let name = &placeholder[..open];
                let inner = placeholder[open + 1..].strip_suffix(')').ok_or_else(|| {
                    PatternError::BadConstraint {
                        pattern: pattern.to_string(),
                        name: name.to_string(),
                    }
                })?;
                let values: Vec<String> = inner.split('|').map(str::to_string).collect();
                if values.iter().any(String::is_empty) {
                    return Err(PatternError::BadConstraint {
                        pattern: pattern.to_string(),
                        name: name.to_string(),
                    });
                }
                (name, Some(values))
            }
        };

        if name.is_empty() {
            return Err(PatternError::UnnamedPlaceholder {
                pattern: pattern.to_string(),
            });
        }

        Ok(Self::Param {
            name: name.to_string(),
            allowed,
        })
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Literal(lit) => lit == value,
            Self::Param { allowed, .. } => {
                !value.is_empty()
                    && allowed
                        .as_ref()
                        .map_or(true, |values| values.iter().any(|v| v == value))
            }
        }
    }
}

/// A compiled route path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile `pattern`.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let trimmed = pattern.trim_matches('/');
        let mut segments = Vec::new();
        if !trimmed.is_empty() {
            for raw in trimmed.split('/') {
                if raw.is_empty() {
                    return Err(PatternError::EmptySegment {
                        pattern: pattern.to_string(),
                    });
                }
                segments.push(Segment::parse(raw, pattern)?);
            }
        }

        let mut seen = Vec::new();
        for segment in &segments {
            if let Segment::Param { name, .. } = segment {
                if seen.contains(&name) {
                    return Err(PatternError::DuplicatePlaceholder {
                        pattern: pattern.to_string(),
                        name: name.clone(),
                    });
                }
                seen.push(name);
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match the raw request `path`, returning the decoded placeholder
    /// values on success.
    ///
    /// A captured value that does not decode to UTF-8 fails the match.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let trimmed = path.trim_matches('/');
        let parts: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            if !segment.accepts(part) {
                return None;
            }
            if let Segment::Param { name, .. } = segment {
                let value = percent_decode_str(part).decode_utf8().ok()?;
                params.insert(name.clone(), value.into_owned());
            }
        }
        Some(params)
    }

    /// Placeholder names in order, each with its allowed values if constrained.
    pub fn placeholders(&self) -> impl Iterator<Item = (&str, Option<&[String]>)> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Literal(_) => None,
            Segment::Param { name, allowed } => Some((name.as_str(), allowed.as_deref())),
        })
    }

    /// Render the pattern in OpenAPI template form (`user/{id}`).
    pub fn openapi_path(&self) -> String {
        let rendered: Vec<String> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Literal(lit) => lit.clone(),
                Segment::Param { name, .. } => format!("{{{name}}}"),
            })
            .collect();
        rendered.join("/")
    }
}
