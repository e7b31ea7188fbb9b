//! Generic document tree shared by the YAML and JSON parsers.
//!
//! A parsed document is lowered into [`Node`], walked once with the value
//! transform, then raised back into the format's own value type. Keeping the
//! walk here means both formats skip metadata, track locations and apply the
//! encrypt/decrypt rules identically.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::core::constants::{MAX_NESTING_DEPTH, METADATA_KEY};
use crate::core::marker;
use crate::error::{Result, ValidationError};

/// Which way values are being transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// Transform applied to one scalar value.
pub type Transform<'a> = dyn FnMut(&str) -> Result<String> + 'a;

/// Leaf value of a format's tree.
pub trait Scalar: Sized {
    /// Text of a scalar that may carry a secret, `None` for values that are
    /// never transformed.
    fn text(&self) -> Option<Cow<'_, str>>;

    /// A string scalar holding `text`, keeping whatever decorates `self`
    /// (a YAML tag, for instance).
    fn with_text(&self, text: String) -> Self;

    /// Human-readable rendering used in error locations.
    fn label(&self) -> String;
}

/// Document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<S> {
    Scalar(S),
    Sequence(Vec<Node<S>>),
    /// Entries in document order. Keys are scalars so non-string keys
    /// survive untouched.
    Mapping(Vec<(S, Node<S>)>),
}

enum Segment {
    Key(String),
    Index(usize),
}

impl<S: Scalar> Node<S> {
    /// Transform every candidate scalar in place.
    ///
    /// Entries keyed by the metadata key are skipped at every level. The
    /// first failing value aborts the walk and is reported with its path.
    pub fn transform(&mut self, direction: Direction, f: &mut Transform<'_>) -> Result<()> {
        let mut path = Vec::new();
        self.walk(direction, f, &mut path)
    }

    fn walk(
        &mut self,
        direction: Direction,
        f: &mut Transform<'_>,
        path: &mut Vec<Segment>,
    ) -> Result<()> {
        match self {
            Node::Scalar(scalar) => {
                let replaced = match scalar.text() {
                    Some(text) => apply(&text, direction, f).map_err(|e| e.at(location(path)))?,
                    None => None,
                };
                if let Some(text) = replaced {
                    *scalar = scalar.with_text(text);
                }
            }
            Node::Sequence(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    path.push(Segment::Index(i));
                    item.walk(direction, f, path)?;
                    path.pop();
                }
            }
            Node::Mapping(entries) => {
                for (key, value) in entries.iter_mut() {
                    if key.text().as_deref() == Some(METADATA_KEY) {
                        continue;
                    }
                    path.push(Segment::Key(key.label()));
                    value.walk(direction, f, path)?;
                    path.pop();
                }
            }
        }

        Ok(())
    }
}

/// Apply the encrypt/decrypt rules to one scalar.
///
/// Returns `None` when the value passes through unchanged: empty or already
/// marked values when encrypting, anything that is not a marker when
/// decrypting.
pub fn apply(value: &str, direction: Direction, f: &mut Transform<'_>) -> Result<Option<String>> {
    match direction {
        Direction::Encrypt if !value.is_empty() && !marker::is_marker(value) => f(value).map(Some),
        Direction::Decrypt if marker::is_marker(value) => f(value).map(Some),
        _ => Ok(None),
    }
}

/// Fail if a node at `depth` (root is 0) is nested too deeply.
pub fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ValidationError::DepthExceeded {
            limit: MAX_NESTING_DEPTH,
        }
        .into());
    }
    Ok(())
}

fn location(path: &[Segment]) -> String {
    if path.is_empty() {
        return "(root)".to_string();
    }

    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(i) => {
                let _ = write!(out, "[{}]", i);
            }
        }
    }
    out
}
