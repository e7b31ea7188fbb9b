//! YAML parser.
//!
//! Documents are loaded with `serde_yaml` and lowered into a [`Node`] tree
//! for the walk. Changed scalars are then written back into the original
//! text (see [`layout`]) so comments, quoting and spacing survive. Layouts
//! the rewriter does not understand are re-emitted from the tree, which
//! keeps key order but not comments.
//!
//! Numbers, booleans and tagged scalars are candidates like strings are.
//! Null never is.

mod layout;

use std::borrow::Cow;

use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use tracing::{trace, warn};

use super::node::{check_depth, Direction, Node, Scalar, Transform};
use super::Parser;
use crate::core::constants::{MAX_NESTING_DEPTH, METADATA_KEY};
use crate::core::detect::Format;
use crate::core::metadata::FileMetadata;
use crate::core::validation::validate_content_size;
use crate::error::{FormatError, Result, ValidationError};

/// Parser for `.yaml` / `.yml` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Yaml;

impl Scalar for Value {
    fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(s) => Some(Cow::Borrowed(s)),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            Value::Tagged(tagged) => tagged.value.text(),
            _ => None,
        }
    }

    fn with_text(&self, text: String) -> Self {
        match self {
            Value::Tagged(tagged) => Value::Tagged(Box::new(TaggedValue {
                tag: tagged.tag.clone(),
                value: tagged.value.with_text(text),
            })),
            _ => Value::String(text),
        }
    }

    fn label(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
            _ => "<complex key>".to_string(),
        }
    }
}

fn load(content: &str) -> Result<Value> {
    serde_yaml::from_str(content).map_err(|e| {
        let message = e.to_string();
        if message.contains("recursion limit exceeded") {
            ValidationError::DepthExceeded {
                limit: MAX_NESTING_DEPTH,
            }
            .into()
        } else {
            FormatError::Parse {
                format: "yaml",
                message,
            }
            .into()
        }
    })
}

fn emit(value: &Value) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| {
        FormatError::Serialize {
            format: "yaml",
            message: e.to_string(),
        }
        .into()
    })
}

fn lower(value: Value, depth: usize) -> Result<Node<Value>> {
    check_depth(depth)?;

    Ok(match value {
        Value::Sequence(items) => Node::Sequence(
            items
                .into_iter()
                .map(|item| lower(item, depth + 1))
                .collect::<Result<_>>()?,
        ),
        Value::Mapping(map) => Node::Mapping(
            map.into_iter()
                .map(|(k, v)| Ok((k, lower(v, depth + 1)?)))
                .collect::<Result<_>>()?,
        ),
        scalar => Node::Scalar(scalar),
    })
}

fn raise(node: Node<Value>) -> Value {
    match node {
        Node::Scalar(value) => value,
        Node::Sequence(items) => Value::Sequence(items.into_iter().map(raise).collect()),
        Node::Mapping(entries) => {
            Value::Mapping(entries.into_iter().map(|(k, v)| (k, raise(v))).collect())
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Give decrypted plaintexts that read as numbers or booleans their type
/// back. Used when the document has to be re-emitted.
fn retype(original: &Value, transformed: Value) -> Value {
    match (original, transformed) {
        (Value::String(before), Value::String(after)) if *before != after => {
            layout::resolve(&after).unwrap_or(Value::String(after))
        }
        (Value::Sequence(before), Value::Sequence(after)) => Value::Sequence(
            after
                .into_iter()
                .zip(before)
                .map(|(value, original)| retype(original, value))
                .collect(),
        ),
        (Value::Mapping(before), Value::Mapping(after)) => Value::Mapping(
            after
                .into_iter()
                .map(|(key, value)| {
                    let value = match before.get(&key) {
                        Some(original) => retype(original, value),
                        None => value,
                    };
                    (key, value)
                })
                .collect(),
        ),
        (_, other) => other,
    }
}

impl Parser for Yaml {
    fn format(&self) -> Format {
        Format::Yaml
    }

    fn transform(
        &self,
        content: &str,
        direction: Direction,
        f: &mut Transform<'_>,
    ) -> Result<String> {
        validate_content_size(content.as_bytes())?;
        if content.trim().is_empty() {
            return Ok(content.to_string());
        }

        let original = load(content)?;
        let mut tree = lower(original.clone(), 0)?;
        let mut changed = 0usize;
        tree.transform(direction, &mut |value: &str| {
            changed += 1;
            f(value)
        })?;

        // comment-only and null documents come back byte for byte
        if changed == 0 {
            return Ok(content.to_string());
        }

        let transformed = raise(tree);
        match layout::rewrite(content, &original, &transformed, direction) {
            Ok(out) => {
                trace!(changed, "rewrote yaml values in place");
                Ok(out)
            }
            Err(reason) => {
                warn!(reason, "yaml layout not preserved, document re-emitted");
                match direction {
                    Direction::Encrypt => emit(&transformed),
                    Direction::Decrypt => emit(&retype(&original, transformed)),
                }
            }
        }
    }

    fn attach_metadata(&self, content: &str, metadata: &FileMetadata) -> Result<String> {
        if content.trim().is_empty() {
            warn!("empty yaml document, metadata not attached");
            return Ok(content.to_string());
        }

        let mut root = load(content)?;
        let Value::Mapping(map) = &mut root else {
            warn!("yaml root is not a mapping, metadata not attached");
            return Ok(content.to_string());
        };

        let fields = metadata.fields();
        let block: Mapping = fields
            .iter()
            .map(|(name, value)| (Value::String(name.to_string()), Value::String(value.clone())))
            .collect();
        map.insert(Value::String(METADATA_KEY.to_string()), Value::Mapping(block));

        layout::append_metadata(content, &fields, &root).or_else(|reason| {
            warn!(reason, "yaml layout not preserved, document re-emitted");
            emit(&root)
        })
    }

    fn read_metadata(&self, content: &str) -> Result<Option<FileMetadata>> {
        if content.trim().is_empty() {
            return Ok(None);
        }

        let root = load(content)?;
        let Some(block) = root.get(METADATA_KEY).and_then(Value::as_mapping) else {
            return Ok(None);
        };

        let fields = block
            .iter()
            .filter_map(|(k, v)| Some((k.as_str()?.to_string(), scalar_text(v)?)));

        FileMetadata::from_fields(fields).map(Some)
    }

    fn strip_metadata(&self, content: &str) -> Result<String> {
        if content.trim().is_empty() {
            return Ok(content.to_string());
        }

        let root = load(content)?;
        match root {
            Value::Mapping(map) if map.contains_key(METADATA_KEY) => {
                let kept = Value::Mapping(
                    map.into_iter()
                        .filter(|(k, _)| k.as_str() != Some(METADATA_KEY))
                        .collect(),
                );
                layout::strip_metadata(content, &kept).or_else(|reason| {
                    warn!(reason, "yaml layout not preserved, document re-emitted");
                    emit(&kept)
                })
            }
            _ => Ok(content.to_string()),
        }
    }
}
