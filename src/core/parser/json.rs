//! JSON parser.
//!
//! Relies on `serde_json`'s `preserve_order` feature so objects keep their
//! key order through the round trip. Output is pretty-printed with two-space
//! indentation and a trailing newline.

use std::borrow::Cow;

use serde_json::{Map, Value};
use tracing::{trace, warn};

use super::node::{check_depth, Direction, Node, Scalar, Transform};
use super::Parser;
use crate::core::constants::{MAX_NESTING_DEPTH, METADATA_KEY};
use crate::core::detect::Format;
use crate::core::metadata::FileMetadata;
use crate::core::validation::validate_content_size;
use crate::error::{FormatError, Result, ValidationError};

/// Parser for `.json` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Scalar for Value {
    fn text(&self) -> Option<Cow<'_, str>> {
        self.as_str().map(Cow::Borrowed)
    }

    fn with_text(&self, text: String) -> Self {
        Value::String(text)
    }

    fn label(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

fn load(content: &str) -> Result<Value> {
    serde_json::from_str(content).map_err(|e| {
        let message = e.to_string();
        if message.contains("recursion limit exceeded") {
            ValidationError::DepthExceeded {
                limit: MAX_NESTING_DEPTH,
            }
            .into()
        } else {
            FormatError::Parse {
                format: "json",
                message,
            }
            .into()
        }
    })
}

fn emit(value: &Value) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value).map_err(|e| FormatError::Serialize {
        format: "json",
        message: e.to_string(),
    })?;
    out.push('\n');
    Ok(out)
}

fn lower(value: Value, depth: usize) -> Result<Node<Value>> {
    check_depth(depth)?;

    Ok(match value {
        Value::Array(items) => Node::Sequence(
            items
                .into_iter()
                .map(|item| lower(item, depth + 1))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => Node::Mapping(
            map.into_iter()
                .map(|(k, v)| Ok((Value::String(k), lower(v, depth + 1)?)))
                .collect::<Result<_>>()?,
        ),
        scalar => Node::Scalar(scalar),
    })
}

fn raise(node: Node<Value>) -> Value {
    match node {
        Node::Scalar(value) => value,
        Node::Sequence(items) => Value::Array(items.into_iter().map(raise).collect()),
        Node::Mapping(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, raise(v))
                })
                .collect(),
        ),
    }
}

impl Parser for Json {
    fn format(&self) -> Format {
        Format::Json
    }

    fn transform(
        &self,
        content: &str,
        direction: Direction,
        f: &mut Transform<'_>,
    ) -> Result<String> {
        validate_content_size(content.as_bytes())?;

        let mut tree = lower(load(content)?, 0)?;
        tree.transform(direction, f)?;

        trace!(?direction, "transformed json document");
        emit(&raise(tree))
    }

    fn attach_metadata(&self, content: &str, metadata: &FileMetadata) -> Result<String> {
        let mut root = load(content)?;
        let Value::Object(map) = &mut root else {
            warn!("json root is not an object, metadata not attached");
            return Ok(content.to_string());
        };

        let block: Map<String, Value> = metadata
            .fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), Value::String(value)))
            .collect();
        map.insert(METADATA_KEY.to_string(), Value::Object(block));

        emit(&root)
    }

    fn read_metadata(&self, content: &str) -> Result<Option<FileMetadata>> {
        let root = load(content)?;
        let Some(block) = root.get(METADATA_KEY).and_then(Value::as_object) else {
            return Ok(None);
        };

        let fields = block.iter().filter_map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                Value::Bool(_) | Value::Number(_) => v.to_string(),
                _ => return None,
            };
            Some((k.as_str(), text))
        });

        FileMetadata::from_fields(fields).map(Some)
    }

    fn strip_metadata(&self, content: &str) -> Result<String> {
        match load(content)? {
            Value::Object(map) if map.contains_key(METADATA_KEY) => {
                let kept: Map<String, Value> = map
                    .into_iter()
                    .filter(|(k, _)| k != METADATA_KEY)
                    .collect();
                emit(&Value::Object(kept))
            }
            _ => Ok(content.to_string()),
        }
    }
}
