//! JSON Patch (RFC 6902) application over a generic JSON tree.
//!
//! A batch is applied to a private copy of the document. The copy is returned
//! only if every operation succeeded, so callers either get the fully patched
//! tree or an error with the original left untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single edit operation of a patch batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: Value },
}

impl PatchOperation {
    /// Operation kind as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::Replace { .. } => "replace",
            Self::Move { .. } => "move",
            Self::Copy { .. } => "copy",
            Self::Test { .. } => "test",
        }
    }

    /// Target path of the operation
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. }
            | Self::Remove { path }
            | Self::Replace { path, .. }
            | Self::Move { path, .. }
            | Self::Copy { path, .. }
            | Self::Test { path, .. } => path,
        }
    }
}

/// Why a single operation could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchErrorKind {
    #[error("invalid JSON pointer '{0}'")]
    InvalidPointer(String),

    #[error("path '{0}' does not exist")]
    PathNotFound(String),

    #[error("invalid array index in '{0}'")]
    InvalidIndex(String),

    #[error("array index out of bounds in '{0}'")]
    IndexOutOfBounds(String),

    #[error("parent of '{0}' is not an object or array")]
    NotAContainer(String),

    #[error("the document root cannot be removed")]
    RootRemoval,

    #[error("cannot move '{from}' into its own child '{path}'")]
    MoveIntoChild { from: String, path: String },

    #[error("value at '{0}' does not match")]
    TestFailed(String),
}

/// A failed batch, pointing at the first operation that failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operation #{index} ({op} {path}) failed: {kind}")]
pub struct PatchError {
    pub index: usize,
    pub op: &'static str,
    pub path: String,
    #[source]
    pub kind: PatchErrorKind,
}

/// Apply `operations` in order to a copy of `document`.
///
/// The input document is never modified.
pub fn apply_patch(document: &Value, operations: &[PatchOperation]) -> Result<Value, PatchError> {
    let mut working = document.clone();

    for (index, operation) in operations.iter().enumerate() {
        apply_operation(&mut working, operation).map_err(|kind| PatchError {
            index,
            op: operation.name(),
            path: operation.path().to_string(),
            kind,
        })?;
    }

    Ok(working)
}

fn apply_operation(root: &mut Value, operation: &PatchOperation) -> Result<(), PatchErrorKind> {
    match operation {
        PatchOperation::Add { path, value } => add(root, path, value.clone()),
        PatchOperation::Remove { path } => remove(root, path).map(|_| ()),
        PatchOperation::Replace { path, value } => replace(root, path, value.clone()),
        PatchOperation::Move { from, path } => {
            if from == path {
                // Still has to exist.
                return lookup(root, from).map(|_| ());
            }
            if path.starts_with(&format!("{from}/")) {
                return Err(PatchErrorKind::MoveIntoChild {
                    from: from.clone(),
                    path: path.clone(),
                });
            }
            let value = remove(root, from)?;
            add(root, path, value)
        }
        PatchOperation::Copy { from, path } => {
            let value = lookup(root, from)?.clone();
            add(root, path, value)
        }
        PatchOperation::Test { path, value } => {
            if lookup(root, path)? == value {
                Ok(())
            } else {
                Err(PatchErrorKind::TestFailed(path.clone()))
            }
        }
    }
}

fn add(root: &mut Value, path: &str, value: Value) -> Result<(), PatchErrorKind> {
    let tokens = parse_pointer(path)?;
    let Some((last, parents)) = tokens.split_last() else {
        *root = value;
        return Ok(());
    };

    let parent = resolve_mut(root, parents)
        .ok_or_else(|| PatchErrorKind::PathNotFound(path.to_string()))?;

    match parent {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            let index =
                array_index(last).ok_or_else(|| PatchErrorKind::InvalidIndex(path.to_string()))?;
            if index > items.len() {
                return Err(PatchErrorKind::IndexOutOfBounds(path.to_string()));
            }
            items.insert(index, value);
            Ok(())
        }
        _ => Err(PatchErrorKind::NotAContainer(path.to_string())),
    }
}

fn remove(root: &mut Value, path: &str) -> Result<Value, PatchErrorKind> {
    let tokens = parse_pointer(path)?;
    let Some((last, parents)) = tokens.split_last() else {
        return Err(PatchErrorKind::RootRemoval);
    };

    let parent = resolve_mut(root, parents)
        .ok_or_else(|| PatchErrorKind::PathNotFound(path.to_string()))?;

    match parent {
        Value::Object(map) => map
            .remove(last)
            .ok_or_else(|| PatchErrorKind::PathNotFound(path.to_string())),
        Value::Array(items) => {
            let index =
                array_index(last).ok_or_else(|| PatchErrorKind::InvalidIndex(path.to_string()))?;
            if index >= items.len() {
                return Err(PatchErrorKind::IndexOutOfBounds(path.to_string()));
            }
            Ok(items.remove(index))
        }
        _ => Err(PatchErrorKind::NotAContainer(path.to_string())),
    }
}

fn replace(root: &mut Value, path: &str, value: Value) -> Result<(), PatchErrorKind> {
    let tokens = parse_pointer(path)?;
    let target = resolve_mut(root, &tokens)
        .ok_or_else(|| PatchErrorKind::PathNotFound(path.to_string()))?;
    *target = value;
    Ok(())
}

fn lookup<'a>(root: &'a Value, path: &str) -> Result<&'a Value, PatchErrorKind> {
    let tokens = parse_pointer(path)?;
    let mut current = root;
    for token in &tokens {
        current = match current {
            Value::Object(map) => map.get(token),
            Value::Array(items) => array_index(token).and_then(|index| items.get(index)),
            _ => None,
        }
        .ok_or_else(|| PatchErrorKind::PathNotFound(path.to_string()))?;
    }
    Ok(current)
}

fn resolve_mut<'a>(mut current: &'a mut Value, tokens: &[String]) -> Option<&'a mut Value> {
    for token in tokens {
        current = match current {
            Value::Object(map) => map.get_mut(token)?,
            Value::Array(items) => items.get_mut(array_index(token)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Array indices are plain decimal numbers without leading zeros.
fn array_index(token: &str) -> Option<usize> {
    let well_formed = !token.is_empty()
        && token.bytes().all(|b| b.is_ascii_digit())
        && (token == "0" || !token.starts_with('0'));
    if well_formed { token.parse().ok() } else { None }
}

fn parse_pointer(path: &str) -> Result<Vec<String>, PatchErrorKind> {
    if path.is_empty() {
        return Ok(Vec::new());
    }

    if !path.starts_with('/') {
        return Err(PatchErrorKind::InvalidPointer(path.to_string()));
    }

    path.split('/')
        .skip(1)
        .map(|token| {
            unescape_token(token).ok_or_else(|| PatchErrorKind::InvalidPointer(path.to_string()))
        })
        .collect()
}

fn unescape_token(token: &str) -> Option<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();

    while let Some(ch) = chars.next() {
        if ch == '~' {
            match chars.next()? {
                '0' => out.push('~'),
                '1' => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(ch);
        }
    }

    Some(out)
}
