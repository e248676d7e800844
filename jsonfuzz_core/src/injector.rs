use crate::path::{Path, Step};
use serde_json::Value;
use thiserror::Error;

/// Failure to resolve a [`Path`] against a structure.
///
/// `depth` is the zero-based position of the offending step within `path`.
/// The batch expansions report the caller's full path even when the failure
/// happened on one of its prefixes, so `depth` always indexes into the path
/// the caller passed in.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InjectorError {
    #[error("path {path} not found: step {depth} does not exist in the structure")]
    PathNotFound { path: Path, depth: usize },
    #[error("path {path} does not fit the structure: step {depth} cannot address into {found}")]
    TypeMismatch {
        path: Path,
        depth: usize,
        found: &'static str,
    },
}

impl InjectorError {
    /// The path that failed to resolve.
    pub fn path(&self) -> &Path {
        match self {
            InjectorError::PathNotFound { path, .. } | InjectorError::TypeMismatch { path, .. } => {
                path
            }
        }
    }

    /// Re-attributes the error to `path`, keeping the failing depth.
    fn for_path(self, path: &Path) -> InjectorError {
        match self {
            InjectorError::PathNotFound { depth, .. } => InjectorError::PathNotFound {
                path: path.clone(),
                depth,
            },
            InjectorError::TypeMismatch { depth, found, .. } => InjectorError::TypeMismatch {
                path: path.clone(),
                depth,
                found,
            },
        }
    }
}

/// Why a single step failed, before the full path is attached.
#[derive(Debug, Clone, Copy)]
enum Miss {
    Absent,
    Mismatch(&'static str),
}

impl Miss {
    fn at(self, path: &Path, depth: usize) -> InjectorError {
        match self {
            Miss::Absent => InjectorError::PathNotFound {
                path: path.clone(),
                depth,
            },
            Miss::Mismatch(found) => InjectorError::TypeMismatch {
                path: path.clone(),
                depth,
                found,
            },
        }
    }
}

fn kind_of(node: &Value) -> &'static str {
    match node {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn lookup<'a>(node: &'a Value, step: &Step) -> Result<&'a Value, Miss> {
    match (node, step) {
        (Value::Object(map), Step::Key(key)) => map.get(key).ok_or(Miss::Absent),
        (Value::Array(items), Step::Index(index)) => items.get(*index).ok_or(Miss::Absent),
        (other, _) => Err(Miss::Mismatch(kind_of(other))),
    }
}

fn lookup_mut<'a>(node: &'a mut Value, step: &Step) -> Result<&'a mut Value, Miss> {
    match (node, step) {
        (Value::Object(map), Step::Key(key)) => map.get_mut(key).ok_or(Miss::Absent),
        (Value::Array(items), Step::Index(index)) => items.get_mut(*index).ok_or(Miss::Absent),
        (other, _) => Err(Miss::Mismatch(kind_of(other))),
    }
}

/// Copies `structure`, walks the copy to the parent of the final step of
/// `path`, and hands that parent to `apply`. An empty path returns the copy
/// untouched.
fn edit_copy<F>(structure: &Value, path: &Path, apply: F) -> Result<Value, InjectorError>
where
    F: FnOnce(&mut Value, &Step) -> Result<(), Miss>,
{
    let mut target = structure.clone();
    let Some((last, parents)) = path.steps().split_last() else {
        return Ok(target);
    };

    let mut current = &mut target;
    for (depth, step) in parents.iter().enumerate() {
        current = lookup_mut(current, step).map_err(|miss| miss.at(path, depth))?;
    }
    apply(current, last).map_err(|miss| miss.at(path, parents.len()))?;

    Ok(target)
}

/// Reads the value addressed by `path`. The empty path addresses the root.
pub fn get<'a>(structure: &'a Value, path: &Path) -> Result<&'a Value, InjectorError> {
    let mut current = structure;
    for (depth, step) in path.into_iter().enumerate() {
        current = lookup(current, step).map_err(|miss| miss.at(path, depth))?;
    }
    Ok(current)
}

/// Returns a copy of `structure` with the member or element addressed by
/// `path` replaced by `value`.
///
/// The addressed member must already exist; this never adds keys or grows
/// arrays.
///
/// # Arguments
/// * `structure`: The document to copy. It is never modified.
/// * `path`: Location of the member to replace. The empty path returns an
///   unchanged copy.
/// * `value`: Replacement, cloned into the result.
///
/// # Returns
/// The edited copy, or an [`InjectorError`] naming the first step that does
/// not resolve.
pub fn inject(structure: &Value, path: &Path, value: &Value) -> Result<Value, InjectorError> {
    edit_copy(structure, path, |parent, last| {
        *lookup_mut(parent, last)? = value.clone();
        Ok(())
    })
}

/// Returns a copy of `structure` with the member or element addressed by
/// `path` removed.
///
/// Object members keep their relative order. Array elements after the removed
/// index shift down by one.
///
/// # Returns
/// The edited copy, or an [`InjectorError`] when `path` does not address an
/// existing member or element.
pub fn remove(structure: &Value, path: &Path) -> Result<Value, InjectorError> {
    edit_copy(structure, path, |parent, last| match (parent, last) {
        (Value::Object(map), Step::Key(key)) => {
            map.shift_remove(key.as_str()).map(drop).ok_or(Miss::Absent)
        }
        (Value::Array(items), Step::Index(index)) if *index < items.len() => {
            items.remove(*index);
            Ok(())
        }
        (Value::Array(_), Step::Index(_)) => Err(Miss::Absent),
        (other, _) => Err(Miss::Mismatch(kind_of(other))),
    })
}

/// Replaces each intermediate ancestor of the node at `path` with `value`.
///
/// For a path of length `n` this yields `n - 1` structures: the immediate
/// parent replaced first, the first step alone replaced last. Paths of length
/// zero or one have no intermediate ancestor and yield nothing.
///
/// To demonstrate, the path to `type` in
///
/// ```json
/// {"top_level": "top", "list_top": [{"name": {"type": "test"}}]}
/// ```
///
/// is `["list_top", 0, "name", "type"]`, which produces structures where
/// `list_top[0].name`, `list_top[0]` and `list_top` are each replaced.
///
/// # Arguments
/// * `structure`: The document to copy for each replacement.
/// * `path`: Path to a leaf of `structure`.
/// * `value`: Replacement for every ancestor, cloned into each result.
///
/// # Returns
/// One structure per intermediate ancestor, or the first error. Errors name
/// `path` itself rather than the ancestor that failed.
pub fn expand_ancestors(
    structure: &Value,
    path: &Path,
    value: &Value,
) -> Result<Vec<Value>, InjectorError> {
    path.proper_prefixes()
        .map(|ancestor| inject(structure, &ancestor, value).map_err(|err| err.for_path(path)))
        .collect()
}

/// Removes each step of `path` in turn, shallowest first.
///
/// Every removal starts from the original `structure`, so the results are
/// independent single deletions rather than compounding ones. An error names
/// `path` itself, with `depth` marking the step that could not be removed.
pub fn expand_missing(structure: &Value, path: &Path) -> Result<Vec<Value>, InjectorError> {
    path.prefixes()
        .map(|prefix| remove(structure, &prefix).map_err(|err| err.for_path(path)))
        .collect()
}
