use serde::{Deserialize, Serialize};
use std::fmt;

/// A single step from a container to one of its children.
///
/// Serialized untagged, so a path reads as a plain JSON array such as
/// `["list_top", 0, "name"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// Selects an element of an array by position.
    Index(usize),
    /// Selects a member of an object by key.
    Key(String),
}

impl From<usize> for Step {
    fn from(index: usize) -> Self {
        Step::Index(index)
    }
}

impl From<&str> for Step {
    fn from(key: &str) -> Self {
        Step::Key(key.to_string())
    }
}

impl From<String> for Step {
    fn from(key: String) -> Self {
        Step::Key(key)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Index(index) => write!(f, "{index}"),
            Step::Key(key) => {
                let quoted = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
        }
    }
}

/// An ordered sequence of [`Step`]s locating a node from the root of a structure.
///
/// The empty path addresses the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<Step>);

impl Path {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path extended by one step, leaving `self` untouched.
    pub fn child(&self, step: impl Into<Step>) -> Path {
        let mut steps = Vec::with_capacity(self.0.len() + 1);
        steps.extend_from_slice(&self.0);
        steps.push(step.into());
        Path(steps)
    }

    /// The first `len` steps of this path. `len` is clamped to the path length.
    pub fn prefix(&self, len: usize) -> Path {
        Path(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Every prefix of length `1..=len()`, shortest first.
    pub fn prefixes(&self) -> impl Iterator<Item = Path> + '_ {
        (1..=self.0.len()).map(move |len| self.prefix(len))
    }

    /// Every prefix strictly between the root and the full path, longest first.
    ///
    /// A path of length `n` yields prefixes of length `n - 1` down to `1`; paths
    /// of length zero or one yield nothing.
    pub fn proper_prefixes(&self) -> impl Iterator<Item = Path> + '_ {
        (1..self.0.len()).rev().map(move |len| self.prefix(len))
    }
}

impl From<Vec<Step>> for Path {
    fn from(steps: Vec<Step>) -> Self {
        Path(steps)
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (position, step) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{step}")?;
        }
        f.write_str("]")
    }
}

/// Builds a [`Path`] from a mix of string keys and array indices.
///
/// ```
/// use jsonfuzz_core::path;
///
/// let path = path!["list_top", 0, "name"];
/// assert_eq!(path.to_string(), r#"["list_top", 0, "name"]"#);
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::path::Path::new()
    };
    ($($step:expr),+ $(,)?) => {
        $crate::path::Path::from(vec![$($crate::path::Step::from($step)),+])
    };
}
