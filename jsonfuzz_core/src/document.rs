use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Read;
use std::path::{Path as FsPath, PathBuf};
use thiserror::Error;

/// The document and payload type, re-exported so callers need not depend on
/// `serde_json` directly.
pub use serde_json::Value;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read document from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

/// The document used when no input is supplied.
pub fn sample_document() -> Value {
    json!({
        "name": "blah",
        "hobbies": [
            "climbing",
            ["skating"],
            "walking"
        ]
    })
}

pub fn parse_document(text: &str) -> Result<Value, DocumentError> {
    Ok(serde_json::from_str(text)?)
}

pub fn read_document<R: Read>(reader: R) -> Result<Value, DocumentError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Loads a JSON document from `path`, or from stdin when `path` is `-`.
pub fn load_document(path: &FsPath) -> Result<Value, DocumentError> {
    if path == FsPath::new("-") {
        return read_document(std::io::stdin().lock());
    }
    let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&text)
}

/// Interprets a command-line injection value: valid JSON is used as-is,
/// anything else becomes a JSON string.
pub fn parse_injection_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn render<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String, DocumentError> {
    let rendered = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };
    Ok(rendered)
}
