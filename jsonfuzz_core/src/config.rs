use crate::document::OutputFormat;
use crate::fuzzer::{
    BatchKind, Fuzzer, LeafSubstitution, MissingAttribute, PayloadGenerator,
    StructuralSubstitution,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct FuzzerSettings {
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_batches")]
    pub batches: Vec<BatchKind>,
}

pub fn default_threads() -> usize {
    1
}

pub fn default_batches() -> Vec<BatchKind> {
    BatchKind::ALL.to_vec()
}

impl Default for FuzzerSettings {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            batches: default_batches(),
        }
    }
}

impl FuzzerSettings {
    pub fn build_fuzzer(&self) -> Fuzzer {
        Fuzzer::with_threads(self.threads)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct PayloadSettings {
    #[serde(default = "default_leaf_value")]
    pub leaf_value: Value,
    #[serde(default = "default_structure_value")]
    pub structure_value: Value,
}

pub fn default_leaf_value() -> Value {
    Value::String("PAYLOAD".to_string())
}

pub fn default_structure_value() -> Value {
    Value::String("STRUCTURE PAYLOAD".to_string())
}

impl Default for PayloadSettings {
    fn default() -> Self {
        Self {
            leaf_value: default_leaf_value(),
            structure_value: default_structure_value(),
        }
    }
}

impl PayloadSettings {
    /// Builds the generator for `kind` with the configured injection value.
    pub fn generator(&self, kind: BatchKind) -> Box<dyn PayloadGenerator> {
        match kind {
            BatchKind::Leaf => Box::new(LeafSubstitution::new(self.leaf_value.clone())),
            BatchKind::Structure => {
                Box::new(StructuralSubstitution::new(self.structure_value.clone()))
            }
            BatchKind::Missing => Box::new(MissingAttribute),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub counts_only: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct InputSettings {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct JsonFuzzConfig {
    #[serde(default)]
    pub fuzzer: FuzzerSettings,
    #[serde(default)]
    pub payloads: PayloadSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub input: InputSettings,
}

impl JsonFuzzConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        Self::from_toml_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
