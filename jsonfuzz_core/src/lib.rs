pub mod config;
pub mod dedup;
pub mod document;
pub mod fuzzer;
pub mod injector;
pub mod path;
pub mod path_finder;

#[cfg(test)]
mod proptest_strategies;

pub use config::JsonFuzzConfig;
pub use dedup::UniquePayloads;
pub use document::{DocumentError, OutputFormat, Value};
pub use fuzzer::{
    BatchKind, Fuzzer, LeafSubstitution, MissingAttribute, PayloadGenerator,
    StructuralSubstitution,
};
pub use injector::{InjectorError, expand_ancestors, expand_missing, get, inject, remove};
pub use path::{Path, Step};
pub use path_finder::{leaf_count, map_structure};
