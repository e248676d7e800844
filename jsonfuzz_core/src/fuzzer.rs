use crate::dedup::UniquePayloads;
use crate::injector::{self, InjectorError};
use crate::path::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// The three families of payload batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchKind {
    /// The value at each leaf path replaced.
    Leaf,
    /// Each intermediate ancestor of each leaf replaced, deduplicated.
    Structure,
    /// Each member along each leaf path removed, deduplicated.
    Missing,
}

impl BatchKind {
    pub const ALL: [BatchKind; 3] = [BatchKind::Leaf, BatchKind::Structure, BatchKind::Missing];

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchKind::Leaf => "leaf",
            BatchKind::Structure => "structure",
            BatchKind::Missing => "missing",
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BatchKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown batch '{s}', expected one of: leaf, structure, missing"))
    }
}

/// Drives the per-path injector expansions across a whole path list.
///
/// With `threads > 1`, per-path expansion is spread over scoped worker threads
/// and the results are merged back in path order, so the output is always
/// identical to a single-threaded run.
#[derive(Debug, Clone)]
pub struct Fuzzer {
    threads: usize,
}

impl Default for Fuzzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Fuzzer {
    pub fn new() -> Self {
        Self { threads: 1 }
    }

    /// Uses up to `threads` workers per batch. Zero is treated as one.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// One payload per path with the leaf at that path replaced by `value`.
    /// Order follows `paths`; no deduplication.
    pub fn leaf_substitutions(
        &self,
        structure: &Value,
        paths: &[Path],
        value: &Value,
    ) -> Result<Vec<Value>, InjectorError> {
        let payloads = self
            .expand_paths(paths, |path| {
                injector::inject(structure, path, value).map(|payload| vec![payload])
            })?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        debug!(batch = %BatchKind::Leaf, payloads = payloads.len(), "generated batch");
        Ok(payloads)
    }

    /// Every ancestor-level replacement for every path, keeping only the first
    /// of each structurally equal payload.
    pub fn structural_substitutions(
        &self,
        structure: &Value,
        paths: &[Path],
        value: &Value,
    ) -> Result<Vec<Value>, InjectorError> {
        let expanded = self.expand_paths(paths, |path| {
            injector::expand_ancestors(structure, path, value)
        })?;
        Ok(merge_unique(BatchKind::Structure, expanded))
    }

    /// Every single-member removal along every path, keeping only the first
    /// of each structurally equal payload.
    pub fn missing_attribute_permutations(
        &self,
        structure: &Value,
        paths: &[Path],
    ) -> Result<Vec<Value>, InjectorError> {
        let expanded =
            self.expand_paths(paths, |path| injector::expand_missing(structure, path))?;
        Ok(merge_unique(BatchKind::Missing, expanded))
    }

    /// Runs `expand` for every path, returning results in path order. Fails
    /// with the error of the earliest failing path.
    fn expand_paths<F>(&self, paths: &[Path], expand: F) -> Result<Vec<Vec<Value>>, InjectorError>
    where
        F: Fn(&Path) -> Result<Vec<Value>, InjectorError> + Sync,
    {
        let workers = self.threads.min(paths.len());
        if workers <= 1 {
            return paths.iter().map(&expand).collect();
        }

        let chunk_size = paths.len().div_ceil(workers);
        debug!(workers, chunk_size, paths = paths.len(), "expanding paths in parallel");

        std::thread::scope(|scope| {
            let expand = &expand;
            let handles: Vec<_> = paths
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || chunk.iter().map(expand).collect::<Result<Vec<_>, _>>())
                })
                .collect();

            let mut expanded = Vec::with_capacity(paths.len());
            for handle in handles {
                match handle.join() {
                    Ok(chunk) => expanded.extend(chunk?),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            Ok(expanded)
        })
    }
}

fn merge_unique(kind: BatchKind, expanded: Vec<Vec<Value>>) -> Vec<Value> {
    let mut unique = UniquePayloads::new();
    let mut total = 0;
    for payloads in expanded {
        total += payloads.len();
        unique.insert_all(payloads);
    }
    debug!(
        batch = %kind,
        payloads = unique.len(),
        duplicates = total - unique.len(),
        "generated batch"
    );
    unique.into_vec()
}

/// A batch strategy that turns a structure and its leaf paths into payloads.
///
/// Implementations are deterministic: the same structure and paths always
/// produce the same payloads in the same order.
pub trait PayloadGenerator: Send + Sync {
    fn kind(&self) -> BatchKind;

    /// Generates the whole batch for `structure`.
    ///
    /// # Arguments
    /// * `fuzzer`: Runs the expansion, possibly across several worker threads.
    /// * `structure`: The document to permute. It is never modified.
    /// * `paths`: Leaf paths of `structure`, usually from
    ///   [`map_structure`](crate::path_finder::map_structure). Payloads follow
    ///   their order.
    ///
    /// # Returns
    /// `Result<Vec<Value>, InjectorError>`:
    ///   - `Ok(payloads)`: The batch, deduplicated for structural and missing
    ///     batches.
    ///   - `Err(error)`: The first path that does not resolve. No partial batch
    ///     is returned.
    fn generate(
        &self,
        fuzzer: &Fuzzer,
        structure: &Value,
        paths: &[Path],
    ) -> Result<Vec<Value>, InjectorError>;
}

/// [`Fuzzer::leaf_substitutions`] with a fixed injection value.
#[derive(Debug, Clone)]
pub struct LeafSubstitution {
    pub value: Value,
}

impl LeafSubstitution {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl PayloadGenerator for LeafSubstitution {
    fn kind(&self) -> BatchKind {
        BatchKind::Leaf
    }

    fn generate(
        &self,
        fuzzer: &Fuzzer,
        structure: &Value,
        paths: &[Path],
    ) -> Result<Vec<Value>, InjectorError> {
        fuzzer.leaf_substitutions(structure, paths, &self.value)
    }
}

/// [`Fuzzer::structural_substitutions`] with a fixed injection value.
#[derive(Debug, Clone)]
pub struct StructuralSubstitution {
    pub value: Value,
}

impl StructuralSubstitution {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl PayloadGenerator for StructuralSubstitution {
    fn kind(&self) -> BatchKind {
        BatchKind::Structure
    }

    fn generate(
        &self,
        fuzzer: &Fuzzer,
        structure: &Value,
        paths: &[Path],
    ) -> Result<Vec<Value>, InjectorError> {
        fuzzer.structural_substitutions(structure, paths, &self.value)
    }
}

/// [`Fuzzer::missing_attribute_permutations`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MissingAttribute;

impl PayloadGenerator for MissingAttribute {
    fn kind(&self) -> BatchKind {
        BatchKind::Missing
    }

    fn generate(
        &self,
        fuzzer: &Fuzzer,
        structure: &Value,
        paths: &[Path],
    ) -> Result<Vec<Value>, InjectorError> {
        fuzzer.missing_attribute_permutations(structure, paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use crate::path_finder::map_structure;
    use crate::proptest_strategies::json_value_strategy;
    use proptest::prelude::*;
    use serde_json::json;

    fn duplicated_list() -> Value {
        json!({
            "top_level": "top",
            "nested_top": {"middle_level": "test"},
            "list_top": [{"name": {"type": "test"}}, {"name": {"type": "test"}}],
        })
    }

    fn duplicated_list_paths() -> Vec<Path> {
        vec![
            path!["top_level"],
            path!["nested_top", "middle_level"],
            path!["list_top", 0, "name", "type"],
            path!["list_top", 1, "name", "type"],
        ]
    }

    #[test]
    fn leaf_substitutions_follow_path_order() {
        let structure = json!({"name": "blah", "hobbies": ["climbing", ["skating"], "walking"]});
        let paths = map_structure(&structure);
        let result = Fuzzer::new()
            .leaf_substitutions(&structure, &paths, &json!("PAYLOAD"))
            .unwrap();
        assert_eq!(
            result,
            vec![
                json!({"name": "PAYLOAD", "hobbies": ["climbing", ["skating"], "walking"]}),
                json!({"name": "blah", "hobbies": ["PAYLOAD", ["skating"], "walking"]}),
                json!({"name": "blah", "hobbies": ["climbing", ["PAYLOAD"], "walking"]}),
                json!({"name": "blah", "hobbies": ["climbing", ["skating"], "PAYLOAD"]}),
            ]
        );
    }

    #[test]
    fn leaf_substitutions_keep_duplicates() {
        let structure = json!({"a": "X", "b": "X"});
        let paths = vec![path!["a"], path!["a"]];
        let result = Fuzzer::new()
            .leaf_substitutions(&structure, &paths, &json!("X"))
            .unwrap();
        assert_eq!(result, vec![structure.clone(), structure]);
    }

    #[test]
    fn structural_substitutions_suppress_shared_ancestors() {
        let result = Fuzzer::new()
            .structural_substitutions(&duplicated_list(), &duplicated_list_paths(), &json!("manzanas"))
            .unwrap();
        assert_eq!(
            result,
            vec![
                json!({
                    "top_level": "top",
                    "nested_top": "manzanas",
                    "list_top": [{"name": {"type": "test"}}, {"name": {"type": "test"}}],
                }),
                json!({
                    "top_level": "top",
                    "nested_top": {"middle_level": "test"},
                    "list_top": [{"name": "manzanas"}, {"name": {"type": "test"}}],
                }),
                json!({
                    "top_level": "top",
                    "nested_top": {"middle_level": "test"},
                    "list_top": ["manzanas", {"name": {"type": "test"}}],
                }),
                json!({
                    "top_level": "top",
                    "nested_top": {"middle_level": "test"},
                    "list_top": "manzanas",
                }),
                json!({
                    "top_level": "top",
                    "nested_top": {"middle_level": "test"},
                    "list_top": [{"name": {"type": "test"}}, {"name": "manzanas"}],
                }),
                json!({
                    "top_level": "top",
                    "nested_top": {"middle_level": "test"},
                    "list_top": [{"name": {"type": "test"}}, "manzanas"],
                }),
            ]
        );
    }

    #[test]
    fn missing_attribute_permutations_simple() {
        let structure = json!({"user_id": "AAAAA", "address": "AAAAA"});
        let paths = map_structure(&structure);
        let result = Fuzzer::new()
            .missing_attribute_permutations(&structure, &paths)
            .unwrap();
        assert_eq!(
            result,
            vec![json!({"address": "AAAAA"}), json!({"user_id": "AAAAA"})]
        );
    }

    #[test]
    fn missing_attribute_permutations_list_of_dicts() {
        let structure = json!({"list_top": [{"a": 1, "b": 2}, {"a": 3}]});
        let paths = map_structure(&structure);
        let result = Fuzzer::new()
            .missing_attribute_permutations(&structure, &paths)
            .unwrap();
        assert_eq!(
            result,
            vec![
                json!({}),
                json!({"list_top": [{"a": 3}]}),
                json!({"list_top": [{"b": 2}, {"a": 3}]}),
                json!({"list_top": [{"a": 1}, {"a": 3}]}),
                json!({"list_top": [{"a": 1, "b": 2}]}),
                json!({"list_top": [{"a": 1, "b": 2}, {}]}),
            ]
        );
    }

    #[test]
    fn missing_attribute_permutations_deep_nesting() {
        let structure = json!([[[[[[{"my": ["worst", "nightmare"]}]]]]]]);
        let paths = map_structure(&structure);
        assert_eq!(
            paths,
            vec![
                path![0, 0, 0, 0, 0, 0, "my", 0],
                path![0, 0, 0, 0, 0, 0, "my", 1]
            ]
        );

        let result = Fuzzer::new()
            .missing_attribute_permutations(&structure, &paths)
            .unwrap();
        assert_eq!(
            result,
            vec![
                json!([]),
                json!([[]]),
                json!([[[]]]),
                json!([[[[]]]]),
                json!([[[[[]]]]]),
                json!([[[[[[]]]]]]),
                json!([[[[[[{}]]]]]]),
                json!([[[[[[{"my": ["nightmare"]}]]]]]]),
                json!([[[[[[{"my": ["worst"]}]]]]]]),
            ]
        );
    }

    #[test]
    fn invalid_path_fails_the_whole_batch() {
        let structure = json!({"a": {"b": 1}});
        let paths = vec![path!["a", "b"], path!["a", "missing", "c"]];
        let fuzzer = Fuzzer::new();

        assert!(fuzzer.leaf_substitutions(&structure, &paths, &json!(0)).is_err());
        assert!(fuzzer.structural_substitutions(&structure, &paths, &json!(0)).is_err());
        let err = fuzzer
            .missing_attribute_permutations(&structure, &paths)
            .unwrap_err();
        assert!(matches!(err, InjectorError::PathNotFound { depth: 1, .. }));
    }

    #[test]
    fn batch_errors_name_the_requested_path() {
        let structure = json!({"a": {"b": 1}});
        let paths = vec![path!["x", "b", "c"]];
        let fuzzer = Fuzzer::new();
        let expected = InjectorError::PathNotFound {
            path: path!["x", "b", "c"],
            depth: 0,
        };

        let structural = fuzzer
            .structural_substitutions(&structure, &paths, &json!(0))
            .unwrap_err();
        assert_eq!(structural, expected);
        assert_eq!(
            structural.to_string(),
            r#"path ["x", "b", "c"] not found: step 0 does not exist in the structure"#
        );

        let missing = fuzzer
            .missing_attribute_permutations(&structure, &paths)
            .unwrap_err();
        assert_eq!(missing, expected);
    }

    #[test]
    fn parallel_workers_match_sequential_output() {
        let structure = duplicated_list();
        let paths = map_structure(&structure);
        let sequential = Fuzzer::new();
        let parallel = Fuzzer::with_threads(3);

        assert_eq!(
            parallel.leaf_substitutions(&structure, &paths, &json!(1)).unwrap(),
            sequential.leaf_substitutions(&structure, &paths, &json!(1)).unwrap()
        );
        assert_eq!(
            parallel.structural_substitutions(&structure, &paths, &json!(1)).unwrap(),
            sequential.structural_substitutions(&structure, &paths, &json!(1)).unwrap()
        );
        assert_eq!(
            parallel.missing_attribute_permutations(&structure, &paths).unwrap(),
            sequential.missing_attribute_permutations(&structure, &paths).unwrap()
        );
    }

    #[test]
    fn parallel_workers_report_the_earliest_error() {
        let structure = json!({"a": 1, "b": 2, "c": 3, "d": 4});
        let paths = vec![path!["a"], path!["x"], path!["c"], path!["y"]];
        let err = Fuzzer::with_threads(4)
            .leaf_substitutions(&structure, &paths, &json!(0))
            .unwrap_err();
        assert_eq!(err.path(), &path!["x"]);
    }

    #[test]
    fn zero_threads_means_one() {
        assert_eq!(Fuzzer::with_threads(0).threads(), 1);
        assert_eq!(Fuzzer::default().threads(), 1);
    }

    #[test]
    fn generators_dispatch_to_their_batch() {
        let structure = duplicated_list();
        let paths = duplicated_list_paths();
        let fuzzer = Fuzzer::new();
        let generators: Vec<Box<dyn PayloadGenerator>> = vec![
            Box::new(LeafSubstitution::new(json!("PAYLOAD"))),
            Box::new(StructuralSubstitution::new(json!("STRUCTURE PAYLOAD"))),
            Box::new(MissingAttribute),
        ];

        let kinds: Vec<BatchKind> = generators.iter().map(|generator| generator.kind()).collect();
        assert_eq!(kinds, BatchKind::ALL);

        let counts: Vec<usize> = generators
            .iter()
            .map(|generator| generator.generate(&fuzzer, &structure, &paths).unwrap().len())
            .collect();
        // The two list elements are identical, so removing either one is the
        // same payload.
        assert_eq!(counts, vec![4, 6, 9]);
    }

    #[test]
    fn batch_kind_parses_from_its_name() {
        for kind in BatchKind::ALL {
            assert_eq!(kind.to_string().parse::<BatchKind>().unwrap(), kind);
        }
        assert!("everything".parse::<BatchKind>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn deduplicated_batches_have_no_equal_pairs(structure in json_value_strategy()) {
            let paths = map_structure(&structure);
            let fuzzer = Fuzzer::new();
            let value = json!("X");

            let structural = fuzzer.structural_substitutions(&structure, &paths, &value).unwrap();
            let missing = fuzzer.missing_attribute_permutations(&structure, &paths).unwrap();

            for batch in [&structural, &missing] {
                for (position, payload) in batch.iter().enumerate() {
                    prop_assert!(!batch[position + 1..].contains(payload));
                }
            }

            for payload in &structural {
                let reproducible = paths.iter().any(|path| {
                    injector::expand_ancestors(&structure, path, &value)
                        .unwrap()
                        .contains(payload)
                });
                prop_assert!(reproducible);
            }
            for payload in &missing {
                let reproducible = paths.iter().any(|path| {
                    injector::expand_missing(&structure, path).unwrap().contains(payload)
                });
                prop_assert!(reproducible);
            }
        }
    }
}
