//! Delimiter-path expansion of environment variables into the config tree
//!
//! An environment key such as `app__db__host=localhost` addresses the tree
//! path `db.host`. The leading prefix segment gates which keys participate;
//! everything else in the environment is ignored.
//!
//! Merging never changes the shape of the tree: a scalar cannot replace a
//! mapping or a sequence, and a path cannot be walked through a scalar or a
//! sequence. Such keys fail with [`Error::StructureConflict`].
//!
//! # Example
//!
//! ```
//! use deploy_config::{EnvironmentDict, PathMergeOptions, merge_env_into};
//! use deploy_config::tree::{ConfigNode, ConfigTree};
//!
//! let env: EnvironmentDict = [("app__db__host", "localhost"), ("PATH", "/bin")]
//!     .into_iter()
//!     .collect();
//! let merged = merge_env_into(&ConfigTree::new(), &env, &PathMergeOptions::default()).unwrap();
//! assert_eq!(merged.lookup(&["db", "host"]).and_then(ConfigNode::as_str), Some("localhost"));
//! assert_eq!(merged.len(), 1);
//! ```

use std::fmt;

use crate::env::EnvironmentDict;
use crate::tree::{ConfigNode, ConfigTree, Scalar};
use crate::{Error, Result};

/// Prefix segment required on participating keys
pub const DEFAULT_PREFIX: &str = "app";

/// Segment delimiter
pub const DEFAULT_DELIMITER: &str = "__";

/// Top-level keys that environment overrides may never address
pub const RESERVED_ROOTS: [&str; 2] = ["environment", "env_files"];

/// The structural rule an environment key tried to break
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Final segment holds a mapping
    OverrideSubtree,
    /// Final segment holds a sequence
    OverrideSequence,
    /// An intermediate segment holds a scalar
    DescendIntoScalar,
    /// An intermediate segment holds a sequence
    DescendIntoSequence,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConflictKind::OverrideSubtree => "override config structure",
            ConflictKind::OverrideSequence => "override config array",
            ConflictKind::DescendIntoScalar => "change config structure",
            ConflictKind::DescendIntoSequence => "change config array",
        };
        f.write_str(text)
    }
}

/// How flat keys are mapped onto tree paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMergeOptions {
    /// Required first segment. `None` lets every delimited key through.
    pub prefix: Option<String>,
    pub delimiter: String,
    pub reserved_roots: Vec<String>,
}

impl Default for PathMergeOptions {
    fn default() -> Self {
        Self {
            prefix: Some(DEFAULT_PREFIX.to_string()),
            delimiter: DEFAULT_DELIMITER.to_string(),
            reserved_roots: RESERVED_ROOTS.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl PathMergeOptions {
    pub fn with_prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self
    }

    pub fn with_delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = delimiter.to_string();
        self
    }

    /// Tree path addressed by `key`, or `None` when the key does not take part.
    ///
    /// Only the first remaining segment is checked against the reserved
    /// roots, so `app__x__environment` still addresses `x.environment`.
    pub fn target_path<'k>(&self, key: &'k str) -> Option<Vec<&'k str>> {
        let delimiter = self.delimiter.as_str();
        if delimiter.is_empty() || key.starts_with(delimiter) || key.ends_with(delimiter) {
            return None;
        }

        let mut segments = key.split(delimiter);
        if let Some(prefix) = &self.prefix {
            if segments.next() != Some(prefix.as_str()) {
                return None;
            }
        }

        let segments: Vec<&str> = segments.collect();
        let first = *segments.first()?;
        if first.is_empty() || self.reserved_roots.iter().any(|root| root == first) {
            return None;
        }
        Some(segments)
    }
}

/// Fold every participating key of `env` into a copy of `tree`.
///
/// The input tree is left untouched; on error no partially merged tree
/// escapes.
pub fn merge_env_into(
    tree: &ConfigTree,
    env: &EnvironmentDict,
    options: &PathMergeOptions,
) -> Result<ConfigTree> {
    let mut merged = tree.clone();
    let mut applied = 0usize;

    for (key, value) in env {
        let Some(path) = options.target_path(key) else {
            continue;
        };
        set_leaf(&mut merged, key, &path, value)?;
        applied += 1;
    }

    tracing::debug!(applied, "Merged environment overrides into config tree");
    Ok(merged)
}

fn set_leaf(tree: &mut ConfigTree, key: &str, path: &[&str], value: &str) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        return Ok(());
    };

    let conflict = |depth: usize, kind: ConflictKind| Error::StructureConflict {
        key: key.to_string(),
        path: path[..=depth].join("."),
        kind,
    };

    let mut cursor = tree;
    for (depth, segment) in parents.iter().enumerate() {
        let node = cursor
            .entry((*segment).to_string())
            .or_insert_with(|| ConfigNode::Branch(ConfigTree::new()));
        cursor = match node {
            ConfigNode::Branch(child) => child,
            ConfigNode::Leaf(_) => return Err(conflict(depth, ConflictKind::DescendIntoScalar)),
            ConfigNode::List(_) => return Err(conflict(depth, ConflictKind::DescendIntoSequence)),
        };
    }

    match cursor.get(last) {
        Some(ConfigNode::Branch(_)) => {
            return Err(conflict(parents.len(), ConflictKind::OverrideSubtree));
        }
        Some(ConfigNode::List(_)) => {
            return Err(conflict(parents.len(), ConflictKind::OverrideSequence));
        }
        Some(ConfigNode::Leaf(_)) | None => {}
    }

    cursor.insert(*last, ConfigNode::Leaf(Scalar::String(value.to_string())));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn env(pairs: &[(&str, &str)]) -> EnvironmentDict {
        pairs.iter().copied().collect()
    }

    fn tree(yaml: &str) -> ConfigTree {
        ConfigTree::from_yaml_str(yaml).unwrap()
    }

    #[rstest]
    #[case("app__a__b", Some(vec!["a", "b"]))]
    #[case("app__a", Some(vec!["a"]))]
    #[case("__app__a", None)]
    #[case("app__a__", None)]
    #[case("other__a", None)]
    #[case("app", None)]
    #[case("PATH", None)]
    #[case("app__environment__X", None)]
    #[case("app__env_files", None)]
    #[case("app__x__environment", Some(vec!["x", "environment"]))]
    fn target_path_with_default_prefix(#[case] key: &str, #[case] expected: Option<Vec<&str>>) {
        assert_eq!(PathMergeOptions::default().target_path(key), expected);
    }

    #[test]
    fn target_path_without_prefix_uses_all_segments() {
        let options = PathMergeOptions::default().with_prefix(None);
        assert_eq!(options.target_path("db__host"), Some(vec!["db", "host"]));
        assert_eq!(options.target_path("environment__X"), None);
    }

    #[test]
    fn custom_delimiter() {
        let options = PathMergeOptions::default().with_delimiter(".");
        assert_eq!(options.target_path("app.a.b"), Some(vec!["a", "b"]));
        assert_eq!(options.target_path("app__a__b"), None);
    }

    #[test]
    fn expands_into_empty_tree() {
        let merged = merge_env_into(
            &ConfigTree::new(),
            &env(&[("app__a__b", "v")]),
            &PathMergeOptions::default(),
        )
        .unwrap();
        assert_eq!(merged.to_json(), serde_json::json!({"a": {"b": "v"}}));
    }

    #[test]
    fn scalar_is_overwritten() {
        let merged = merge_env_into(
            &tree("a:\n  b: x\n  c: keep\n"),
            &env(&[("app__a__b", "y")]),
            &PathMergeOptions::default(),
        )
        .unwrap();
        assert_eq!(
            merged.to_json(),
            serde_json::json!({"a": {"b": "y", "c": "keep"}})
        );
    }

    #[rstest]
    #[case("a:\n  b: x\n", "app__a__b__c", ConflictKind::DescendIntoScalar, "a.b")]
    #[case("a:\n  b:\n    c: x\n", "app__a__b", ConflictKind::OverrideSubtree, "a.b")]
    #[case("a:\n  - x\n", "app__a__b", ConflictKind::DescendIntoSequence, "a")]
    #[case("a:\n  - x\n", "app__a", ConflictKind::OverrideSequence, "a")]
    fn structure_conflicts(
        #[case] yaml: &str,
        #[case] key: &str,
        #[case] expected_kind: ConflictKind,
        #[case] expected_path: &str,
    ) {
        let err = merge_env_into(&tree(yaml), &env(&[(key, "z")]), &PathMergeOptions::default())
            .unwrap_err();
        match err {
            Error::StructureConflict { key: k, path, kind } => {
                assert_eq!(k, key);
                assert_eq!(path, expected_path);
                assert_eq!(kind, expected_kind);
            }
            other => panic!("expected StructureConflict, got {other:?}"),
        }
    }

    #[test]
    fn input_tree_is_not_mutated_on_conflict() {
        let original = tree("a:\n  b: x\n");
        let result = merge_env_into(
            &original,
            &env(&[("app__a__b__c", "z"), ("app__new__key", "v")]),
            &PathMergeOptions::default(),
        );
        assert!(result.is_err());
        assert_eq!(original, tree("a:\n  b: x\n"));
    }

    #[test]
    fn conflict_message_names_the_key() {
        let err = merge_env_into(
            &tree("a:\n  b:\n    c: x\n"),
            &env(&[("app__a__b", "z")]),
            &PathMergeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Tried to override config structure with env: app__a__b (at a.b)"
        );
    }
}
