//! Stage configuration loading
//!
//! The config document is a YAML file with a top-level `stages` map. The
//! selected stage's tree is combined with its environment sources and the
//! resulting [`EnvironmentDict`] is folded back into the tree via
//! [`merge_env_into`].
//!
//! ```yaml
//! stages:
//!   prod:
//!     environment:
//!       LOG_LEVEL: info
//!     env_files: [.env.prod]
//!     ecs-deploy:
//!       region: us-east-1
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value as YamlValue;

use crate::env::{EnvLayers, EnvironmentDict, Precedence, export_missing, read_env_file};
use crate::path_merge::{PathMergeOptions, merge_env_into};
use crate::tree::{ConfigNode, ConfigTree, Scalar};
use crate::{Error, Result};

/// Config file used when neither the caller nor `CONFIG_FILE` names one
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Environment variable that overrides the config file name
pub const CONFIG_FILE_VAR: &str = "CONFIG_FILE";

/// Reserved key holding the stage's embedded environment
pub const ENVIRONMENT_KEY: &str = "environment";

/// Reserved key listing dotenv files
pub const ENV_FILES_KEY: &str = "env_files";

/// Loads one stage of a config document
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
    file_name: Option<String>,
    precedence: Precedence,
    merge_options: PathMergeOptions,
    process_env: Option<EnvironmentDict>,
}

impl ConfigLoader {
    /// Create a loader for documents under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file_name: None,
            precedence: Precedence::default(),
            merge_options: PathMergeOptions::default(),
            process_env: None,
        }
    }

    /// Use an explicit config file name instead of `CONFIG_FILE` / the default
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn with_merge_options(mut self, options: PathMergeOptions) -> Self {
        self.merge_options = options;
        self
    }

    /// Use `env` in place of the live process environment.
    pub fn with_process_env(mut self, env: EnvironmentDict) -> Self {
        self.process_env = Some(env);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load `stage`, apply its environment sources and return the merged tree
    /// together with the flattened environment.
    pub fn load(&self, stage: &str) -> Result<LoadedConfig> {
        if stage.is_empty() {
            return Err(Error::StageNotDefined);
        }

        let process = self
            .process_env
            .clone()
            .unwrap_or_else(EnvironmentDict::from_process);

        let file_name = self
            .file_name
            .clone()
            .or_else(|| process.get(CONFIG_FILE_VAR).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
        let path = self.root.join(&file_name);

        let document = read_yaml(&path)?;
        let stage_value = document
            .get("stages")
            .and_then(|stages| stages.get(stage))
            .cloned()
            .ok_or_else(|| Error::ConfigStageMissing {
                stage: stage.to_string(),
                path: path.clone(),
            })?;
        let tree = ConfigTree::from_yaml(stage_value, &format!("stages.{stage}"))?;
        tracing::debug!(stage, path = %path.display(), keys = tree.len(), "Loaded stage tree");

        let mut layers = EnvLayers {
            embedded: embedded_environment(&tree)?,
            files: Vec::new(),
            process,
        };
        for env_file in env_files(&tree)? {
            let contents = read_env_file(&self.root, &env_file)?;
            layers.files.push((self.root.join(&env_file), contents));
        }

        let environment = layers.resolve(&self.precedence);
        let tree = merge_env_into(&tree, &environment, &self.merge_options)?;

        Ok(LoadedConfig {
            stage: stage.to_string(),
            source: path,
            tree,
            environment,
        })
    }
}

/// Result of loading a stage
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    stage: String,
    source: PathBuf,
    tree: ConfigTree,
    environment: EnvironmentDict,
}

impl LoadedConfig {
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Path of the config document this stage came from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Stage tree with environment overrides applied
    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn environment(&self) -> &EnvironmentDict {
        &self.environment
    }

    /// Subtree stored under `key`, falling back to the whole stage tree when
    /// the stage has no such branch.
    pub fn section(&self, key: &str) -> &ConfigTree {
        match self.tree.get(key) {
            Some(ConfigNode::Branch(section)) => section,
            _ => &self.tree,
        }
    }

    /// Write environment entries that are unset in the process environment.
    /// See [`export_missing`].
    pub fn export_missing(&self) -> Vec<String> {
        export_missing(&self.environment)
    }
}

/// Load `stage` from `root/file_name` using the live process environment.
pub fn load_config(root: &Path, stage: &str, file_name: Option<&str>) -> Result<LoadedConfig> {
    let mut loader = ConfigLoader::new(root);
    if let Some(name) = file_name {
        loader = loader.with_file_name(name);
    }
    loader.load(stage)
}

/// Parse a YAML document (1.1 style merge keys expanded).
pub fn read_yaml(path: &Path) -> Result<YamlValue> {
    if !path.is_file() {
        return Err(Error::ConfigFileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let mut value: YamlValue = serde_yaml::from_str(&content).map_err(|e| Error::YamlParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    value.apply_merge().map_err(|e| Error::YamlParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(value)
}

fn embedded_environment(tree: &ConfigTree) -> Result<EnvironmentDict> {
    let mut env = EnvironmentDict::new();
    match tree.get(ENVIRONMENT_KEY) {
        None | Some(ConfigNode::Leaf(Scalar::Null)) => {}
        Some(ConfigNode::Branch(block)) => {
            for (key, node) in block {
                match node {
                    ConfigNode::Leaf(scalar) => {
                        env.insert(key.clone(), scalar.to_env_string());
                    }
                    other => {
                        return Err(Error::InvalidReservedBlock {
                            key: ENVIRONMENT_KEY.to_string(),
                            message: format!("{key} must be a scalar, found a {}", other.kind()),
                        });
                    }
                }
            }
        }
        Some(other) => {
            return Err(Error::InvalidReservedBlock {
                key: ENVIRONMENT_KEY.to_string(),
                message: format!("expected a mapping, found a {}", other.kind()),
            });
        }
    }
    Ok(env)
}

fn env_files(tree: &ConfigTree) -> Result<Vec<String>> {
    let invalid = |message: String| Error::InvalidReservedBlock {
        key: ENV_FILES_KEY.to_string(),
        message,
    };

    match tree.get(ENV_FILES_KEY) {
        None | Some(ConfigNode::Leaf(Scalar::Null)) => Ok(Vec::new()),
        Some(ConfigNode::List(items)) => items
            .iter()
            .map(|item| match item {
                ConfigNode::Leaf(Scalar::String(file)) => Ok(file.clone()),
                other => Err(invalid(format!(
                    "entries must be file paths, found a {}",
                    other.kind()
                ))),
            })
            .collect(),
        Some(other) => Err(invalid(format!(
            "expected a sequence, found a {}",
            other.kind()
        ))),
    }
}
