//! Stage configuration for ecs-deploy
//!
//! This crate turns a multi-stage YAML config document into:
//!
//! - **a config tree** for one stage ([`ConfigTree`]), with
//! - **an environment dict** ([`EnvironmentDict`]) built from the stage's
//!   `environment` block, its `env_files` and the process environment, and
//! - **path overrides** folded in from delimiter-encoded environment keys
//!   (`app__db__host=...` sets `db.host`).
//!
//! # Example
//!
//! ```no_run
//! use deploy_config::ConfigLoader;
//!
//! let loaded = ConfigLoader::new("/path/to/project").load("prod")?;
//! println!("{} env vars", loaded.environment().len());
//! # Ok::<(), deploy_config::Error>(())
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod path_merge;
pub mod tree;

pub use env::{EnvLayers, EnvSource, EnvironmentDict, Precedence, export_missing, read_env_file};
pub use error::{Error, Result};
pub use loader::{ConfigLoader, LoadedConfig, load_config, read_yaml};
pub use path_merge::{ConflictKind, PathMergeOptions, merge_env_into};
pub use tree::{ConfigNode, ConfigTree, Scalar};
