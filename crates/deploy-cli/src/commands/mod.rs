//! Command implementations for deploy-cli

pub mod build_env;
pub mod config;

pub use build_env::run_build_env;
pub use config::run_config;

use std::path::PathBuf;

use deploy_config::{ConfigLoader, LoadedConfig};

use crate::cli::StageArgs;
use crate::error::{CliError, Result};

impl StageArgs {
    /// Project directory, checked to exist
    pub fn root(&self) -> Result<PathBuf> {
        let root = match &self.pwd {
            Some(pwd) => pwd.clone(),
            None => std::env::current_dir()?,
        };
        if !root.is_dir() {
            return Err(CliError::user(format!(
                "Project directory {} does not exist",
                root.display()
            )));
        }
        Ok(root)
    }

    /// Load the selected stage from `root`.
    pub fn load(&self, root: &std::path::Path) -> Result<LoadedConfig> {
        let mut loader = ConfigLoader::new(root);
        if let Some(file_name) = &self.config_file {
            loader = loader.with_file_name(file_name);
        }
        Ok(loader.load(&self.stage)?)
    }
}
