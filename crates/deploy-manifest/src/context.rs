use std::path::{Path, PathBuf};

use crate::substitute::Substitutions;

/// Invocation-wide values shared by every resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployContext {
    /// Project directory; relative template and env file paths resolve here
    pub root: PathBuf,
    pub stage: String,
    pub release: String,
    /// Application version written to each container as `VERSION`
    pub version: Option<String>,
}

impl DeployContext {
    pub fn new(root: impl Into<PathBuf>, stage: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            stage: stage.into(),
            release: release.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `${STAGE}`, `${RELEASE}` and `${PWD}`. Callers add region, account and
    /// image as they become known.
    pub fn substitutions(&self) -> Substitutions {
        Substitutions::new()
            .stage(&self.stage)
            .release(&self.release)
            .working_dir(self.root.display().to_string())
    }
}
