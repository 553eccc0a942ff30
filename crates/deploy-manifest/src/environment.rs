//! Per-container environment
//!
//! Tiers, lowest first:
//!
//! 1. the template container's `environment` pairs
//! 2. the configured container's `environment` map
//! 3. the configured container's `envFiles`, in order
//!
//! Configured values go through placeholder substitution; template values
//! were substituted when the template was resolved.

use deploy_config::{EnvironmentDict, read_env_file};

use crate::context::DeployContext;
use crate::schema::ContainerConfig;
use crate::substitute::STAGE;
use crate::template::TemplateContainer;
use crate::{Error, Result};

/// Computes the environment of one container
#[derive(Debug, Clone)]
pub struct ContainerEnvironmentResolver<'a> {
    context: &'a DeployContext,
    region: &'a str,
    account_id: &'a str,
}

impl<'a> ContainerEnvironmentResolver<'a> {
    pub fn new(context: &'a DeployContext, region: &'a str, account_id: &'a str) -> Self {
        Self {
            context,
            region,
            account_id,
        }
    }

    /// Environment for `config` applied over `template`.
    ///
    /// `STAGE` and `VERSION` are not written here. A `STAGE` already present
    /// that names a different stage is a [`Error::StageMismatch`].
    pub fn resolve(
        &self,
        template: &TemplateContainer,
        config: &ContainerConfig,
    ) -> Result<EnvironmentDict> {
        let mut subs = self
            .context
            .substitutions()
            .region(self.region)
            .account_id(self.account_id);
        if let Some(image) = &template.image {
            subs = subs.image_url(image);
        }

        let mut env: EnvironmentDict = template
            .environment()
            .iter()
            .filter(|pair| !pair.name.is_empty())
            .map(|pair| (pair.name.as_str(), pair.value.clone()))
            .collect();

        for (key, value) in &config.environment {
            env.insert(key, subs.apply(value));
        }

        for file in &config.env_files {
            let file = subs.apply(file);
            let values = read_env_file(self.context.root(), &file)?;
            tracing::debug!(container = %config.name, file = %file, count = values.len(), "Applying container env file");
            for (key, value) in values {
                env.insert(key, subs.apply(&value));
            }
        }

        if let Some(found) = env.get(STAGE)
            && !found.is_empty()
            && found != self.context.stage
        {
            return Err(Error::StageMismatch {
                container: config.name.clone(),
                requested: self.context.stage.clone(),
                found: found.to_string(),
            });
        }

        Ok(env)
    }
}
