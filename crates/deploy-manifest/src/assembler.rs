//! Task-definition manifest assembly
//!
//! The assembler takes a resolved template document and rewrites the
//! containers named in the task-definition config:
//!
//! 1. the template container must exist
//! 2. a configured image is resolved against the build items
//! 3. the environment is recomputed, `STAGE` and `VERSION` forced, and the
//!    list replaced with name-sorted pairs
//! 4. secrets are merged with configured overrides and expanded to ARNs
//!
//! Any failure aborts the whole manifest.

use serde_json::Value;

use crate::context::DeployContext;
use crate::environment::ContainerEnvironmentResolver;
use crate::image::resolve_image;
use crate::resource::ResourceResolver;
use crate::schema::{DeployConfig, TaskDefinitionConfig};
use crate::secrets::merge_secrets;
use crate::substitute::{STAGE, Substitutions};
use crate::template::{KeyValuePair, TaskDefinitionDocument};
use crate::{Error, Result};

/// Name of the per-container application version variable
pub const VERSION: &str = "VERSION";

/// An assembled task definition and where to deploy it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedManifest {
    pub document: TaskDefinitionDocument,
    pub task_family: Option<String>,
    pub service_name: Option<String>,
    pub cluster_name: Option<String>,
}

impl ResolvedManifest {
    /// Compact JSON of the document
    pub fn to_json_string(&self) -> Result<String> {
        self.document.to_json_string()
    }
}

/// Assembles manifests for one stage's deploy config
#[derive(Debug, Clone)]
pub struct ManifestAssembler<'a> {
    context: &'a DeployContext,
    config: &'a DeployConfig,
}

impl<'a> ManifestAssembler<'a> {
    pub fn new(context: &'a DeployContext, config: &'a DeployConfig) -> Self {
        Self { context, config }
    }

    fn account_id(&self) -> Result<&'a str> {
        self.config
            .account_id
            .as_deref()
            .ok_or_else(|| Error::missing("accountId", format!("stage {}", self.context.stage)))
    }

    fn region(&self) -> Result<&'a str> {
        self.config
            .region
            .as_deref()
            .ok_or_else(|| Error::missing("region", format!("stage {}", self.context.stage)))
    }

    /// Substitution values for templates of this stage
    pub fn substitutions(&self) -> Result<Substitutions> {
        Ok(self
            .context
            .substitutions()
            .region(self.region()?)
            .account_id(self.account_id()?))
    }

    /// Resolve the template of `target` and assemble it.
    pub async fn assemble_target(
        &self,
        resolver: &ResourceResolver,
        target: &str,
    ) -> Result<ResolvedManifest> {
        let task_definition = self.config.find_task_definition(target)?;
        let template = resolver
            .resolve(&task_definition.template, &self.substitutions()?)
            .await?;
        self.assemble(task_definition, template)
    }

    /// Rewrite `template` according to `task_definition`.
    pub fn assemble(
        &self,
        task_definition: &TaskDefinitionConfig,
        template: Value,
    ) -> Result<ResolvedManifest> {
        let account_id = self.account_id()?;
        let region = self.region()?;
        let target = task_definition.label();

        let mut document = TaskDefinitionDocument::from_value(template)
            .map_err(|e| Error::template(task_definition.template.describe(), e.to_string()))?;
        let environment = ContainerEnvironmentResolver::new(self.context, region, account_id);

        for config in &task_definition.container_definitions {
            let container = document.container_mut(&config.name).ok_or_else(|| {
                Error::ContainerNotFoundInTemplate {
                    container: config.name.clone(),
                    target: target.to_string(),
                }
            })?;

            if let Some(image_ref) = &config.image {
                container.image = Some(resolve_image(
                    image_ref,
                    &self.config.build,
                    account_id,
                    region,
                    &self.context.release,
                )?);
            }

            let mut env = environment.resolve(container, config)?;
            env.insert(STAGE, self.context.stage.as_str());
            if let Some(version) = &self.context.version {
                env.insert(VERSION, version.as_str());
            }
            container.environment = Some(
                env.iter()
                    .map(|(name, value)| KeyValuePair::new(name, value))
                    .collect(),
            );

            let secrets = merge_secrets(container.secrets(), &config.secrets, account_id, region);
            if !secrets.is_empty() || container.secrets.is_some() {
                container.secrets = Some(secrets);
            }

            tracing::debug!(
                task = target,
                container = %config.name,
                image = container.image.as_deref().unwrap_or_default(),
                "Resolved container"
            );
        }

        let task_family = task_definition
            .task_family
            .clone()
            .or_else(|| self.config.task_family.clone())
            .or_else(|| document.family.clone());
        if task_family.is_some() {
            document.family.clone_from(&task_family);
        }

        let manifest = ResolvedManifest {
            document,
            task_family,
            service_name: task_definition
                .service_name
                .clone()
                .or_else(|| self.config.service_name.clone()),
            cluster_name: task_definition
                .cluster_name
                .clone()
                .or_else(|| self.config.cluster_name.clone()),
        };

        tracing::info!(
            task = target,
            family = manifest.task_family.as_deref().unwrap_or_default(),
            containers = task_definition.container_definitions.len(),
            "Assembled task definition"
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ContainerConfig, TemplateRef};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn deploy_config() -> DeployConfig {
        DeployConfig {
            account_id: Some("111".into()),
            region: Some("us-east-1".into()),
            ..Default::default()
        }
    }

    fn task_definition(containers: Vec<ContainerConfig>) -> TaskDefinitionConfig {
        TaskDefinitionConfig {
            name: Some("web".into()),
            target: None,
            task_family: None,
            service_name: None,
            cluster_name: None,
            template: TemplateRef::Location("t.json".into()),
            container_definitions: containers,
        }
    }

    fn container(name: &str) -> ContainerConfig {
        ContainerConfig {
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn stage_and_version_are_forced() {
        let context = DeployContext::new("/srv", "prod", "r1").with_version("1.2.3");
        let config = deploy_config();
        let manifest = ManifestAssembler::new(&context, &config)
            .assemble(
                &task_definition(vec![container("app")]),
                json!({"containerDefinitions": [{"name": "app", "environment": [{"name": "Z", "value": "1"}]}]}),
            )
            .unwrap();

        let app = manifest.document.container("app").unwrap();
        assert_eq!(
            app.environment(),
            [
                KeyValuePair::new("STAGE", "prod"),
                KeyValuePair::new("VERSION", "1.2.3"),
                KeyValuePair::new("Z", "1"),
            ]
        );
    }

    #[test]
    fn version_is_omitted_when_not_supplied() {
        let context = DeployContext::new("/srv", "prod", "r1");
        let config = deploy_config();
        let manifest = ManifestAssembler::new(&context, &config)
            .assemble(
                &task_definition(vec![container("app")]),
                json!({"containerDefinitions": [{"name": "app"}]}),
            )
            .unwrap();
        let app = manifest.document.container("app").unwrap();
        assert_eq!(app.environment(), [KeyValuePair::new("STAGE", "prod")]);
        assert!(app.secrets.is_none());
    }

    #[test]
    fn unconfigured_containers_are_untouched() {
        let context = DeployContext::new("/srv", "prod", "r1");
        let config = deploy_config();
        let manifest = ManifestAssembler::new(&context, &config)
            .assemble(
                &task_definition(vec![]),
                json!({"containerDefinitions": [{"name": "sidecar", "image": "x"}]}),
            )
            .unwrap();
        assert_eq!(
            manifest.document.to_value().unwrap(),
            json!({"containerDefinitions": [{"name": "sidecar", "image": "x"}]})
        );
    }

    #[test]
    fn missing_region_fails() {
        let context = DeployContext::new("/srv", "prod", "r1");
        let config = DeployConfig {
            region: None,
            ..deploy_config()
        };
        let err = ManifestAssembler::new(&context, &config)
            .assemble(&task_definition(vec![]), json!({}))
            .unwrap_err();
        assert_eq!(err.to_string(), "region not defined (stage prod)");
    }

    #[test]
    fn family_falls_back_to_template() {
        let context = DeployContext::new("/srv", "prod", "r1");
        let config = deploy_config();
        let manifest = ManifestAssembler::new(&context, &config)
            .assemble(&task_definition(vec![]), json!({"family": "from-template"}))
            .unwrap();
        assert_eq!(manifest.task_family.as_deref(), Some("from-template"));
        assert_eq!(manifest.service_name, None);
    }

    #[test]
    fn malformed_template_is_a_resolution_error() {
        let context = DeployContext::new("/srv", "prod", "r1");
        let config = deploy_config();
        let err = ManifestAssembler::new(&context, &config)
            .assemble(&task_definition(vec![]), json!({"containerDefinitions": "nope"}))
            .unwrap_err();
        assert!(matches!(err, Error::TemplateResolution { ref reference, .. } if reference == "t.json"));
    }
}
