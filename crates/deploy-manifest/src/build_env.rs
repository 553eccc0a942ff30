//! Build and deploy environment for one stage
//!
//! Produces the flat variables a CI job sources before running
//! `docker build` and registering the task definition.

use deploy_config::LoadedConfig;

use crate::assembler::ManifestAssembler;
use crate::build_args::resolve_build_args;
use crate::context::DeployContext;
use crate::image::ecr_image_uri;
use crate::output::EnvOutput;
use crate::resource::ResourceResolver;
use crate::schema::{DEPLOY_SECTION, DeployConfig};
use crate::{Error, Result};

/// Prefix of environment entries passed through to the output
pub const DOCKER_PREFIX: &str = "DOCKER_";

/// Prefix of emitted build arguments
pub const BUILD_ARG_PREFIX: &str = "ECS_DEPLOY_DOCKER_ARGS_";

/// What to build and deploy
#[derive(Debug, Clone)]
pub struct BuildEnvRequest {
    pub context: DeployContext,
    /// Build item to emit image variables for
    pub container: Option<String>,
    /// Task definition to assemble
    pub target: Option<String>,
}

impl BuildEnvRequest {
    pub fn new(context: DeployContext) -> Self {
        Self {
            context,
            container: None,
            target: None,
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Compute the build environment of `request` from a loaded stage.
pub async fn build_env(
    loaded: &LoadedConfig,
    request: &BuildEnvRequest,
    resolver: &ResourceResolver,
) -> Result<EnvOutput> {
    let deploy = DeployConfig::from_tree(loaded.section(DEPLOY_SECTION))?;
    let context = &request.context;
    let mut out = EnvOutput::new();

    for (key, value) in loaded.environment() {
        if key.starts_with(DOCKER_PREFIX) {
            out.set(key, value);
        }
    }

    out.set("IMAGE_TAG", &context.release);

    let item = request
        .container
        .as_deref()
        .and_then(|name| deploy.find_build_item(name));
    if let (Some(name), None) = (&request.container, item) {
        tracing::warn!(container = %name, "No build item with this name");
    }

    let stage_scope = || format!("stage {}", context.stage);
    let account_id = item
        .and_then(|item| item.account_id.clone())
        .or_else(|| deploy.account_id.clone())
        .ok_or_else(|| Error::missing("accountId", stage_scope()))?;
    out.set("ACCOUNT_ID", &account_id);

    let region = item
        .and_then(|item| item.region.clone())
        .or_else(|| deploy.region.clone())
        .ok_or_else(|| Error::missing("region", stage_scope()))?;
    out.set("AWS_REGION", &region);

    let repo_name = match (item, &request.container) {
        (Some(item), _) => item.repo_name()?,
        (None, Some(name)) => return Err(Error::missing("repoName", format!("no build item {name}"))),
        (None, None) => return Err(Error::missing("repoName", "no container selected")),
    };
    out.set("ECR_REPOSITORY", repo_name);
    out.set(
        "IMAGE_URL",
        ecr_image_uri(&account_id, &region, repo_name, &context.release),
    );

    if let Some(item) = item {
        out.set("ECR_DEPLOY_CONTAINER", &item.name);
        for (key, value) in resolve_build_args(context, &region, item) {
            out.set(format!("{BUILD_ARG_PREFIX}{key}"), value);
        }
        if let Some(dockerfile) = &item.dockerfile {
            out.set("ECR_DEPLOY_DOCKER_FILE", dockerfile);
        }
        if let Some(platform) = &item.platform {
            out.set("ECR_DEPLOY_PLATFORM", platform);
        }
    }

    let Some(target) = &request.target else {
        return Ok(out);
    };
    out.set("ECS_DEPLOY_TARGET", target);
    if deploy.task_definition.is_empty() {
        tracing::debug!(task = %target, "No task definitions configured");
        return Ok(out);
    }

    let scoped = DeployConfig {
        account_id: Some(account_id),
        region: Some(region),
        ..deploy
    };
    let manifest = ManifestAssembler::new(context, &scoped)
        .assemble_target(resolver, target)
        .await?;

    if let Some(family) = &manifest.task_family {
        out.set("ECS_TASK_FAMILY", family);
    }
    if let Some(service) = &manifest.service_name {
        out.set("ECS_SERVICE_NAME", service);
    }
    if let Some(cluster) = &manifest.cluster_name {
        out.set("ECS_CLUSTER_NAME", cluster);
    }
    out.set("ECS_TASK_DEFINITION", manifest.to_json_string()?);

    Ok(out)
}
