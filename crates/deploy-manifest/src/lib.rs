//! ECS task-definition assembly for ecs-deploy
//!
//! Given a loaded stage (see [`deploy_config`]), this crate:
//!
//! - deserializes the `ecs-deploy` section ([`DeployConfig`])
//! - resolves task-definition templates, inline, local or remote
//!   ([`ResourceResolver`])
//! - rewrites template containers with release images, per-container
//!   environment and expanded secret references ([`ManifestAssembler`])
//! - emits the flat build environment consumed by CI ([`build_env`])
//!
//! # Example
//!
//! ```no_run
//! use deploy_config::ConfigLoader;
//! use deploy_manifest::{BuildEnvRequest, DeployContext, ResourceResolver, build_env};
//!
//! # async fn run() -> deploy_manifest::Result<()> {
//! let loaded = ConfigLoader::new("/path/to/project").load("prod")?;
//! let request = BuildEnvRequest::new(DeployContext::new("/path/to/project", "prod", "abc123"))
//!     .with_container("web")
//!     .with_target("web");
//! let resolver = ResourceResolver::new("/path/to/project");
//! print!("{}", build_env(&loaded, &request, &resolver).await?);
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod build_args;
pub mod build_env;
pub mod context;
pub mod environment;
pub mod error;
pub mod image;
pub mod output;
pub mod resource;
pub mod schema;
pub mod secrets;
pub mod substitute;
pub mod template;

pub use assembler::{ManifestAssembler, ResolvedManifest};
pub use build_args::resolve_build_args;
pub use build_env::{BuildEnvRequest, build_env};
pub use context::DeployContext;
pub use environment::ContainerEnvironmentResolver;
pub use error::{Error, Result};
pub use image::{ecr_image_uri, resolve_image};
pub use output::EnvOutput;
pub use resource::{RemoteFetcher, ResourceResolver};
pub use schema::{BuildItem, ContainerConfig, DeployConfig, TaskDefinitionConfig, TemplateRef};
pub use secrets::{merge_secrets, resolve_ssm_path};
pub use substitute::Substitutions;
pub use template::{KeyValuePair, Secret, TaskDefinitionDocument, TemplateContainer};
