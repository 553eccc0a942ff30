//! The `build-env` command

use deploy_manifest::{BuildEnvRequest, DeployContext, ResourceResolver, build_env};

use crate::cli::BuildEnvArgs;
use crate::error::Result;

/// Print the build environment of the requested stage to stdout.
pub fn run_build_env(args: &BuildEnvArgs) -> Result<()> {
    let root = args.stage.root()?;
    let loaded = args.stage.load(&root)?;

    // The process environment is written once, before any runtime threads exist.
    let exported = loaded.export_missing();
    tracing::debug!(exported = ?exported, "Exported stage environment");

    let mut context = DeployContext::new(&root, &args.stage.stage, &args.release);
    if let Some(version) = &args.app_version {
        context = context.with_version(version);
    }
    let mut request = BuildEnvRequest::new(context);
    if let Some(container) = &args.container {
        request = request.with_container(container);
    }
    if let Some(target) = &args.target {
        request = request.with_target(target);
    }

    let resolver = ResourceResolver::new(&root);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(build_env(&loaded, &request, &resolver))?;

    print!("{}", output.render_ini());
    Ok(())
}
