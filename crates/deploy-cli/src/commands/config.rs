//! The `config` command

use crate::cli::StageArgs;
use crate::error::Result;

/// Print the resolved config tree of a stage.
pub fn run_config(args: &StageArgs, json: bool) -> Result<()> {
    let root = args.root()?;
    let loaded = args.load(&root)?;
    tracing::debug!(
        source = %loaded.source().display(),
        variables = loaded.environment().len(),
        "Loaded stage"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&loaded.tree().to_json())?);
    } else {
        print!("{}", serde_yaml::to_string(loaded.tree())?);
    }
    Ok(())
}
