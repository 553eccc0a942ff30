//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// ecs-deploy - Resolve stage config and assemble ECS task definitions
#[derive(Parser, Debug)]
#[command(name = "ecs-deploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (written to stderr)
    #[arg(
        short,
        long,
        global = true,
        env = "VERBOSE",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the build and deploy environment as KEY=value lines
    ///
    /// Examples:
    ///   ecs-deploy build-env --stage prod --release $GIT_SHA --container web
    ///   ecs-deploy build-env --stage prod --release $GIT_SHA --container web --target web
    BuildEnv(BuildEnvArgs),

    /// Print the resolved config tree of a stage
    Config {
        #[command(flatten)]
        stage: StageArgs,

        /// Output as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Selects a project and stage
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct StageArgs {
    /// Project directory (defaults to the current directory)
    #[arg(long, env = "PWD")]
    pub pwd: Option<PathBuf>,

    /// Stage to load
    #[arg(short, long, env = "STAGE")]
    pub stage: String,

    /// Config file name relative to the project directory
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct BuildEnvArgs {
    #[command(flatten)]
    pub stage: StageArgs,

    /// Release identifier used as the image tag
    #[arg(short, long, env = "RELEASE")]
    pub release: String,

    /// Build item to emit image variables for
    #[arg(short, long, env = "CONTAINER")]
    pub container: Option<String>,

    /// Task definition to assemble
    #[arg(short, long, env = "TARGET")]
    pub target: Option<String>,

    /// Application version written to each container as VERSION
    #[arg(long = "app-version", visible_alias = "ecs-version", env = "VERSION")]
    pub app_version: Option<String>,
}
