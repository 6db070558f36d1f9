// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oneclick")]
#[command(about = "One-click application template deployment for CapRover-style platforms")]
#[command(version)]
pub struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new oneclick.yml configuration file
    Init {
        /// Platform API endpoint (http://host:port)
        #[arg(long)]
        endpoint: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Validate a template and show the services it resolves to
    Check {
        #[command(flatten)]
        input: TemplateInput,

        /// Root domain to substitute (defaults to the configured one)
        #[arg(long)]
        root_domain: Option<String>,
    },

    /// Deploy a template to the configured platform
    Deploy {
        #[command(flatten)]
        input: TemplateInput,
    },

    /// List the apps published by the one-click app repository
    List {
        /// Repository URL (defaults to the configured or public one)
        #[arg(long, value_name = "URL")]
        repository: Option<String>,
    },
}

#[derive(Args)]
pub struct TemplateInput {
    /// Template file (.json or .yml)
    #[arg(required_unless_present = "app")]
    pub template: Option<PathBuf>,

    /// Fetch the template published under this name from the repository
    #[arg(long, value_name = "NAME", conflicts_with = "template")]
    pub app: Option<String>,

    /// Repository URL used with --app (defaults to the configured or public one)
    #[arg(long, value_name = "URL", requires = "app")]
    pub repository: Option<String>,

    /// Name of the application to create
    #[arg(short, long)]
    pub app_name: String,

    /// Variable value, e.g. --set cap_pg_version=13
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    pub values: Vec<String>,
}
