//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Asynchronous test-case execution engine
#[derive(Parser, Debug)]
#[command(name = "async-trial")]
#[command(version = "0.1.0")]
#[command(about = "Run asynchronous tests with fixtures, cleanups and timeouts")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the built-in demonstration suite
    Demo(DemoArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for demo command
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Output format (table, json, json-pretty, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Default per-phase timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Stop at the first failing test
    #[arg(long)]
    pub fail_fast: bool,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./async-trial.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Show environment variables instead
        #[arg(short, long)]
        env: bool,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file (defaults to the discovered one)
        file: Option<String>,
    },
}
