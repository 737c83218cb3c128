//! async-trial - asynchronous test-case execution engine
//!
//! ## Usage
//!
//! ```bash
//! # Run the demonstration suite
//! async-trial demo
//!
//! # Shorter timeouts, JSON output, stop at the first problem
//! async-trial demo --timeout 0.5 --format json --fail-fast
//!
//! # Write and inspect configuration
//! async-trial config init
//! async-trial config show --env
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::info;

mod cli;

use async_trial::config::{EnvConfig, RunnerConfig, Scope, ScopeLevel};
use async_trial::demos;
use async_trial::executor::run_suite;
use async_trial::output::{OutputFormat, ResultFormatter};
use async_trial::utils::logger::{init_logger, LogLevel};
use cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    match args.command {
        cli::Command::Demo(demo_args) => {
            let config = RunnerConfig::resolve(demo_args.config.as_deref().map(Path::new), &env)?;
            init_logging(args.verbose, &config);
            run_demo(demo_args, config)?;
        }
        cli::Command::Config(config_args) => {
            init_logging(args.verbose, &RunnerConfig::default().with_env(&env));
            manage_config(config_args, &env)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, config: &RunnerConfig) {
    if !init_logger(LogLevel::for_run(config, verbose)) {
        eprintln!("Logger was already initialized");
    }
}

fn run_demo(args: cli::DemoArgs, mut config: RunnerConfig) -> Result<()> {
    if let Some(timeout) = args.timeout {
        config.default_timeout_secs = timeout;
    }
    config.fail_fast |= args.fail_fast;

    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", args.format))?;
    let mut formatter = ResultFormatter::new(format);
    if args.no_color {
        formatter = formatter.no_color();
    }

    info!(
        "Running demo suite (timeout {}s, fail fast: {})",
        config.default_timeout_secs, config.fail_fast
    );
    let summary = run_suite(config, demos::suite())?;
    println!("{}", formatter.format_summary(&summary));

    Ok(())
}

fn manage_config(args: cli::ConfigArgs, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            let config = RunnerConfig {
                scopes: vec![Scope::new(ScopeLevel::Package, "tests").with_timeout(30)],
                ..RunnerConfig::default()
            };
            config.save(path)?;
            println!("✓ Configuration file created: {output}");
        }

        cli::ConfigAction::Show { env: show_env, format } => {
            if show_env {
                env.print_summary();
            } else {
                let config = RunnerConfig::resolve(None, env)?;
                let output = if format == "json" {
                    serde_json::to_string_pretty(&config)?
                } else {
                    serde_yaml::to_string(&config)?
                };
                println!("{output}");
            }
        }

        cli::ConfigAction::Validate { file } => {
            let path = file.unwrap_or_else(|| {
                RunnerConfig::find()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_else(|| "./async-trial.yaml".to_string())
            });

            match RunnerConfig::load(&path) {
                Ok(_) => {
                    println!("✓ Configuration file is valid: {path}");
                }
                Err(e) => {
                    println!("✗ Configuration file is invalid: {path}");
                    println!("  Error: {e}");
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}
