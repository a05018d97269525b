pub mod backend;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod controller;
pub mod doctor;
pub mod error;
pub mod ledger;
pub mod media;
pub mod output;
pub mod runtime;
#[cfg(test)]
mod test_support;
pub mod timing;
pub mod ui;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::bootstrap::AppPaths;
use crate::cli::{Cli, Command};
use crate::config::{load_config, AppConfig};
use crate::doctor::run_doctor;
use crate::error::{AppError, AppResult};
use crate::runtime::{run_watch, status_report};

trait CommandExecutor {
    fn watch(
        &self,
        config: AppConfig,
        paths: AppPaths,
        video: std::path::PathBuf,
        exit_when_done: bool,
    ) -> AppResult<()>;
    fn doctor(&self, paths: &AppPaths, config: &AppConfig, json: bool) -> AppResult<()>;
    fn status(&self, paths: &AppPaths, config: &AppConfig) -> AppResult<()>;
}

struct DefaultCommandExecutor;

impl CommandExecutor for DefaultCommandExecutor {
    fn watch(
        &self,
        config: AppConfig,
        paths: AppPaths,
        video: std::path::PathBuf,
        exit_when_done: bool,
    ) -> AppResult<()> {
        run_watch(config, paths, video, exit_when_done)
    }

    fn doctor(&self, paths: &AppPaths, config: &AppConfig, json: bool) -> AppResult<()> {
        let report = run_doctor(paths, config);
        if json {
            println!("{}", report.render_json()?);
        } else {
            println!("{}", report.render_text());
        }
        if report.is_usable() {
            Ok(())
        } else {
            Err(AppError::Config(
                "environment is not usable for the selected backend".to_owned(),
            ))
        }
    }

    fn status(&self, paths: &AppPaths, config: &AppConfig) -> AppResult<()> {
        println!("{}", status_report(config, paths));
        Ok(())
    }
}

fn execute_command<E: CommandExecutor>(
    command: Command,
    paths: AppPaths,
    config: AppConfig,
    executor: &E,
) -> AppResult<()> {
    match command {
        Command::Watch {
            video,
            exit_when_done,
        } => executor.watch(config, paths, video, exit_when_done),
        Command::Doctor { json } => executor.doctor(&paths, &config, json),
        Command::Status => executor.status(&paths, &config),
    }
}

fn log_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let paths = AppPaths::resolve()?;
    paths.ensure_dirs()?;

    let config = load_config(&paths, &cli.to_overrides())?;

    // stdout carries results and exports, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config.diagnostics.log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact()
        .init();

    tracing::debug!(config = %paths.config_file.display(), "configuration loaded");

    execute_command(cli.command, paths, config, &DefaultCommandExecutor)
}
