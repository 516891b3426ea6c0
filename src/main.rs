use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime, Timelike};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use command::GitCli;
use config::{FileOptions, Settings};
use git::{RepositoryMetadata, RepositoryStatus};
use project::BuildMetadata;
use render::Generator;

mod command;
mod config;
mod declaration;
mod git;
mod global_var;
mod locate;
mod project;
mod render;
mod run;
mod types;
mod utils;

const GENERATOR_NAME: &str = "BuildVersion";
const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_REVISION"), ")");

/// Stamp git and build information into a project's version declarations.
#[derive(Parser)]
#[command(name = "buildversion", version = LONG_VERSION)]
struct Cli {
    /// Project root (the directory holding `Logical/`)
    project_root: PathBuf,

    /// Tool version, user name, project name, configuration, build mode
    build_args: Vec<String>,

    /// Fail unless exactly five build arguments are given
    #[arg(long, env = "BUILDVERSION_ERROR_ON_MISSING_ARGUMENTS")]
    error_on_missing_arguments: bool,

    /// Fail if git is missing or the project is not a repository
    #[arg(long, env = "BUILDVERSION_ERROR_ON_REPOSITORY_CHECK_FAILURE")]
    error_on_repository_check_failure: bool,

    /// Fail if the working tree has uncommitted changes
    #[arg(long, env = "BUILDVERSION_ERROR_ON_UNCOMMITTED_CHANGES")]
    error_on_uncommitted_changes: bool,

    /// Fail if neither the declaration file nor the shared variable was written
    #[arg(long, env = "BUILDVERSION_ERROR_IF_NO_INITIALIZATION_TARGET")]
    error_if_no_initialization_target: bool,

    /// JSON options file
    #[arg(long, env = "BUILDVERSION_CONFIG")]
    config: Option<PathBuf>,

    /// Write the declaration here instead of searching for the program directory
    #[arg(long)]
    declaration_path: Option<PathBuf>,

    /// Shared declarations file to patch instead of `Logical/Global.var`
    #[arg(long)]
    global_path: Option<PathBuf>,

    /// git executable
    #[arg(long, env = "BUILDVERSION_GIT", default_value = "git")]
    git: PathBuf,

    /// Print the collected metadata as JSON and exit without writing files
    #[arg(long)]
    print_metadata: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetadataDump<'a> {
    repository_status: RepositoryStatus,
    repository: &'a RepositoryMetadata,
    build: &'a BuildMetadata,
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::new(&cli.project_root, cli.build_args.clone());
    let p = &mut settings.policy;
    p.error_on_missing_arguments = cli.error_on_missing_arguments;
    p.error_on_repository_check_failure = cli.error_on_repository_check_failure;
    p.error_on_uncommitted_changes = cli.error_on_uncommitted_changes;
    p.error_if_no_initialization_target = cli.error_if_no_initialization_target;
    settings.declaration_path = cli.declaration_path.clone();
    settings.global_path = cli.global_path.clone();

    if let Some(path) = &cli.config {
        settings = settings.merge(FileOptions::load(path)?);
    }
    Ok(settings)
}

fn execute(cli: Cli, now: NaiveDateTime) -> Result<()> {
    let settings = resolve_settings(&cli)?;
    let runner = GitCli::new(&cli.git);
    let generator = Generator::new(GENERATOR_NAME, LONG_VERSION);

    if cli.print_metadata {
        let (status, repository, build) = run::gather(&settings, &runner, now)?;
        let dump = MetadataDump {
            repository_status: status,
            repository: &repository,
            build: &build,
        };
        let json = serde_json::to_string_pretty(&dump).context("failed to serialize metadata")?;
        println!("{}", json);
        return Ok(());
    }

    let report = run::run(&settings, &runner, &generator, now)?;
    log::info!(
        "{} version {} ({}, repository {:?}), built by {} at {}",
        report.build.project_name,
        report.repository.version,
        report.repository.sha1,
        report.status,
        report.build.user_name,
        render::header_date(&report.build.build_date),
    );
    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    // one timestamp for the whole run
    let now = Local::now().naive_local();
    let now = now.with_nanosecond(0).unwrap_or(now);

    match execute(cli, now) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
