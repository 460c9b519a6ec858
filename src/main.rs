//! Appliance deployment orchestrator entrypoint.
//!
//! This is the main entrypoint for the appliance-deploy command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use appliance_deploy::cli::{Cli, Commands, LogFormat, OutputFormatter};
use appliance_deploy::config::{find_config_file, ConfigParser, ConfigValidator, DeployConfig};
use appliance_deploy::error::{DeployError, Result};
use appliance_deploy::orchestrator::{build_writer, MissionOrchestrator};
use appliance_deploy::plan::PlanFactory;
use appliance_deploy::repository::sha256_hex;
use appliance_deploy::worker::{self, PollerOptions};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over the default level.
fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Main async entry point. Returns `false` when the command ran but reports failure.
async fn run(cli: Cli) -> Result<bool> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Run => cmd_run(cli.config.as_deref()).await,
        Commands::Once { force } => cmd_once(cli.config.as_deref(), force, &formatter).await,
        Commands::Validate { plan } => cmd_validate(cli.config.as_deref(), &plan, &formatter),
        Commands::Status => cmd_status(cli.config.as_deref(), &formatter).await,
        Commands::Checksum { file } => cmd_checksum(&file, &formatter).await,
    }
}

/// Loads, overrides, and validates the orchestrator settings.
fn load_config(config_path: Option<&Path>) -> Result<DeployConfig> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => find_config_file(std::env::current_dir()?)?,
    };

    let base = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;

    let config = parser.load_with_env(&path)?;
    let result = ConfigValidator::new().validate(&config)?;
    debug!("Configuration loaded with {} warning(s)", result.warnings.len());

    Ok(config)
}

/// Builds and starts an orchestrator.
async fn start_orchestrator(config: &DeployConfig) -> Result<MissionOrchestrator> {
    let mut orchestrator = MissionOrchestrator::from_config(config).await?;
    orchestrator.start().await?;
    Ok(orchestrator)
}

/// Polls and reconciles until Ctrl-C.
async fn cmd_run(config_path: Option<&Path>) -> Result<bool> {
    let config = load_config(config_path)?;
    let mut orchestrator = start_orchestrator(&config).await?;
    let options = PollerOptions::from(&config.poll);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C, stopping: {e}");
        }
    };

    worker::run(options, &mut orchestrator, shutdown).await;
    info!("Stopped");
    Ok(true)
}

/// Runs a single pass.
async fn cmd_once(config_path: Option<&Path>, force: bool, formatter: &OutputFormatter) -> Result<bool> {
    let config = load_config(config_path)?;
    let mut orchestrator = start_orchestrator(&config).await?;

    if force {
        orchestrator.reload();
    }

    let outcome = orchestrator.check_for_updated_plan().await?;
    print_out(&formatter.format_outcome(&outcome))?;
    Ok(true)
}

/// Parses a plan document without side effects.
fn cmd_validate(config_path: Option<&Path>, plan_path: &Path, formatter: &OutputFormatter) -> Result<bool> {
    // Settings only supply defaults here, so a missing settings file is fine.
    let config = match config_path {
        Some(path) => ConfigParser::new().load_with_env(path)?,
        None => find_config_file(std::env::current_dir()?)
            .and_then(|path| ConfigParser::new().load_with_env(path))
            .unwrap_or_default(),
    };

    let document = std::fs::read(plan_path)?;
    let plan = PlanFactory::new(config.plan_defaults()).parse(&document)?;

    print_out(&formatter.format_plan(&plan))?;
    Ok(true)
}

/// Shows the last published status.
async fn cmd_status(config_path: Option<&Path>, formatter: &OutputFormatter) -> Result<bool> {
    let config = load_config(config_path)?;
    let writer = build_writer(&config).await?;
    let status = writer.load().await?;

    print_out(&formatter.format_status(status.as_ref()))?;
    Ok(status.is_none_or(|s| s.is_healthy()))
}

/// Prints the hex SHA-256 of an artifact.
async fn cmd_checksum(file: &Path, formatter: &OutputFormatter) -> Result<bool> {
    let data = tokio::fs::read(file).await.map_err(|e| {
        DeployError::internal(format!("Failed to read {}: {e}", file.display()))
    })?;

    print_out(&formatter.format_checksum(file, &sha256_hex(&data)))?;
    Ok(true)
}

/// Writes command output to stdout.
fn print_out(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

