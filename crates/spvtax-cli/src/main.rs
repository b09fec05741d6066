//! # spvtax CLI entry point
//!
//! Parses command-line arguments, installs logging, loads configuration,
//! and dispatches to subcommand handlers.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use spvtax_cli::entities::{run_entities, EntitiesArgs};
use spvtax_cli::run::{run_filing, RunArgs};
use spvtax_cli::stages::{run_stages, StagesArgs};
use spvtax_engine::{Clock, EngineConfig, EngineError, InstantClock, TokioClock};

/// SPV tax filing workflow.
///
/// Drives a special-purpose vehicle's tax filing through data collection,
/// processing, form generation, investor distribution, approval and
/// e-file submission.
#[derive(Parser, Debug)]
#[command(name = "spvtax", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the SPVs available for filing.
    Entities(EntitiesArgs),

    /// Run one SPV's filing through every stage.
    Run(RunArgs),

    /// Print the stage table.
    Stages(StagesArgs),
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, EngineError> {
    Ok(EngineConfig::load(path)?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    tracing::debug!("spvtax CLI v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(kind = ?e.kind(), "{e}");
            eprintln!("error: {}", e.user_message());
            return ExitCode::from(1);
        }
    };
    let clock: Arc<dyn Clock> = if config.instant {
        Arc::new(InstantClock::new())
    } else {
        Arc::new(TokioClock)
    };
    tracing::debug!(?config, "configuration loaded");

    let result = match cli.command {
        Commands::Entities(args) => run_entities(&args, clock).await,
        Commands::Run(args) => run_filing(&args, &config, clock).await,
        Commands::Stages(args) => run_stages(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spvtax_state::Stage;

    #[test]
    fn test_cli_parse_entities() {
        let cli = Cli::try_parse_from(["spvtax", "entities", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Entities(EntitiesArgs { json: true })));
    }

    #[test]
    fn test_cli_parse_run_with_options() {
        let cli = Cli::try_parse_from([
            "spvtax",
            "-vv",
            "run",
            "--spv",
            "spv-002",
            "--reject-check",
            "reviewedForms",
            "--reject-check",
            "allInfoCorrect",
            "--fail-stage",
            "file-generation",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.spv.as_str(), "spv-002");
            assert_eq!(args.reject_checks, vec!["reviewedForms", "allInfoCorrect"]);
            assert_eq!(args.fail_stage, Some(Stage::FileGeneration));
            assert!(!args.json);
        } else {
            panic!("expected run");
        }
    }

    #[test]
    fn test_cli_parse_fail_stage_by_index() {
        let cli =
            Cli::try_parse_from(["spvtax", "run", "--spv", "spv-001", "--fail-stage", "4"]).unwrap();
        if let Commands::Run(args) = cli.command {
            assert_eq!(args.fail_stage, Some(Stage::Approval));
        }
    }

    #[test]
    fn test_cli_parse_rejects_bad_stage_and_empty_spv() {
        assert!(Cli::try_parse_from(["spvtax", "run", "--spv", "spv-001", "--fail-stage", "nope"]).is_err());
        assert!(Cli::try_parse_from(["spvtax", "run", "--spv", " "]).is_err());
        assert!(Cli::try_parse_from(["spvtax", "run"]).is_err());
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["spvtax", "stages", "--log-json", "--config", "spvtax.yaml"])
            .unwrap();
        assert!(cli.log_json);
        assert_eq!(cli.config, Some(PathBuf::from("spvtax.yaml")));
        assert!(matches!(cli.command, Commands::Stages(_)));
    }

    #[test]
    fn test_missing_config_file_is_an_environment_error() {
        let err = load_config(Some(Path::new("/nonexistent/spvtax.yaml"))).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert_eq!(err.kind(), spvtax_engine::ErrorKind::Environment);
        assert!(err.user_message().contains("/nonexistent/spvtax.yaml"));
    }
}
