//! redcomp CLI - compositional contract verification

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

mod commands;
mod config;
mod signal;

use commands::{script, verify};

#[derive(Parser)]
#[command(name = "redcomp")]
#[command(about = "Verify component contracts with Redlog", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the system contract, and optionally diagnose components
    Verify {
        /// Component model (JSON)
        model: PathBuf,

        /// Component to diagnose; may be repeated
        #[arg(long = "target", short = 't')]
        targets: Vec<String>,

        /// Only run the component diagnoses
        #[arg(long, requires = "targets")]
        diagnose_only: bool,

        /// Solver executable, overriding the configuration
        #[arg(long, env = "REDCOMP_SOLVER")]
        solver: Option<String>,

        /// Time limit per script in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Keep generated scripts and results documents
        #[arg(long)]
        keep_temp_files: bool,
    },

    /// Print the generated solver script
    Script {
        /// Component model (JSON)
        model: PathBuf,

        /// Component to diagnose instead of checking the system contract
        #[arg(long, short = 't')]
        target: Option<String>,

        /// Output path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::load_config(cli.config)?;

    match cli.command {
        Commands::Verify {
            model,
            targets,
            diagnose_only,
            solver,
            timeout,
            keep_temp_files,
        } => {
            config.override_executable(solver);
            if timeout.is_some() {
                config.solver.timeout = timeout;
            }
            config.solver.keep_temp_files |= keep_temp_files;

            let options = verify::VerifyOptions {
                targets,
                diagnose_only,
            };
            if !verify::verify(&model, options, &config)? {
                std::process::exit(1);
            }
        }

        Commands::Script {
            model,
            target,
            output,
        } => {
            script::script(&model, target.as_deref(), output)?;
        }
    }

    Ok(())
}
