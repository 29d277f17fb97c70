//! qobf Command-Line Interface
//!
//! ```text
//! qobf circuit -f bell.qasm -a cloaked -a inverse
//! qobf program -f payload.py -a shroud
//! ```
//!
//! Circuit techniques: cloaked, inverse, delayed, composite.
//! Program templates: simple_entanglement, variable_pairs, shroud, deterministic.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{circuit, program, version};
use config::QobfConfig;

/// qobf - obfuscate quantum circuits and the programs that run them
#[derive(Parser)]
#[command(name = "qobf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Obfuscate a circuit file (.qasm or .py)
    Circuit {
        /// Circuit file
        #[arg(short, long)]
        file: PathBuf,

        /// Technique to apply; repeat for several layers
        #[arg(short = 'a', long = "algo", required = true)]
        techniques: Vec<String>,

        /// Substitution probability for every technique
        #[arg(long)]
        probability: Option<f64>,

        /// Insertion density for every technique
        #[arg(long)]
        density: Option<f64>,

        /// Reject circuits wider than this
        #[arg(long)]
        max_qubits: Option<usize>,

        /// Warn about circuits deeper than this
        #[arg(long)]
        max_depth: Option<usize>,

        /// Run time limit in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Directory with catalog JSON files
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Wrap a program file in a control-flow template
    Program {
        /// Program file
        #[arg(short, long)]
        file: PathBuf,

        /// Template id; only the first is applied
        #[arg(short = 'a', long = "algo", required = true)]
        templates: Vec<String>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let result = QobfConfig::load(cli.config.as_deref()).and_then(|mut config| match cli.command {
        Commands::Circuit {
            file,
            techniques,
            probability,
            density,
            max_qubits,
            max_depth,
            timeout,
            data_dir,
            seed,
        } => {
            let settings = &mut config.circuit;
            if let Some(max_qubits) = max_qubits {
                settings.max_qubits = max_qubits;
            }
            if let Some(max_depth) = max_depth {
                settings.max_depth = max_depth;
            }
            if let Some(timeout) = timeout {
                settings.timeout_secs = timeout;
            }
            if data_dir.is_some() {
                settings.data_dir = data_dir;
            }
            circuit::execute(&file, &techniques, probability, density, settings, seed)
        }

        Commands::Program {
            file,
            templates,
            seed,
        } => program::execute(&file, &templates, &config, seed),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    });

    // Errors are reported, not turned into an exit status.
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
    }
}
