//! Memory-subsystem test generation CLI.
//!
//! This binary drives the engine from a JSON bundle (see [`bundle`]). It performs:
//! 1. **Generate:** Streams solutions as JSON lines on stdout; statistics go to the log.
//! 2. **Paths:** Lists the feasible paths of every access and their classes.
//!
//! Logging goes to stderr through `tracing`; `RUST_LOG` overrides the default level.

mod bundle;

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mmutest_core::config::IterationMode;
use mmutest_core::coverage::{PathExtractor, classify};

use crate::bundle::{Bundle, CliError};

#[derive(Parser, Debug)]
#[command(
    name = "mmutest",
    author,
    version,
    about = "Constraint-driven test generation for caches, TLBs and page tables",
    long_about = "Enumerate multi-access scenarios over a memory-subsystem model and solve them into concrete addresses, entries and preparation loads.\n\nExamples:\n  mmutest generate demos/tlb_l1.json\n  mmutest generate demos/tlb_l1.json --mode exhaustive --count 100 --pretty\n  mmutest paths demos/tlb_l1.json"
)]
struct Cli {
    /// Log engine progress at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate solutions for the accesses of a bundle.
    Generate {
        /// Bundle file (subsystem, settings, config, accesses).
        bundle: PathBuf,

        /// Maximum number of solutions to generate (overrides the bundle).
        #[arg(short, long)]
        count: Option<usize>,

        /// Randomizer seed (overrides the bundle).
        #[arg(short, long)]
        seed: Option<u64>,

        /// Iteration mode (overrides the bundle).
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,

        /// Pretty-print each solution instead of one JSON line per solution.
        #[arg(long)]
        pretty: bool,
    },

    /// List the feasible paths of every access of a bundle.
    Paths {
        /// Bundle file.
        bundle: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Random,
    Exhaustive,
}

impl From<Mode> for IterationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Random => Self::Random,
            Mode::Exhaustive => Self::Exhaustive,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Generate {
            bundle,
            count,
            seed,
            mode,
            pretty,
        } => cmd_generate(&bundle, count, seed, mode, pretty),
        Commands::Paths { bundle } => cmd_paths(&bundle),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

/// Installs the stderr subscriber; `RUST_LOG` takes precedence over `verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "mmutest_core=debug" } else { "mmutest_core=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Runs the engine over a bundle and writes every solution to stdout.
///
/// # Arguments
///
/// * `path` - Bundle file.
/// * `count` - Solution limit overriding the bundle's.
/// * `seed` - Seed overriding the bundle's.
/// * `mode` - Iteration mode overriding the bundle's.
/// * `pretty` - Pretty-print solutions.
fn cmd_generate(
    path: &Path,
    count: Option<usize>,
    seed: Option<u64>,
    mode: Option<Mode>,
    pretty: bool,
) -> Result<(), CliError> {
    let mut bundle = Bundle::load(path)?;
    if count.is_some() {
        bundle.config.count_limit = count;
    }
    if let Some(seed) = seed {
        bundle.config.seed = seed;
    }
    if let Some(mode) = mode {
        bundle.config.mode = mode.into();
    }
    info!(
        bundle = %path.display(),
        accesses = bundle.accesses.len(),
        mode = ?bundle.config.mode,
        seed = bundle.config.seed,
        "generating"
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut written = 0usize;
    for solution in bundle.engine()?.solutions() {
        if pretty {
            serde_json::to_writer_pretty(&mut out, &solution).map_err(io::Error::from)?;
        } else {
            serde_json::to_writer(&mut out, &solution).map_err(io::Error::from)?;
        }
        writeln!(out)?;
        written += 1;
    }
    out.flush()?;
    info!(solutions = written, "done");
    Ok(())
}

/// Prints the feasible paths of every access, grouped by class.
fn cmd_paths(path: &Path) -> Result<(), CliError> {
    let bundle = Bundle::load(path)?;
    let config = &bundle.config;
    let extractor = PathExtractor::new(&bundle.subsystem, config.max_path_depth, config.max_paths);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for (i, (ty, constraints)) in bundle.access_list().into_iter().enumerate() {
        constraints.validate(&bundle.subsystem)?;
        let paths = extractor.extract(ty, &constraints)?;
        let classes = classify(config.classifier, &paths);
        writeln!(out, "access {i}: {ty} ({} paths, {} classes)", paths.len(), classes.len())?;
        for (c, class) in classes.iter().enumerate() {
            writeln!(out, "  class {c}:")?;
            for p in class {
                writeln!(out, "    {p}")?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
