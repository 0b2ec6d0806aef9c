// Standard Library Imports
use std::{fs, io, path::PathBuf};

// External Crate Imports
use clap::Parser;
use glyhunter::{Config, DEFAULT_CONFIG, SearchSpace, Workflow};
use miette::{IntoDiagnostic, Result, WrapErr};
use sifter::MatchMode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Annotate MALDI-TOF mass lists with glycan compositions
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// A mass-list CSV, or a directory of them
    #[arg(required_unless_present = "dump_config")]
    input: Option<PathBuf>,
    /// Where to write results (defaults to `<input>_glyhunter_results` next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// A KDL configuration file (defaults to the bundled configuration)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// A Byonic glycan library (defaults to the bundled N-glycan library)
    #[arg(short, long, conflicts_with = "denovo")]
    database: Option<PathBuf>,
    /// Enumerate candidates from the configured constraints instead of reading a library
    #[arg(long)]
    denovo: bool,
    /// Report every candidate within tolerance, not only the closest (skips summary tables)
    #[arg(long)]
    all_candidates: bool,
    /// Log debugging information
    #[arg(short, long)]
    verbose: bool,
    /// Print the bundled configuration and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if args.dump_config {
        print!("{DEFAULT_CONFIG}");
        return Ok(());
    }

    let config = if let Some(path) = &args.config {
        let kdl = fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read the configuration file {}", path.display()))?;
        Config::from_kdl(path.display().to_string(), kdl)?
    } else {
        Config::embedded()?
    };

    let search_space = match (&args.database, args.denovo) {
        (_, true) => SearchSpace::DeNovo,
        (Some(path), false) => SearchSpace::library_file(path)?,
        (None, false) => SearchSpace::embedded_library(),
    };
    let mode = if args.all_candidates {
        MatchMode::AllCandidates
    } else {
        MatchMode::BestMatch
    };

    // NOTE: `clap` guarantees an input whenever `--dump-config` wasn't passed
    let Some(input) = args.input else {
        return Ok(());
    };

    let workflow = Workflow {
        config,
        search_space,
        mode,
    };
    let output = workflow.run(&input, args.output.as_deref())?;
    info!("results written to {}", output.display());

    Ok(())
}
