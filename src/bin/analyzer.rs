//! Command-line driver: analyze one program file and print the converged
//! stores, postcondition verdicts and warnings.
//!
//! Exit codes: `0` when the file loads and the analysis completes (whatever
//! the verdicts), `1` when the file cannot be opened, `2` when parsing or
//! lowering fails.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use interval_analyzer::{build, parse, Solver};

#[derive(Parser)]
#[command(author, version, about = "Interval analysis for a small imperative language")]
struct Cli {
    /// Program to analyze
    program: PathBuf,

    /// Apply widening at loop heads from this iteration on
    #[arg(long, value_name = "ITERATION")]
    widening: Option<usize>,

    /// Abort if the fixpoint is not reached within this many iterations
    #[arg(long, value_name = "INT", default_value_t = 10_000)]
    max_iterations: usize,

    /// Log the per-iteration solver trace
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    simplelog::TermLogger::init(
        if cli.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let source = match fs::read_to_string(&cli.program) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("cannot open `{}`: {err}", cli.program.display());
            return Ok(ExitCode::from(1));
        }
    };

    println!("Analyzing `{}`...", cli.program.display());

    let ast = match parse(&source) {
        Ok(ast) => ast,
        Err(err) => {
            eprintln!("{err}");
            return Ok(ExitCode::from(2));
        }
    };

    let system = match build(&ast) {
        Ok(system) => system,
        Err(err) => {
            eprintln!("{err}");
            return Ok(ExitCode::from(2));
        }
    };
    println!("input store: {}", system.precondition);

    let solver = Solver {
        max_iterations: cli.max_iterations,
        widening_delay: cli.widening,
    };
    let report = match solver.solve(system) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{err}");
            return Ok(ExitCode::from(2));
        }
    };

    println!("fixpoint reached after {} iterations", report.iterations);
    for (index, location) in report.locations.iter().enumerate() {
        println!("location {index}: {location}");
    }

    for warning in report.warnings() {
        eprintln!("warning: {warning}");
    }
    for verdict in report.verdicts() {
        println!("{verdict}");
    }

    Ok(ExitCode::SUCCESS)
}
