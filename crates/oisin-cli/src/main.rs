// SPDX-License-Identifier: MIT OR Apache-2.0
//! oisin CLI binary - SIMD-parallel JSON minification
//!
//! Reads a JSON document from a file (or stdin), minifies it with the
//! strategy engine, and writes the result to a file (or stdout). Exit
//! codes encode the failure category: 0 success, 1 invalid input JSON,
//! 2 I/O error, 3 invalid configuration, 4 internal fault.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use oisin::{MinifyConfig, MinifyError, Strategy, capabilities, select};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

/// SIMD-parallel JSON minifier
#[derive(Parser, Debug)]
#[command(name = "oisin")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input file (reads from stdin if not provided)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output file (writes to stdout if not provided)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Processing strategy
    #[arg(long = "mode", value_enum, default_value = "auto")]
    mode: Mode,

    /// Worker thread count (defaults to all logical cores)
    #[arg(long = "threads", value_name = "N")]
    threads: Option<usize>,

    /// Chunk size in bytes for parallel processing
    #[arg(long = "chunk-size", value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Skip the structural validation pass
    #[arg(long = "no-validate")]
    no_validate: bool,

    /// Print processing statistics to stderr as JSON
    #[arg(long = "stats")]
    stats: bool,
}

/// Strategy families selectable from the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Byte-at-a-time reference kernel
    Scalar,
    /// Widest vectorised kernel the host supports
    Simd,
    /// Chunk-parallel across all cores
    Parallel,
    /// Fixed-memory streaming
    Streaming,
    /// Let the selector decide
    Auto,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("error: {err:#}");
        let code = err
            .downcast_ref::<MinifyError>()
            .map_or(4, exit_category);
        std::process::exit(code);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = build_config(args);

    // Streaming from a file never loads the whole document
    if args.mode == Mode::Streaming {
        return run_streaming(args, &config);
    }

    let input = read_input(args.input.as_ref())?;
    let strategy = select(input.len(), capabilities(), &config);
    let result = oisin::minify(&input, &config)
        .with_context(|| format!("minification failed (strategy {strategy})"))?;

    if args.stats {
        let stats = serde_json::to_string(&result.stats)?;
        eprintln!("{stats}");
    }
    write_output(args.output.as_ref(), &result.output)?;
    Ok(())
}

fn run_streaming(args: &Args, config: &MinifyConfig) -> anyhow::Result<()> {
    let stats = match (&args.input, &args.output) {
        (Some(input), Some(output)) => {
            let reader = open_reader(input)?;
            let writer = create_writer(output)?;
            oisin::minify_stream(reader, writer, config)?
        }
        (Some(input), None) => {
            let reader = open_reader(input)?;
            oisin::minify_stream(reader, io::stdout().lock(), config)?
        }
        (None, Some(output)) => {
            let writer = create_writer(output)?;
            oisin::minify_stream(io::stdin().lock(), writer, config)?
        }
        (None, None) => oisin::minify_stream(io::stdin().lock(), io::stdout().lock(), config)?,
    };
    if args.stats {
        let stats = serde_json::to_string(&stats)?;
        eprintln!("{stats}");
    }
    Ok(())
}

fn build_config(args: &Args) -> MinifyConfig {
    let mut config = MinifyConfig::new();
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    if let Some(chunk_size) = args.chunk_size {
        config = config.with_chunk_size(chunk_size);
    }
    if args.no_validate {
        config = config.without_validation();
    }
    match args.mode {
        Mode::Scalar => config = config.with_strategy(Strategy::Scalar),
        Mode::Simd => {
            let strategy = capabilities().best_simd().unwrap_or(Strategy::Scalar);
            config = config.with_strategy(strategy);
        }
        Mode::Parallel => config = config.with_strategy(Strategy::ChunkParallel),
        Mode::Streaming => config = config.with_strategy(Strategy::Streaming),
        Mode::Auto => {}
    }
    config
}

/// Exit code for the error category
const fn exit_category(err: &MinifyError) -> i32 {
    match err {
        MinifyError::InvalidInput { .. } => 1,
        MinifyError::IoRead(_) | MinifyError::IoWrite(_) => 2,
        MinifyError::InvalidConfiguration(_) => 3,
        MinifyError::AllocationFailed { .. }
        | MinifyError::WorkerSpawnFailed { .. }
        | MinifyError::WorkerFault { .. }
        | MinifyError::Cancelled { .. } => 4,
    }
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<Vec<u8>> {
    if let Some(p) = path {
        let bytes = fs::read(p)
            .map_err(MinifyError::IoRead)
            .with_context(|| format!("reading {}", p.display()))?;
        Ok(bytes)
    } else {
        let mut input = Vec::new();
        io::stdin()
            .read_to_end(&mut input)
            .map_err(MinifyError::IoRead)
            .context("reading stdin")?;
        Ok(input)
    }
}

fn write_output(path: Option<&PathBuf>, output: &[u8]) -> anyhow::Result<()> {
    if let Some(p) = path {
        fs::write(p, output)
            .map_err(MinifyError::IoWrite)
            .with_context(|| format!("writing {}", p.display()))?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(output).map_err(MinifyError::IoWrite)?;
    }
    Ok(())
}

fn open_reader(path: &PathBuf) -> anyhow::Result<io::BufReader<fs::File>> {
    let file = fs::File::open(path)
        .map_err(MinifyError::IoRead)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(io::BufReader::new(file))
}

fn create_writer(path: &PathBuf) -> anyhow::Result<io::BufWriter<fs::File>> {
    let file = fs::File::create(path)
        .map_err(MinifyError::IoWrite)
        .with_context(|| format!("creating {}", path.display()))?;
    Ok(io::BufWriter::new(file))
}
