use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::PathBuf;
use topn_strings::driver::{run, RunConfig};
use topn_strings::Watermarks;
use tracing_subscriber::EnvFilter;

const IN_BUFFER_SIZE: usize = 128 * 1024;
const OUT_BUFFER_SIZE: usize = 32 * 1024;

/// Report the most frequent keys of a `<key> [count]` line stream using
/// bounded memory.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of top entries to print at end of input.
    #[arg(short = 'n', long, default_value_t = Watermarks::DEFAULT_OUTPUT_COUNT)]
    output_count: usize,

    /// Keys kept after a cull.
    #[arg(short = 'l', long, default_value_t = Watermarks::DEFAULT_LOW)]
    low_watermark: usize,

    /// Live key count that triggers a cull.
    #[arg(short = 'H', long, default_value_t = Watermarks::DEFAULT_HIGH)]
    high_watermark: usize,

    /// Bucket count of the table [default: low watermark + 1].
    #[arg(short = 'm', long)]
    modulus: Option<usize>,

    /// Print table occupancy to stderr after reading the input.
    #[arg(long)]
    analyze: bool,

    /// Read records from FILE instead of stdin.
    input: Option<PathBuf>,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let watermarks = Watermarks::new(args.output_count, args.low_watermark, args.high_watermark)
        .context("invalid watermarks")?;
    let config = RunConfig {
        watermarks,
        modulus: args.modulus,
    };

    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(BufReader::with_capacity(IN_BUFFER_SIZE, file))
        }
        None => Box::new(BufReader::with_capacity(IN_BUFFER_SIZE, io::stdin().lock())),
    };
    let mut out = BufWriter::with_capacity(OUT_BUFFER_SIZE, io::stdout().lock());

    let summary = run(input, &mut out, config)?;
    if args.analyze {
        eprintln!("{}", summary.table);
    }
    tracing::info!(
        records = summary.stats.records,
        culls = summary.stats.culls,
        evicted = summary.stats.evicted,
        "done"
    );
    Ok(())
}
