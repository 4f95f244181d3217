use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use columnar_ingest::ingestion::{
    CompositeObserver, FileObserver, IngestionFormat, IngestionObserver, IngestionOptions, TracingObserver,
    ingest_with_stats,
};
use columnar_ingest::types::{DataSet, RawSource};
use tracing_subscriber::{EnvFilter, fmt};

/// Ingest a CSV/TSV file, URL, or structured-record JSON document into interned columns.
#[derive(Parser, Debug)]
#[command(name = "columnar-ingest", version, about = "Ingest tabular data into numeric columns")]
struct Cli {
    /// Local path or http(s) URL
    source: String,

    /// Chunk size in bytes for delimited text
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Field delimiter (guessed from the heading line when omitted)
    #[arg(long)]
    delimiter: Option<char>,

    /// Force a format instead of routing by extension
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Remote fetch timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Print the whole dataset as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Append ingestion outcomes to this file
    #[arg(long)]
    event_log: Option<PathBuf>,

    /// Do not draw progress on stderr
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Delimited,
    Records,
}

impl From<FormatArg> for IngestionFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Delimited => IngestionFormat::Delimited,
            FormatArg::Records => IngestionFormat::StructuredRecords,
        }
    }
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,columnar_ingest=info"));
    fmt().with_env_filter(env).with_writer(std::io::stderr).init();

    let args = Cli::parse();
    let options = build_options(&args)?;
    let source = RawSource::parse(&args.source);

    let result = ingest_with_stats(&source, &options);
    if !args.quiet {
        eprintln!();
    }
    let (ds, stats) = result.with_context(|| format!("failed to ingest {}", args.source))?;

    if args.json {
        let out = serde_json::json!({ "dataset": ds, "stats": stats });
        println!("{}", serde_json::to_string(&out)?);
    } else {
        print_summary(&ds)?;
        println!(
            "{} rows, {} columns ({} categorical), {} invalid timestamp cells, {:?}",
            stats.rows, stats.columns, stats.categorical_columns, stats.invalid_cells, stats.elapsed
        );
    }
    Ok(())
}

fn build_options(args: &Cli) -> Result<IngestionOptions> {
    let mut options = IngestionOptions {
        format: args.format.map(Into::into),
        fetch_timeout: Duration::from_secs(args.timeout_secs),
        ..Default::default()
    };

    if let Some(size) = args.chunk_size {
        if size == 0 {
            bail!("--chunk-size must be > 0");
        }
        options.delimited.chunk_size = size;
    }
    if let Some(d) = args.delimiter {
        if !d.is_ascii() {
            bail!("--delimiter must be a single ASCII character, got {d:?}");
        }
        options.delimited.delimiter = Some(d as u8);
    }

    let mut observers: Vec<Arc<dyn IngestionObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = &args.event_log {
        observers.push(Arc::new(FileObserver::new(path)));
    }
    options.observer = Some(Arc::new(CompositeObserver::new(observers)));

    if !args.quiet {
        options.progress = Some(Arc::new(|p: u8| {
            let mut err = std::io::stderr().lock();
            let _ = write!(err, "\rloading {p:>3}%");
            let _ = err.flush();
        }));
    }
    Ok(options)
}

fn print_summary(ds: &DataSet) -> Result<()> {
    let mut out = std::io::stdout().lock();
    for (i, heading) in ds.headings.iter().enumerate() {
        let table = &ds.decode_tables[i];
        if table.is_empty() {
            let (lo, hi) = ds.columns[i]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            if lo > hi {
                writeln!(out, "{i:>3}  {heading}  numeric  (no values)")?;
            } else {
                writeln!(out, "{i:>3}  {heading}  numeric  [{lo}, {hi}]")?;
            }
        } else {
            let preview: Vec<&str> = table.iter().take(5).collect();
            writeln!(
                out,
                "{i:>3}  {heading}  categorical  {} values, e.g. {preview:?}",
                table.len()
            )?;
        }
    }
    Ok(())
}
