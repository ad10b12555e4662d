//! ntuplizer CLI
//!
//! Usage:
//!   ntuplizer --input events.jsonl                  # Table summaries per event
//!   ntuplizer --config ntuple.toml --input - --json # JSON tables, events from stdin
//!   ntuplizer --config ntuple.toml --schema         # Print column layouts
//!   ntuplizer --serve                               # HTTP API server

use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use ntuplizer::config::Config;
use ntuplizer::core::{api, run_server, ProducerSet};
use ntuplizer::types::{Event, Table};
use ntuplizer::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "ntuplizer",
    version = VERSION,
    about = "Turn per-event cluster and track collections into flat annotation tables",
    long_about = "ntuplizer reads events as JSON lines and writes one flat table per\n\
                  configured producer and event: one row per selected candidate.\n\n\
                  Table kinds:\n  \
                  cluster_id   - classifier scores for 3D clusters\n  \
                  digi_flags   - decoded digi word flags for PF clusters\n  \
                  track_truth  - truth-match categories for decoded tracks\n\n\
                  Without --config, one table of each kind is produced with the\n\
                  binary classifiers disabled."
)]
struct Args {
    /// TOML configuration (default: built-in)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON-lines event file, `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Output one JSON object per event
    #[arg(long)]
    json: bool,

    /// Print the configured column layouts and exit
    #[arg(long)]
    schema: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let producers = match load_producers(&args) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };

    if args.schema {
        print_schema(&producers);
    } else if args.serve {
        run_serve(&args, producers).await;
    } else if let Err(e) = run_batch(&args, &producers) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ntuplizer=debug" } else { "ntuplizer=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Read the configuration (or the default) and prepare every producer
fn load_producers(args: &Args) -> ntuplizer::Result<ProducerSet> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.build()
}

/// Process every event of the input stream
fn run_batch(args: &Args, producers: &ProducerSet) -> ntuplizer::Result<()> {
    let reader: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };

    if !args.json {
        print_header(args.no_color);
    }

    let mut processed = 0usize;
    let mut failed = 0usize;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: Event = match serde_json::from_str(&line) {
            Ok(e) => e,
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "unreadable event skipped");
                failed += 1;
                continue;
            }
        };

        match producers.run(&event) {
            Ok(tables) => {
                processed += 1;
                if args.json {
                    print_json(&event, &tables)?;
                } else {
                    print_summary(&event, &tables, args.no_color);
                }
            }
            Err(e) => {
                warn!(event = event.id, error = %e, "event failed, no tables emitted");
                failed += 1;
            }
        }
    }

    debug!(processed, failed, "input exhausted");
    if !args.json {
        println!();
        println!("Events: {} processed, {} failed", processed, failed);
    }
    Ok(())
}

/// Print header
fn print_header(no_color: bool) {
    if no_color {
        println!("========================================");
        println!("  ntuplizer v{}", VERSION);
        println!("========================================");
    } else {
        println!("\x1b[1m========================================\x1b[0m");
        println!("\x1b[1m  ntuplizer v{}\x1b[0m", VERSION);
        println!("\x1b[1m========================================\x1b[0m");
    }
    println!();
}

/// One line per table
fn print_summary(event: &Event, tables: &[Table], no_color: bool) {
    if no_color {
        println!("event {}", event.id);
    } else {
        println!("\x1b[36mevent {}\x1b[0m", event.id);
    }
    for table in tables {
        println!("  {}", table.to_summary_string());
    }
}

fn print_json(event: &Event, tables: &[Table]) -> ntuplizer::Result<()> {
    let json = serde_json::json!({
        "event": event.id,
        "tables": tables,
    });
    println!("{}", serde_json::to_string(&json)?);
    Ok(())
}

fn print_schema(producers: &ProducerSet) {
    for layout in api::layouts(producers) {
        let cut = if layout.cut.is_empty() { "<all>" } else { layout.cut.as_str() };
        println!("{} ({} from '{}', cut: {})", layout.name, layout.kind, layout.src, cut);
        for column in &layout.columns {
            println!("  {:<28} {:<6} {}", column.name, column.kind.to_string(), column.doc);
        }
    }
}

/// Run HTTP server
async fn run_serve(args: &Args, producers: Arc<ProducerSet>) {
    if let Err(e) = run_server(&args.addr, producers).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
