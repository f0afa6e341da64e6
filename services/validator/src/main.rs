//! Radar archive acceptance validator.
//!
//! Opens a chunked radar composite archive (local path or S3 URI), runs the
//! full acceptance rule registry against it and renders the report. Exit
//! status: 0 when the verdict is PASS, 1 when it is FAIL, 2 when the archive
//! could not be opened at all.

mod render;

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use dataset_adapter::{Location, S3Options, ZarrDataset};
use validation_engine::{standard_rules, AcceptanceSpec, Runner};
use validator_common::ABORT_EXIT_CODE;

#[derive(Parser, Debug)]
#[command(name = "validator")]
#[command(about = "Validate a 2D radar composite Zarr archive against the acceptance specification")]
struct Args {
    /// Archive location: a local path or an s3://bucket/key URI
    location: String,

    /// Optional S3 endpoint URL (e.g. a MinIO gateway)
    #[arg(long)]
    s3_endpoint_url: Option<String>,

    /// Use anonymous (unsigned) access for S3
    #[arg(long)]
    s3_anon: bool,

    /// AWS region for S3 access
    #[arg(long)]
    s3_region: Option<String>,

    /// Emit the report as JSON instead of a human-readable table
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = S3Options {
        endpoint: args.s3_endpoint_url.clone(),
        region: args.s3_region.clone(),
        anonymous: args.s3_anon,
    };

    let location = match Location::parse(&args.location, options) {
        Ok(location) => location,
        Err(err) => {
            eprintln!("cannot open archive: {}", err);
            std::process::exit(ABORT_EXIT_CODE);
        }
    };

    info!(location = %location, "Opening archive");
    let dataset = match ZarrDataset::open(location.clone()) {
        Ok(dataset) => dataset,
        Err(err) => {
            eprintln!("cannot open archive: {}", err);
            std::process::exit(ABORT_EXIT_CODE);
        }
    };

    // A first Ctrl-C stops dispatching rules and yields a partial report; a
    // second one is left to the default handler.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; finishing with a partial report");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let spec = AcceptanceSpec::v1();
    info!(spec = %spec.version, "Running validation");
    let runner = Runner::new(spec, standard_rules(Some(location)));
    let report = runner.run(&dataset, &cancel).await;

    let mut stdout = std::io::stdout();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
    } else {
        write!(stdout, "{}", render::render_report(&report))?;
    }
    stdout.flush()?;

    std::process::exit(report.verdict.exit_code());
}
