//! # miniprint CLI
//!
//! Command-line front end for the photo pipeline and a mock printer session.
//!
//! ## Usage
//!
//! ```bash
//! # Dither a photo and save what the printer would produce
//! miniprint preview photo.jpg --png preview.png
//!
//! # Same, with Stucki diffusion and sharp text edges
//! miniprint preview scan.png --png out.png --algorithm stucki --text-mode
//!
//! # Write the exact bytes a print job sends, in order
//! miniprint encode photo.jpg --output job.bin --density high
//!
//! # Run a full scan/connect/print cycle against the in-memory printer
//! RUST_LOG=debug miniprint simulate photo.jpg
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use miniprint::{
    MiniPrintError, PrintJob, PrinterConfig, SessionConfig,
    link::{LinkState, Session},
    protocol::commands::Density,
    render::{dither::DitherAlgorithm, photo},
    transfer::TransferPlan,
    transport::{self, MockTransport, Transport},
};

/// miniprint - photo printing for 384-dot BLE thermal printers
#[derive(Parser, Debug)]
#[command(name = "miniprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Session config (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Photo to print
    image: PathBuf,

    /// Error diffusion kernel (floyd-steinberg, stucki)
    #[arg(long)]
    algorithm: Option<DitherAlgorithm>,

    /// Binarization threshold (0-255)
    #[arg(long)]
    threshold: Option<u8>,

    /// Keep text and line-art edges sharp
    #[arg(long)]
    text_mode: bool,

    /// Heat level (low, medium, high)
    #[arg(long, default_value = "medium")]
    density: Density,

    /// Wait for the printer to acknowledge every chunk
    #[arg(long)]
    one_time_print: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dither a photo and save the result as PNG
    Preview {
        #[command(flatten)]
        job: JobArgs,

        /// Output PNG
        #[arg(long, value_name = "FILE")]
        png: PathBuf,
    },

    /// Write the raw byte stream for a photo
    Encode {
        #[command(flatten)]
        job: JobArgs,

        /// Output file for the payload bytes
        #[arg(long, short, value_name = "FILE")]
        output: PathBuf,
    },

    /// Scan, connect and print to a simulated printer
    Simulate {
        #[command(flatten)]
        job: JobArgs,

        /// Simulated battery level reported by the printer
        #[arg(long, default_value = "80")]
        battery: u8,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), MiniPrintError> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    match cli.command {
        Commands::Preview { job, png } => {
            let job = build_job(&config, &job)?;
            let rendered = job.render()?;
            photo::to_preview(&rendered.mono)?
                .save(&png)
                .map_err(|e| MiniPrintError::Image(format!("Failed to save PNG: {}", e)))?;
            println!(
                "Saved {}x{} preview to {}",
                rendered.mono.width(),
                rendered.mono.height(),
                png.display()
            );
        }
        Commands::Encode { job, output } => {
            let job = build_job(&config, &job)?;
            let payloads = job.payloads()?;
            let plan = TransferPlan::new(payloads.clone(), config.profile.max_chunk_len())?;
            std::fs::write(&output, payloads.concat())?;
            println!(
                "Wrote {} bytes ({} payloads, {} chunks for {}) to {}",
                plan.total_bytes(),
                payloads.len(),
                plan.total_chunks(),
                config.profile,
                output.display()
            );
        }
        Commands::Simulate { job, battery } => {
            let job = build_job(&config, &job)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(simulate(config, job, battery))?;
        }
    }

    Ok(())
}

/// Load and fit the photo, then apply config defaults and CLI overrides.
fn build_job(config: &SessionConfig, args: &JobArgs) -> Result<PrintJob, MiniPrintError> {
    let printer = PrinterConfig::default();
    let bitmap = load_photo(&args.image, printer.width_dots as u32)?;

    let mut job = config
        .job(bitmap)
        .printer(printer)
        .density(args.density)
        .text_mode(args.text_mode);
    if let Some(algorithm) = args.algorithm {
        job = job.algorithm(algorithm);
    }
    if let Some(threshold) = args.threshold {
        job = job.threshold(threshold);
    }
    if args.one_time_print {
        job = job.one_time_print(true);
    }
    Ok(job)
}

fn load_photo(path: &Path, width: u32) -> Result<miniprint::render::dither::Bitmap, MiniPrintError> {
    let bitmap = photo::load_fitted(path, width)?;
    log::info!(
        "loaded {} as {}x{}",
        path.display(),
        bitmap.width(),
        bitmap.height()
    );
    Ok(bitmap)
}

/// Drive one print through a session backed by [`MockTransport`].
async fn simulate(config: SessionConfig, job: PrintJob, battery: u8) -> Result<(), MiniPrintError> {
    let (events_tx, events_rx) = transport::event_channel();
    let mock = MockTransport::new(events_tx);
    let session = Session::spawn(mock.clone(), events_rx, config.clone())?;

    session.start_scan().await?;
    mock.advertise("sim-neighbour", Some("Headphones"), -48);
    mock.advertise("sim-printer", Some(config.device_name.as_str()), -62);

    let mut scan = session.subscribe_scan();
    let _ = scan.wait_for(|s| !s.searching).await;
    let devices = session.scan().devices;
    println!("Found {} devices:", devices.len());
    for device in &devices {
        match device.distance {
            Some(d) => println!("  {} ({}, ~{:.1} m)", device.display_name(), device.id, d),
            None => println!("  {} ({})", device.display_name(), device.id),
        }
    }

    let target = devices
        .first()
        .map(|d| d.id.clone())
        .ok_or(MiniPrintError::NotConnected)?;
    session.connect(target.clone()).await?;

    // The printer pushes a status frame every second once subscribed
    let heartbeat = {
        let mock = mock.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                mock.notify(&[battery, 30, 1, 0]);
            }
        })
    };

    let mut state = session.subscribe_state();
    let _ = state.wait_for(|s| *s == LinkState::Ready || s.is_terminal()).await;
    let status = session.status();
    println!(
        "Link {} to {} (battery {}%, {}°C, paper {:?})",
        session.state(),
        target,
        status.battery,
        status.temperature,
        status.paper
    );

    let mode = job.transfer_mode();
    let result = session.print(job).await;
    heartbeat.abort();
    let report = result?;
    println!(
        "Sent {} bytes in {} chunks ({}) in {:?}; {} writes at max {} bytes",
        report.bytes,
        report.chunks,
        mode,
        report.elapsed,
        mock.write_count(),
        mock.max_write_len(mode.write_mode()).min(config.profile.max_chunk_len())
    );

    session.disconnect().await?;
    session.shutdown().await;
    Ok(())
}
