//! Kinect recording tool application library.
//!
//! Wires the engine thread, an event printer and the interactive shell
//! together over the IPC channels.

mod config;
mod shell;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context};
use clap::Parser;
use crossbeam_channel::Receiver;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kinect_device::{SyntheticProvider, SyntheticSensor};
use kinect_engine::create_engine;
use kinect_ipc::{command_channel, event_channel, EngineEvent};

pub use config::{apply_output_dir, load_config};
pub use shell::{describe_event, parse_line, run_shell, ShellInput};

/// Record color video, microphone audio and tracked skeletons.
#[derive(Debug, Parser)]
#[command(name = "kinect-tool", version, about)]
pub struct Args {
    /// JSON session configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write every recording under this directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging();
    info!("Kinect tool starting");

    let mut config = load_config(args.config.as_deref())?;
    if let Some(dir) = &args.output_dir {
        apply_output_dir(&mut config, dir);
    }

    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();

    // No hardware backend is linked in; the synthetic sensor stands in.
    let provider = Arc::new(SyntheticProvider::new(Arc::new(SyntheticSensor::generating())));
    let mut engine = create_engine(command_rx, event_tx, config, provider);
    let previews = engine.previews();

    let engine_thread = thread::Builder::new()
        .name("engine".into())
        .spawn(move || {
            info!("Engine thread starting");
            engine.run();
            info!("Engine thread stopped");
        })
        .context("spawning engine thread")?;

    let printer_thread = thread::Builder::new()
        .name("events".into())
        .spawn(move || print_events(event_rx))
        .context("spawning event printer thread")?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_shell(stdin.lock(), &mut stdout, &command_tx, &previews)?;
    drop(command_tx);

    engine_thread
        .join()
        .map_err(|_| anyhow!("engine thread panicked"))?;
    printer_thread
        .join()
        .map_err(|_| anyhow!("event printer thread panicked"))?;

    info!("Kinect tool stopped");
    Ok(())
}

/// Print engine events until the engine drops its sender.
fn print_events(event_rx: Receiver<EngineEvent>) {
    for event in event_rx.iter() {
        if let EngineEvent::Error { .. } = &event {
            warn!(?event, "Engine reported an error");
        }
        if let Some(line) = describe_event(&event) {
            println!("{}", line);
        }
    }
}
