// This is free and unencumbered software released into the public domain.

#[cfg(not(feature = "cli"))]
compile_error!("camsession-snap requires the 'cli' feature");

use camsession::cli::{handle_error, info_user};
use camsession::shared::backends::sim::SimPlatform;
use camsession::shared::{
    CameraError, Facing, Rotation, SessionConfig, SessionManager,
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exercise the camera session lifecycle against the simulated platform:
/// take a still, optionally record a clip, and print the saved paths.
#[derive(Debug, Parser)]
struct Options {
    /// Camera facing direction (front or back).
    #[arg(long, default_value = "back", value_parser = parse_facing)]
    facing: Facing,

    /// Directory for saved media.
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Record a clip of this many seconds instead of taking a photo.
    #[arg(short, long, value_name = "SECONDS")]
    record: Option<u64>,

    /// Switch to the opposite camera before capturing.
    #[arg(long)]
    switch: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let options = Options::parse();

    let default_level = match options.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => handle_error(&err, options.verbose),
    }
}

fn run(opts: &Options) -> Result<(), CameraError> {
    std::fs::create_dir_all(&opts.dir).map_err(|e| CameraError::storage(&opts.dir, e))?;

    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit2 = Arc::clone(&quit);
        ctrlc::set_handler(move || {
            quit2.store(true, Ordering::SeqCst);
        })
        .map_err(|e| CameraError::device("installing signal handler", e))?;
    }

    let config = SessionConfig::new(opts.facing)
        .with_media_dir(opts.dir.clone())
        .with_diagnostics(opts.verbose >= 3);
    let mut manager = SessionManager::new(Box::new(SimPlatform::new()), config)
        .with_observer(Arc::new(|path| println!("{}", path.display())));

    info_user(opts.verbose, &format!("opening {} camera", opts.facing));
    manager.open()?;

    if opts.switch {
        info_user(opts.verbose, "switching to the opposite camera");
        manager.switch_facing()?;
    }

    if let Some(seconds) = opts.record {
        let clip = opts.dir.join("clip.mp4");
        info_user(
            opts.verbose,
            &format!("recording {seconds}s to {}", clip.display()),
        );
        manager.begin_recording(&clip)?;

        let mut remaining = seconds.saturating_mul(20);
        while remaining > 0 && !quit.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(50));
            remaining -= 1;
        }

        manager.end_recording()?;
    } else {
        info_user(opts.verbose, "taking a photo");
        manager.begin_still_capture(Rotation::Deg0)?;
    }

    manager.close();
    Ok(())
}

fn parse_facing(s: &str) -> Result<Facing, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "front" => Ok(Facing::Front),
        "back" => Ok(Facing::Back),
        other => Err(format!("invalid facing '{other}'. Use 'front' or 'back'")),
    }
}
