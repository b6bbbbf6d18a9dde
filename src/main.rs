// In src/main.rs

// Declare modules
pub mod batch;
pub mod config;
pub mod error;
pub mod fractal;
pub mod gradient;
pub mod orchestrator;
pub mod platform;
pub mod raster;
pub mod renderer;

use crate::{
    config::{Config, CONFIG},
    platform::X11Session,
    raster::RasterBuffer,
    renderer::Renderer,
};

use anyhow::{bail, Context};
use log::info;
use std::path::PathBuf;

/// What the process was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Open the X11 window and render incrementally.
    Window,
    /// Write the colour gradient PNG, to the configured path unless one is given.
    Gradient(Option<PathBuf>),
    /// Write a PNG snapshot of the fractal.
    Snapshot(Option<PathBuf>),
}

impl Command {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Self> {
        let mut args = args.into_iter();
        let command = match args.next().as_deref() {
            None | Some("window") => Command::Window,
            Some("gradient") => Command::Gradient(args.next().map(PathBuf::from)),
            Some("snapshot") => Command::Snapshot(args.next().map(PathBuf::from)),
            Some(other) => bail!(
                "Unknown command '{}'. Usage: xfractal [window|gradient [PATH]|snapshot [PATH]]",
                other
            ),
        };
        if let Some(extra) = args.next() {
            bail!("Unexpected argument '{}'", extra);
        }
        Ok(command)
    }
}

/// Main entry point for the `xfractal` application.
fn main() -> anyhow::Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting xfractal...");

    let command = Command::parse(std::env::args().skip(1))?;
    let config: &Config = &CONFIG;
    config.validate().context("Invalid configuration")?;

    match command {
        Command::Window => run_window(config),
        Command::Gradient(path) => {
            let path = path.unwrap_or_else(|| config.output.gradient_path.clone());
            let mut raster = output_raster(config)?;
            gradient::fill_gradient(&mut raster);
            raster
                .save_png(&path)
                .with_context(|| format!("Failed to write gradient to {}", path.display()))?;
            info!("Gradient written to {}", path.display());
            Ok(())
        }
        Command::Snapshot(path) => {
            let path = path.unwrap_or_else(|| config.output.snapshot_path.clone());
            let mut raster = output_raster(config)?;
            renderer_from(config).render_to_raster(&mut raster);
            raster
                .save_png(&path)
                .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
            info!("Snapshot written to {}", path.display());
            Ok(())
        }
    }
}

fn renderer_from(config: &Config) -> Renderer {
    Renderer::new(config.render.escape_params(), config.render.batch_capacity)
}

fn output_raster(config: &Config) -> anyhow::Result<RasterBuffer> {
    RasterBuffer::new(config.output.image_width, config.output.image_height)
        .context("Failed to allocate output image")
}

fn run_window(config: &Config) -> anyhow::Result<()> {
    let mut session = X11Session::open(&config.window).context("Failed to open X11 session")?;
    info!(
        "Window {}x{} open, rendering {:?} with up to {} iterations.",
        config.window.width,
        config.window.height,
        config.render.formula,
        config.render.max_iterations
    );

    // --- Main Event Loop ---
    orchestrator::run_session(&mut session, renderer_from(config))?;
    info!("xfractal exited successfully.");
    Ok(())
}
