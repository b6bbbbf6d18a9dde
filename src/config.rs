// src/config.rs

//! Defines the configuration structures for `xfractal`.
//!
//! The configuration is read from a JSON file named by the `XFRACTAL_CONFIG`
//! environment variable. Every field has a default, so a missing file, a
//! missing section or a missing field all fall back to sensible values.

use crate::batch::DEFAULT_BATCH_CAPACITY;
use crate::error::RenderError;
use crate::fractal::{EscapeParams, Formula, DEFAULT_ESCAPE_BOUND, DEFAULT_MAX_ITERATIONS};
use crate::platform::backends::MAX_POINT_COORD;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the path of the JSON configuration file.
pub const CONFIG_ENV_VAR: &str = "XFRACTAL_CONFIG";

/// Process configuration, loaded on first use.
pub static CONFIG: Lazy<Config> = Lazy::new(|| match Config::load() {
    Ok(config) => config,
    Err(e) => {
        warn!("Failed to load configuration, using defaults: {:#}", e);
        Config::default()
    }
});

// --- Top-Level Configuration Structure ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Escape-time and batching settings.
    pub render: RenderConfig,
    /// Static image output settings.
    pub output: OutputConfig,
}

// --- Window Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Initial window width in pixels.
    pub width: u16,
    /// Initial window height in pixels.
    pub height: u16,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 200,
            height: 200,
            title: "xfractal".to_string(),
        }
    }
}

// --- Render Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Iteration budget; pixels that reach it are drawn.
    pub max_iterations: u32,
    /// Points per draw request. Further capped by the server's request limit.
    pub batch_capacity: usize,
    /// Per-component divergence bound.
    pub escape_bound: f64,
    pub formula: Formula,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            escape_bound: DEFAULT_ESCAPE_BOUND,
            formula: Formula::default(),
        }
    }
}

impl RenderConfig {
    pub fn escape_params(&self) -> EscapeParams {
        EscapeParams {
            formula: self.formula,
            max_iterations: self.max_iterations,
            escape_bound: self.escape_bound,
        }
    }
}

// --- Output Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Size of the images written by the `gradient` and `snapshot` commands.
    pub image_width: u16,
    pub image_height: u16,
    /// Default destination of the gradient image.
    pub gradient_path: PathBuf,
    /// Default destination of the fractal snapshot.
    pub snapshot_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            image_width: 400,
            image_height: 400,
            gradient_path: PathBuf::from("gradient.png"),
            snapshot_path: PathBuf::from("fractal.png"),
        }
    }
}

impl Config {
    /// Loads the file named by `XFRACTAL_CONFIG`, or the defaults when unset.
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => {
                info!("{} not set, using default configuration.", CONFIG_ENV_VAR);
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Rejects values the renderer cannot work with.
    pub fn validate(&self) -> Result<()> {
        let WindowConfig { width, height, .. } = self.window;
        if width == 0 || height == 0 || width > MAX_POINT_COORD || height > MAX_POINT_COORD {
            return Err(RenderError::InvalidSurfaceDimensions {
                width: width.into(),
                height: height.into(),
            })
            .context("Invalid window size");
        }
        if self.output.image_width == 0 || self.output.image_height == 0 {
            return Err(RenderError::InvalidSurfaceDimensions {
                width: self.output.image_width.into(),
                height: self.output.image_height.into(),
            })
            .context("Invalid output image size");
        }
        if self.render.batch_capacity == 0 {
            bail!("render.batch_capacity must be at least 1");
        }
        if !(self.render.escape_bound.is_finite() && self.render.escape_bound > 0.0) {
            bail!(
                "render.escape_bound must be a positive finite number, got {}",
                self.render.escape_bound
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_default_to_the_reference_parameters() {
        let config = Config::default();
        assert_eq!((config.window.width, config.window.height), (200, 200));
        assert_eq!(config.render.max_iterations, 30);
        assert_eq!(config.render.batch_capacity, 4096);
        assert_eq!(config.render.escape_bound, 1e6);
        assert_eq!(config.render.formula, Formula::Mandelbrot);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn it_should_fill_missing_fields_with_defaults() -> Result<()> {
        let config = Config::from_json_str(r#"{"window":{"width":640},"render":{"max_iterations":64}}"#)?;
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 200);
        assert_eq!(config.window.title, "xfractal");
        assert_eq!(config.render.max_iterations, 64);
        assert_eq!(config.render.batch_capacity, 4096);
        Ok(())
    }

    #[test]
    fn it_should_reject_zero_sized_windows() -> Result<()> {
        let config = Config::from_json_str(r#"{"window":{"width":0}}"#)?;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RenderError>(),
            Some(RenderError::InvalidSurfaceDimensions { width: 0, .. })
        ));
        Ok(())
    }

    #[test]
    fn it_should_reject_windows_beyond_the_point_range() -> Result<()> {
        let config = Config::from_json_str(r#"{"window":{"height":40000}}"#)?;
        assert!(config.validate().is_err());
        Ok(())
    }

    #[test]
    fn it_should_reject_an_empty_batch_capacity() -> Result<()> {
        let config = Config::from_json_str(r#"{"render":{"batch_capacity":0}}"#)?;
        assert!(config.validate().is_err());
        Ok(())
    }

    #[test]
    fn it_should_build_escape_params_from_the_render_section() -> Result<()> {
        let config = Config::from_json_str(
            r#"{"render":{"max_iterations":12,"escape_bound":4.0,"formula":{"kind":"burning_ship"}}}"#,
        )?;
        let params = config.render.escape_params();
        assert_eq!(params.max_iterations, 12);
        assert_eq!(params.escape_bound, 4.0);
        assert_eq!(params.formula, Formula::BurningShip);
        Ok(())
    }

    #[test]
    fn it_should_report_the_path_of_an_unreadable_file() {
        let err = Config::from_file(Path::new("/nonexistent/xfractal.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/xfractal.json"));
    }
}
