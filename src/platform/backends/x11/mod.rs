// src/platform/backends/x11/mod.rs

//! X11 session for the fractal window.
//!
//! `X11Session` ties together the submodules, each of which owns one concern:
//! - `connection`: the display connection and default-screen resources.
//! - `window`: window creation, window-manager protocols and cached size.
//! - `graphics`: the graphics context and PolyPoint draw requests.
//! - `event`: blocking event retrieval and protocol error reporting.

use crate::config::WindowConfig;
use crate::error::RenderError;
use crate::platform::backends::{Point, WindowEvent, MAX_POINT_COORD};
use crate::platform::platform_trait::{DrawDispatcher, EventSource, Session};
use anyhow::{Context, Result};
use log::{error, info};

pub mod connection;
pub mod event;
pub mod graphics;
pub mod window;

use connection::Connection;
use graphics::Graphics;
use window::Window;

/// One connection, one window and one graphics context.
///
/// Resources are released in reverse order of creation by `cleanup`, which
/// `Drop` also calls.
pub struct X11Session {
    connection: Connection,
    window: Window,
    graphics: Graphics,
    max_points: usize,
}

impl X11Session {
    /// Connects to the server, creates and maps the window described by `config`.
    pub fn open(config: &WindowConfig) -> Result<Self> {
        info!("X11Session::open() called - initializing X11 session.");
        let (width, height) = (config.width, config.height);
        if width == 0 || height == 0 || width > MAX_POINT_COORD || height > MAX_POINT_COORD {
            return Err(RenderError::InvalidSurfaceDimensions {
                width: width.into(),
                height: height.into(),
            })
            .context("Cannot open X11 window");
        }

        event::install_error_handlers();
        let connection = Connection::new().context("Failed to establish X11 connection")?;

        let mut window = Window::new(&connection, width, height)
            .context("Failed to create X11 window")?;
        if let Err(e) = window.setup_protocols_and_title(&connection, &config.title) {
            window.cleanup(&connection);
            return Err(e.context("Failed to configure X11 window"));
        }

        let graphics = match Graphics::new(&connection, &window) {
            Ok(graphics) => graphics,
            Err(e) => {
                window.cleanup(&connection);
                return Err(e.context("Failed to create graphics context"));
            }
        };

        let max_points = connection.max_points_per_request();
        info!("Server accepts up to {} points per request.", max_points);

        window.map_and_flush(&connection);
        info!("X11Session initialized successfully.");
        Ok(Self {
            connection,
            window,
            graphics,
            max_points,
        })
    }
}

impl EventSource for X11Session {
    fn wait_for_event(&mut self) -> Result<WindowEvent, RenderError> {
        event::wait_for_event(&self.connection, &mut self.window)
    }
}

impl DrawDispatcher for X11Session {
    fn dispatch_points(&mut self, points: &[Point]) -> Result<(), RenderError> {
        self.graphics
            .draw_points(&self.connection, &self.window, points)
    }

    fn max_points_per_request(&self) -> usize {
        self.max_points
    }
}

impl Session for X11Session {
    fn surface_size(&self) -> (u16, u16) {
        self.window.current_dimensions_pixels()
    }

    fn cleanup(&mut self) -> Result<()> {
        info!("X11Session::cleanup() called. Releasing X11 resources.");
        self.graphics.cleanup(&self.connection);
        self.window.cleanup(&self.connection);
        self.connection.cleanup()
    }
}

impl Drop for X11Session {
    fn drop(&mut self) {
        if let Err(e) = Session::cleanup(self) {
            error!("Error during X11Session cleanup in drop: {:#}", e);
        }
    }
}
