// src/platform/backends/x11/graphics.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use super::connection::Connection;
use super::event::take_protocol_error;
use super::window::Window;
use crate::error::RenderError;
use crate::platform::backends::Point;

use anyhow::{anyhow, Result};
use log::{info, trace, warn};
use std::mem;
use std::ptr;

// X11 library imports
use libc::{c_int, c_ulong};
use x11::xlib;

/// Wraps an X11 `GC` (Graphics Context) to ensure it's freed via `XFreeGC` on drop.
#[derive(Debug)]
struct SafeGc {
    gc: xlib::GC,
    display: *mut xlib::Display,
}

impl SafeGc {
    fn new(gc: xlib::GC, display_ptr: *mut xlib::Display) -> Self {
        Self {
            gc,
            display: display_ptr,
        }
    }

    #[inline]
    fn raw(&self) -> xlib::GC {
        self.gc
    }

    /// Frees the GC now. Later calls and the drop become no-ops.
    fn release(&mut self) {
        if self.gc.is_null() {
            return;
        }
        if self.display.is_null() {
            warn!(
                "SafeGc::release called with a null display pointer. Cannot free GC: {:p}. This is a bug.",
                self.gc
            );
        } else {
            trace!("Freeing GC: {:p}", self.gc);
            // SAFETY: the GC was created on `display`, which is still open.
            unsafe { xlib::XFreeGC(self.display, self.gc) };
        }
        self.gc = ptr::null_mut();
    }
}

impl Drop for SafeGc {
    fn drop(&mut self) {
        self.release();
    }
}

/// Drawing state for the window: a GC whose foreground is the screen's
/// black pixel, with graphics exposures disabled.
#[derive(Debug)]
pub struct Graphics {
    gc: SafeGc,
}

impl Graphics {
    pub fn new(connection: &Connection, window: &Window) -> Result<Self> {
        let display = connection.display();
        // SAFETY: valid display and window; `values` outlives the call.
        let gc = unsafe {
            let mut values: xlib::XGCValues = mem::zeroed();
            values.foreground = connection.black_pixel();
            values.graphics_exposures = xlib::False;
            xlib::XCreateGC(
                display,
                window.id(),
                (xlib::GCForeground | xlib::GCGraphicsExposures) as c_ulong,
                &mut values,
            )
        };
        if gc.is_null() {
            return Err(anyhow!("XCreateGC failed for window {}", window.id()));
        }
        info!("Graphics context created: {:p}", gc);
        Ok(Self {
            gc: SafeGc::new(gc, display),
        })
    }

    /// Draws `points` with one PolyPoint request and waits for the server to
    /// process it, so any protocol error it caused is reported here.
    pub fn draw_points(
        &self,
        connection: &Connection,
        window: &Window,
        points: &[Point],
    ) -> Result<(), RenderError> {
        if points.is_empty() {
            return Ok(());
        }
        if !connection.is_open() {
            return Err(RenderError::Dispatch(
                "draw requested on a closed X display".to_string(),
            ));
        }
        if self.gc.raw().is_null() {
            return Err(RenderError::Dispatch(
                "draw requested after the graphics context was released".to_string(),
            ));
        }
        let count = c_int::try_from(points.len()).map_err(|_| {
            RenderError::Dispatch(format!("{} points exceed one request", points.len()))
        })?;
        let mut xpoints: Vec<xlib::XPoint> = points
            .iter()
            .map(|p| xlib::XPoint { x: p.x, y: p.y })
            .collect();

        // SAFETY: valid display, window and GC; `xpoints` holds `count` points.
        unsafe {
            xlib::XDrawPoints(
                connection.display(),
                window.id(),
                self.gc.raw(),
                xpoints.as_mut_ptr(),
                count,
                xlib::CoordModeOrigin,
            );
            xlib::XSync(connection.display(), xlib::False);
        }
        trace!("PolyPoint request with {} points confirmed", count);

        match take_protocol_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Frees the GC. Must run before the connection closes. Idempotent.
    pub fn cleanup(&mut self, connection: &Connection) {
        if connection.is_open() {
            self.gc.release();
        } else {
            // The server already freed it with the connection.
            self.gc.gc = ptr::null_mut();
        }
    }
}
