// src/platform/backends/x11/connection.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use std::os::unix::io::RawFd;
use std::ptr;

// X11 library imports
use libc::c_int;
use x11::xlib;

/// Size in 4-byte units of the fixed part of a PolyPoint request.
const POLY_POINT_HEADER_UNITS: usize = 3;

/// Manages an X11 Display connection, ensuring it's closed on drop.
#[derive(Debug)]
struct ManagedDisplay {
    ptr: *mut xlib::Display,
}

impl ManagedDisplay {
    /// Opens a connection to the server named by `DISPLAY`.
    pub fn new() -> Result<Self> {
        let display_ptr = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if display_ptr.is_null() {
            Err(anyhow!(
                "Failed to open X display. Check DISPLAY environment variable or X server status."
            ))
        } else {
            debug!("X display opened: {:p}", display_ptr);
            Ok(Self { ptr: display_ptr })
        }
    }

    #[inline]
    pub fn raw(&self) -> *mut xlib::Display {
        self.ptr
    }
}

impl Drop for ManagedDisplay {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            info!("Closing X11 display connection: {:p}", self.ptr);
            unsafe {
                let status = xlib::XCloseDisplay(self.ptr);
                if status != 0 {
                    warn!(
                        "XCloseDisplay returned non-zero status: {}. Display may not have closed cleanly.",
                        status
                    );
                }
            }
        }
    }
}

/// The connection to the X server and the default-screen resources the
/// session needs: root window, depth, visual and the black/white pixels.
///
/// The display is closed when this struct is dropped unless `cleanup` already
/// released it.
#[derive(Debug)]
pub struct Connection {
    managed_display: ManagedDisplay,
    root: xlib::Window,
    depth: c_int,
    visual: *mut xlib::Visual,
    black_pixel: u64,
    white_pixel: u64,
}

impl Connection {
    /// Connects to the X server named by `DISPLAY` and reads the default screen.
    pub fn new() -> Result<Self> {
        info!("Establishing X11 server connection.");

        let managed_display = ManagedDisplay::new()?;
        let display = managed_display.raw();

        // SAFETY: `display` is a valid, open display for all calls below.
        let (screen, root, depth, visual, black_pixel, white_pixel) = unsafe {
            let screen = xlib::XDefaultScreen(display);
            (
                screen,
                xlib::XRootWindow(display, screen),
                xlib::XDefaultDepth(display, screen),
                xlib::XDefaultVisual(display, screen),
                xlib::XBlackPixel(display, screen),
                xlib::XWhitePixel(display, screen),
            )
        };
        if visual.is_null() {
            // ManagedDisplay's Drop closes the display.
            return Err(anyhow!(
                "Failed to get default visual for screen {}.",
                screen
            ));
        }
        debug!(
            "Default screen {}: root={}, depth={}, visual={:p}",
            screen, root, depth, visual
        );

        info!("X11 server connection established successfully.");
        Ok(Connection {
            managed_display,
            root,
            depth,
            visual,
            black_pixel,
            white_pixel,
        })
    }

    /// Closes the display now, turning the later drop into a no-op. Idempotent.
    pub fn cleanup(&mut self) -> Result<()> {
        if !self.managed_display.ptr.is_null() {
            info!(
                "Releasing X11 display connection: {:p}",
                self.managed_display.ptr
            );
            unsafe {
                xlib::XCloseDisplay(self.managed_display.ptr);
            }
            self.managed_display.ptr = ptr::null_mut();
        } else {
            debug!("X11 display connection already closed. Cleanup skipped.");
        }
        Ok(())
    }

    /// Returns the raw display pointer. Invalid after `cleanup` or drop.
    #[inline]
    pub fn display(&self) -> *mut xlib::Display {
        self.managed_display.raw()
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        !self.managed_display.ptr.is_null()
    }

    #[inline]
    pub fn root(&self) -> xlib::Window {
        self.root
    }

    #[inline]
    pub fn depth(&self) -> c_int {
        self.depth
    }

    #[inline]
    pub fn visual(&self) -> *mut xlib::Visual {
        self.visual
    }

    #[inline]
    pub fn black_pixel(&self) -> u64 {
        self.black_pixel
    }

    #[inline]
    pub fn white_pixel(&self) -> u64 {
        self.white_pixel
    }

    /// File descriptor of the X connection, for readiness polling.
    pub fn event_fd(&self) -> Option<RawFd> {
        if !self.is_open() {
            warn!("event_fd called on a closed X display.");
            None
        } else {
            // SAFETY: XConnectionNumber is safe with a valid, non-null display.
            Some(unsafe { xlib::XConnectionNumber(self.display()) })
        }
    }

    /// Number of points a single PolyPoint request may carry on this server.
    pub fn max_points_per_request(&self) -> usize {
        if !self.is_open() {
            return 0;
        }
        // SAFETY: valid display. Both values are in 4-byte units; one point is one unit.
        let units = unsafe {
            let extended = xlib::XExtendedMaxRequestSize(self.display());
            if extended > 0 {
                extended
            } else {
                xlib::XMaxRequestSize(self.display())
            }
        };
        max_points_for_request_units(units as usize)
    }
}

/// Points that fit in a request of `units` 4-byte units.
fn max_points_for_request_units(units: usize) -> usize {
    units.saturating_sub(POLY_POINT_HEADER_UNITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_connection() -> Connection {
        Connection {
            managed_display: ManagedDisplay {
                ptr: ptr::null_mut(),
            },
            root: 0,
            depth: 24,
            visual: ptr::null_mut(),
            black_pixel: 0,
            white_pixel: 0xffffff,
        }
    }

    #[test]
    fn it_should_allow_repeated_cleanup_of_a_closed_connection() {
        let mut conn = closed_connection();
        assert!(conn.cleanup().is_ok());
        assert!(conn.cleanup().is_ok());
        assert!(!conn.is_open());
    }

    #[test]
    fn it_should_not_report_an_event_fd_for_a_closed_connection() {
        assert!(closed_connection().event_fd().is_none());
    }

    #[test]
    fn it_should_not_allow_points_on_a_closed_connection() {
        assert_eq!(closed_connection().max_points_per_request(), 0);
    }

    #[test]
    fn it_should_subtract_the_request_header_from_the_point_budget() {
        // The core protocol guarantees at least 4096 units per request.
        assert_eq!(max_points_for_request_units(4096), 4093);
        assert_eq!(max_points_for_request_units(65535), 65532);
        assert_eq!(max_points_for_request_units(2), 0);
    }
}
