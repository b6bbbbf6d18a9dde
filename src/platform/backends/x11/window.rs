// src/platform/backends/x11/window.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use super::connection::Connection;
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use std::ffi::CString;
use std::mem;

// X11 library imports
use libc::{c_char, c_int, c_uint};
use x11::xlib;

/// Events the window subscribes to: exposure, structure changes and keys.
const WINDOW_EVENT_MASK: libc::c_long = xlib::ExposureMask
    | xlib::StructureNotifyMask
    | xlib::KeyPressMask
    | xlib::KeyReleaseMask;

/// An X11 window with a white background and the event subscriptions the
/// render loop relies on.
///
/// `cleanup` must be called before the `Connection` is closed; `Drop` only
/// logs when that did not happen.
#[derive(Debug)]
pub struct Window {
    id: xlib::Window,
    wm_delete_window: xlib::Atom, // Atom for WM_DELETE_WINDOW protocol
    protocols_atom: xlib::Atom,   // Atom for WM_PROTOCOLS
    current_pixel_width: u16,
    current_pixel_height: u16,
}

impl Window {
    /// Creates (but does not map) a `width_px` x `height_px` window on the
    /// default screen.
    pub fn new(connection: &Connection, width_px: u16, height_px: u16) -> Result<Self> {
        info!("Creating X11 window: {}x{}px", width_px, height_px);
        let display = connection.display();

        // SAFETY: FFI calls on a valid display; `attributes` outlives the call.
        let window_id = unsafe {
            let mut attributes: xlib::XSetWindowAttributes = mem::zeroed();
            attributes.background_pixel = connection.white_pixel();
            attributes.event_mask = WINDOW_EVENT_MASK;

            xlib::XCreateWindow(
                display,
                connection.root(),
                0,
                0,
                c_uint::from(width_px),
                c_uint::from(height_px),
                0, // border width
                connection.depth(),
                xlib::InputOutput as c_uint,
                connection.visual(),
                xlib::CWBackPixel | xlib::CWEventMask,
                &mut attributes,
            )
        };

        if window_id == 0 {
            return Err(anyhow!("XCreateWindow failed"));
        }
        debug!(
            "X window created (ID: {}), initial size: {}x{}",
            window_id, width_px, height_px
        );

        Ok(Self {
            id: window_id,
            wm_delete_window: 0,
            protocols_atom: 0,
            current_pixel_width: width_px,
            current_pixel_height: height_px,
        })
    }

    /// Registers `WM_DELETE_WINDOW` and sets the window title.
    pub fn setup_protocols_and_title(&mut self, connection: &Connection, title: &str) -> Result<()> {
        let display = connection.display();
        let title_cstr =
            CString::new(title).context("Failed to create CString for window title")?;

        // SAFETY: FFI calls on a valid display and window.
        unsafe {
            self.wm_delete_window = xlib::XInternAtom(
                display,
                b"WM_DELETE_WINDOW\0".as_ptr() as *const c_char,
                xlib::False,
            );
            self.protocols_atom = xlib::XInternAtom(
                display,
                b"WM_PROTOCOLS\0".as_ptr() as *const c_char,
                xlib::False,
            );

            if self.wm_delete_window != 0 && self.protocols_atom != 0 {
                xlib::XSetWMProtocols(display, self.id, [self.wm_delete_window].as_mut_ptr(), 1);
                debug!("WM_PROTOCOLS (WM_DELETE_WINDOW) registered.");
            } else {
                warn!("Failed to get WM_DELETE_WINDOW or WM_PROTOCOLS atom. Window close events might not be received.");
            }

            xlib::XStoreName(display, self.id, title_cstr.as_ptr() as *mut c_char);
        }
        debug!("Window title set to: {}", title);
        Ok(())
    }

    /// Maps the window and flushes the request buffer.
    pub fn map_and_flush(&self, connection: &Connection) {
        info!("Mapping window ID: {} and flushing display.", self.id);
        // SAFETY: valid display and window.
        unsafe {
            xlib::XMapWindow(connection.display(), self.id);
            xlib::XFlush(connection.display());
        }
    }

    /// Destroys the window on the server. Idempotent.
    pub fn cleanup(&mut self, connection: &Connection) {
        if self.id == 0 {
            return;
        }
        if connection.is_open() {
            info!("Destroying X window ID: {}", self.id);
            // SAFETY: valid display and window.
            unsafe {
                xlib::XDestroyWindow(connection.display(), self.id);
                xlib::XFlush(connection.display());
            }
        } else {
            warn!(
                "Window {} cleanup after the connection closed; the server already released it.",
                self.id
            );
        }
        self.id = 0;
    }

    #[inline]
    pub fn id(&self) -> xlib::Window {
        self.id
    }

    #[inline]
    pub fn wm_delete_window_atom(&self) -> xlib::Atom {
        self.wm_delete_window
    }

    #[inline]
    pub fn protocols_atom(&self) -> xlib::Atom {
        self.protocols_atom
    }

    /// Size last reported by the server (or requested at creation).
    #[inline]
    pub fn current_dimensions_pixels(&self) -> (u16, u16) {
        (self.current_pixel_width, self.current_pixel_height)
    }

    /// Records a size reported by `ConfigureNotify`. Returns true when it changed.
    pub fn update_dimensions(&mut self, width_px: u16, height_px: u16) -> bool {
        if self.current_pixel_width == width_px && self.current_pixel_height == height_px {
            return false;
        }
        debug!(
            "Updating cached window dimensions from {}x{} to {}x{}",
            self.current_pixel_width, self.current_pixel_height, width_px, height_px
        );
        self.current_pixel_width = width_px;
        self.current_pixel_height = height_px;
        true
    }
}

/// Safeguard only: Xlib cannot be called here without the connection.
impl Drop for Window {
    fn drop(&mut self) {
        if self.id != 0 {
            error!(
                "Window (ID: {}) dropped without explicit cleanup. Server resources may leak.",
                self.id
            );
        }
    }
}

#[cfg(test)]
impl Window {
    /// A window value with no server-side counterpart.
    pub(super) fn detached(
        width_px: u16,
        height_px: u16,
        protocols_atom: xlib::Atom,
        wm_delete_window: xlib::Atom,
    ) -> Self {
        Self {
            id: 0,
            wm_delete_window,
            protocols_atom,
            current_pixel_width: width_px,
            current_pixel_height: height_px,
        }
    }
}

/// Clamps a size reported by the server into the `u16` range.
pub(super) fn clamp_dimension(value: c_int) -> u16 {
    value.clamp(0, c_int::from(u16::MAX)) as u16
}
