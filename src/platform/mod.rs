// src/platform/mod.rs
//
// This module re-exports the platform-specific functionality.

pub mod backends;
pub mod platform_trait;

pub use backends::x11::X11Session;
pub use backends::{Point, Rect, WindowEvent};
pub use platform_trait::{DrawDispatcher, EventSource, Session};
