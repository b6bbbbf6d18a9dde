// src/platform/platform_trait.rs
//
// Defines the traits that separate the render loop from the windowing system.

use crate::error::RenderError;
use crate::platform::backends::{Point, WindowEvent};
use anyhow::Result;

/// Source of window events.
pub trait EventSource {
    /// Blocks until the next event is available.
    ///
    /// `Ok(WindowEvent::ConnectionClosed)` signals a clean end of the event
    /// stream and is distinct from an `Err`, which carries a protocol or
    /// connection failure.
    fn wait_for_event(&mut self) -> Result<WindowEvent, RenderError>;
}

/// Emits batches of points onto the render target.
pub trait DrawDispatcher {
    /// Draws every point in `points` with a single protocol request.
    ///
    /// Callers must not pass more than `max_points_per_request()` points.
    fn dispatch_points(&mut self, points: &[Point]) -> Result<(), RenderError>;

    /// Largest number of points a single request may carry.
    fn max_points_per_request(&self) -> usize;
}

/// An established window session: one connection, one window, one drawing
/// context, passed explicitly to the render loop.
pub trait Session: EventSource + DrawDispatcher {
    /// Current size of the drawing surface in pixels.
    fn surface_size(&self) -> (u16, u16);

    /// Releases server-side resources. Safe to call more than once.
    fn cleanup(&mut self) -> Result<()>;
}
