// src/error.rs

//! Error kinds raised at the I/O boundary of the renderer.
//!
//! Evaluation itself never fails. Errors only come from retrieving window
//! events, dispatching draw requests, creating surfaces, and writing images.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// The connection to the X server is unusable. Always fatal.
    #[error("X connection error: {0}")]
    Connection(String),
    /// A draw request could not be delivered. The event loop keeps running.
    #[error("Draw dispatch failed: {0}")]
    Dispatch(String),
    /// The X server reported an asynchronous protocol error.
    #[error("X protocol error (error code {error_code}, request code {request_code})")]
    Protocol { error_code: u8, request_code: u8 },
    #[error("Invalid surface dimensions {width}x{height}")]
    InvalidSurfaceDimensions { width: u32, height: u32 },
    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

impl RenderError {
    /// Returns true when the event loop must stop after reporting this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::Connection(_))
    }
}
