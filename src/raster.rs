// src/raster.rs

//! Fixed-size raster: one scalar per pixel plus an interleaved RGBA8 buffer.

use crate::error::RenderError;
use log::info;
use std::path::Path;

/// Bytes per pixel in the colour buffer (R, G, B, A).
pub const BYTES_PER_PIXEL: usize = 4;

/// A `width` x `height` grid holding a `u64` value and an RGBA colour per pixel.
///
/// Invariants: `data.len() == width * height` and
/// `pixels.len() == 4 * width * height`.
#[derive(Debug, Clone)]
pub struct RasterBuffer {
    width: u16,
    height: u16,
    data: Vec<u64>,
    pixels: Vec<u8>,
}

impl RasterBuffer {
    /// Allocates a zeroed raster. Zero-sized rasters are rejected.
    pub fn new(width: u16, height: u16) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSurfaceDimensions {
                width: u32::from(width),
                height: u32::from(height),
            });
        }
        let pixel_count = usize::from(width) * usize::from(height);
        Ok(Self {
            width,
            height,
            data: vec![0; pixel_count],
            pixels: vec![0; pixel_count * BYTES_PER_PIXEL],
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }

    /// Linear index of `(x, y)`, if it lies inside the raster.
    pub fn index_of(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(usize::from(y) * usize::from(self.width) + usize::from(x))
        } else {
            None
        }
    }

    pub fn value(&self, pos: usize) -> Option<u64> {
        self.data.get(pos).copied()
    }

    /// # Panics
    /// Panics if `pos` is out of range.
    pub fn set_value(&mut self, pos: usize, value: u64) {
        self.data[pos] = value;
    }

    pub fn rgba(&self, pos: usize) -> Option<[u8; 4]> {
        let start = pos.checked_mul(BYTES_PER_PIXEL)?;
        let end = start.checked_add(BYTES_PER_PIXEL)?;
        let bytes = self.pixels.get(start..end)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// # Panics
    /// Panics if `pos` is out of range.
    pub fn set_rgba(&mut self, pos: usize, rgba: [u8; 4]) {
        let start = pos * BYTES_PER_PIXEL;
        self.pixels[start..start + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    pub fn data(&self) -> &[u64] {
        &self.data
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Writes the colour buffer to `path` as an RGBA8 PNG, unmodified.
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        info!(
            "Saving {}x{} image to: {}",
            self.width,
            self.height,
            path.display()
        );
        image::save_buffer_with_format(
            path,
            &self.pixels,
            u32::from(self.width),
            u32::from(self.height),
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
