// src/renderer.rs

//! Render passes: turn escape-time results into drawn points or raster pixels.
//!
//! A windowed pass walks an exposed rectangle row by row, evaluates every pixel
//! against the whole surface as the viewport (so partial exposures repaint a
//! consistent picture) and feeds the stable ones through a fresh
//! `PointBatcher`, which is flushed before the pass returns.

use crate::batch::{PointBatcher, DEFAULT_BATCH_CAPACITY};
use crate::error::RenderError;
use crate::fractal::EscapeParams;
use crate::platform::backends::MAX_POINT_COORD;
use crate::platform::{DrawDispatcher, Point, Rect};
use crate::raster::RasterBuffer;
use log::{debug, trace};

/// Colour of stable pixels in raster snapshots.
pub const STABLE_RGBA: [u8; 4] = [0, 0, 0, 255];

/// Outcome of a windowed render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegionReport {
    /// Stable points delivered to the dispatcher.
    pub stable_points: usize,
    /// Draw requests issued.
    pub dispatches: usize,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    params: EscapeParams,
    batch_capacity: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(EscapeParams::default(), DEFAULT_BATCH_CAPACITY)
    }
}

impl Renderer {
    pub fn new(params: EscapeParams, batch_capacity: usize) -> Self {
        Self {
            params,
            batch_capacity,
        }
    }

    /// Batch capacity to use against `dispatcher`: the configured capacity,
    /// capped by the protocol's per-request limit.
    pub fn effective_capacity<D: DrawDispatcher + ?Sized>(&self, dispatcher: &D) -> usize {
        self.batch_capacity
            .min(dispatcher.max_points_per_request())
            .max(1)
    }

    /// Renders the part of `region` that lies on a `surface_width` x
    /// `surface_height` surface.
    ///
    /// The trailing partial batch is always flushed before returning. The first
    /// dispatch failure aborts the pass and is returned to the caller.
    pub fn render_region<D: DrawDispatcher + ?Sized>(
        &self,
        dispatcher: &mut D,
        region: Rect,
        surface_width: u16,
        surface_height: u16,
    ) -> Result<RegionReport, RenderError> {
        let surface_width = surface_width.min(MAX_POINT_COORD);
        let surface_height = surface_height.min(MAX_POINT_COORD);
        let Some(region) = region.clip_to(surface_width, surface_height) else {
            trace!(
                "Renderer: region {:?} lies outside the {}x{} surface, skipping",
                region,
                surface_width,
                surface_height
            );
            return Ok(RegionReport::default());
        };

        let capacity = self.effective_capacity(dispatcher);
        let mut batcher = PointBatcher::new(dispatcher, capacity);
        let (width, height) = (u32::from(surface_width), u32::from(surface_height));

        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                let escape = self
                    .params
                    .evaluate(u32::from(x), u32::from(y), width, height);
                if escape.is_stable() {
                    // Both coordinates are below MAX_POINT_COORD after clipping.
                    batcher.add(Point::new(x as i16, y as i16))?;
                }
            }
        }
        batcher.flush()?;

        let report = RegionReport {
            stable_points: batcher.points_dispatched(),
            dispatches: batcher.dispatches(),
        };
        debug!(
            "Renderer: region {:?} produced {} stable points in {} requests (capacity {})",
            region, report.stable_points, report.dispatches, capacity
        );
        Ok(report)
    }

    /// Renders the whole raster: iteration counts go to the value map, stable
    /// pixels are painted black and escaped ones shade from white towards grey
    /// the longer they survived.
    pub fn render_to_raster(&self, raster: &mut RasterBuffer) {
        let (width, height) = (u32::from(raster.width()), u32::from(raster.height()));
        let max_iterations = self.params.max_iterations.max(1);

        for y in 0..raster.height() {
            for x in 0..raster.width() {
                let Some(pos) = raster.index_of(x, y) else {
                    continue;
                };
                let escape = self
                    .params
                    .evaluate(u32::from(x), u32::from(y), width, height);
                raster.set_value(pos, u64::from(escape.iterations));

                let rgba = if escape.is_stable() {
                    STABLE_RGBA
                } else {
                    let depth = u64::from(escape.iterations) * 128 / u64::from(max_iterations);
                    let shade = 255 - depth as u8;
                    [shade, shade, shade, 255]
                };
                raster.set_rgba(pos, rgba);
            }
        }
        debug!(
            "Renderer: filled {}x{} raster snapshot",
            raster.width(),
            raster.height()
        );
    }
}
