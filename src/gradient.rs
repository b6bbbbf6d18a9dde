// src/gradient.rs

//! Static gradient image: a linear "exponent map" colourised into RGBA.

use crate::raster::RasterBuffer;
use log::debug;

/// Fills `raster` with the gradient.
///
/// The value map holds `pos + 1` for each linear position. Red grows along each
/// row, green follows the squared fraction of the value map, blue grows with
/// the linear position. Channels saturate at 255; alpha is opaque.
pub fn fill_gradient(raster: &mut RasterBuffer) {
    let width = f64::from(raster.width());
    let height = f64::from(raster.height());
    let length = raster.pixel_count();

    for pos in 0..length {
        raster.set_value(pos, pos as u64 + 1);
    }

    for pos in 0..length {
        let column = (pos % usize::from(raster.width())) as f64;
        let fraction = raster.data()[pos] as f64 / length as f64;
        let rgba = [
            (128.0 * (column / width)) as u8,
            (100.0 + 100.0 * fraction * fraction) as u8,
            (128.0 * (pos as f64 / height) / height) as u8,
            255,
        ];
        raster.set_rgba(pos, rgba);
    }
    debug!(
        "Gradient filled for {}x{} raster",
        raster.width(),
        raster.height()
    );
}
