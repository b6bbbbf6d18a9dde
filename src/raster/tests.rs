// src/raster/tests.rs

use super::*;
use test_log::test;

#[test]
fn it_should_reject_zero_sized_rasters() {
    for (width, height) in [(0, 10), (10, 0), (0, 0)] {
        let err = RasterBuffer::new(width, height).unwrap_err();
        assert!(matches!(
            err,
            RenderError::InvalidSurfaceDimensions { .. }
        ));
    }
}

#[test]
fn it_should_size_buffers_from_the_dimensions() -> Result<(), RenderError> {
    let raster = RasterBuffer::new(7, 3)?;
    assert_eq!(raster.pixel_count(), 21);
    assert_eq!(raster.data().len(), 21);
    assert_eq!(raster.pixels().len(), 4 * 21);
    Ok(())
}

#[test]
fn it_should_index_pixels_row_major() -> Result<(), RenderError> {
    let raster = RasterBuffer::new(5, 4)?;
    assert_eq!(raster.index_of(0, 0), Some(0));
    assert_eq!(raster.index_of(4, 0), Some(4));
    assert_eq!(raster.index_of(0, 1), Some(5));
    assert_eq!(raster.index_of(4, 3), Some(19));
    assert_eq!(raster.index_of(5, 0), None);
    assert_eq!(raster.index_of(0, 4), None);
    Ok(())
}

#[test]
fn it_should_read_back_written_values_and_colours() -> Result<(), RenderError> {
    let mut raster = RasterBuffer::new(3, 3)?;
    raster.set_value(4, 42);
    raster.set_rgba(4, [1, 2, 3, 4]);

    assert_eq!(raster.value(4), Some(42));
    assert_eq!(raster.rgba(4), Some([1, 2, 3, 4]));
    assert_eq!(&raster.pixels()[16..20], &[1, 2, 3, 4]);
    assert_eq!(raster.value(9), None);
    assert_eq!(raster.rgba(9), None);
    Ok(())
}

#[test]
fn it_should_return_none_for_positions_far_out_of_range() -> Result<(), RenderError> {
    let raster = RasterBuffer::new(2, 2)?;
    assert_eq!(raster.rgba(usize::MAX / 4), None);
    assert_eq!(raster.rgba(usize::MAX), None);
    assert_eq!(raster.value(usize::MAX), None);
    Ok(())
}

#[test]
fn it_should_write_the_colour_buffer_as_png() -> anyhow::Result<()> {
    let mut raster = RasterBuffer::new(2, 2)?;
    raster.set_rgba(0, [255, 0, 0, 255]);
    raster.set_rgba(1, [0, 255, 0, 255]);
    raster.set_rgba(2, [0, 0, 255, 255]);
    raster.set_rgba(3, [10, 20, 30, 40]);

    let path = std::env::temp_dir().join(format!("xfractal-raster-{}.png", std::process::id()));
    raster.save_png(&path)?;

    let decoded = image::open(&path)?.to_rgba8();
    std::fs::remove_file(&path)?;
    assert_eq!(decoded.dimensions(), (2, 2));
    assert_eq!(decoded.as_raw().as_slice(), raster.pixels());
    Ok(())
}
