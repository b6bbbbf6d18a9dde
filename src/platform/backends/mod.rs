// src/platform/backends/mod.rs

//! Types shared by the window backends and the render loop: the events a
//! backend delivers, the rectangles it reports and the points it draws.

#[cfg(test)]
pub mod mock;
pub mod x11;

/// Largest coordinate a drawn point can carry (X11 points are signed 16-bit).
pub const MAX_POINT_COORD: u16 = i16::MAX as u16;

/// A pixel position on the drawing surface.
///
/// Layout matches `XPoint`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    pub fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Number of pixels covered by the rectangle.
    pub fn pixel_count(&self) -> u32 {
        u32::from(self.width) * u32::from(self.height)
    }

    /// Intersects the rectangle with a `width` x `height` surface anchored at
    /// the origin. Returns `None` when nothing remains.
    pub fn clip_to(&self, width: u16, height: u16) -> Option<Rect> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let clipped = Rect {
            x: self.x,
            y: self.y,
            width: self.width.min(width - self.x),
            height: self.height.min(height - self.y),
        };
        if clipped.width == 0 || clipped.height == 0 {
            None
        } else {
            Some(clipped)
        }
    }
}

/// Events delivered by a window backend, consumed once by the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// A region of the window needs repainting.
    RegionExposed(Rect),
    /// The window's structure changed; carries the current size.
    StructureChanged { width: u16, height: u16 },
    KeyPressed { keycode: u32 },
    KeyReleased { keycode: u32 },
    /// The connection ended cleanly (no event and no error left).
    ConnectionClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_clip_rectangles_to_the_surface() {
        let rect = Rect::new(150, 180, 100, 100);
        assert_eq!(rect.clip_to(200, 200), Some(Rect::new(150, 180, 50, 20)));
    }

    #[test]
    fn it_should_drop_rectangles_outside_the_surface() {
        assert_eq!(Rect::new(200, 0, 10, 10).clip_to(200, 200), None);
        assert_eq!(Rect::new(0, 0, 0, 10).clip_to(200, 200), None);
    }

    #[test]
    fn it_should_count_rectangle_pixels() {
        assert_eq!(Rect::new(0, 0, 640, 480).pixel_count(), 307_200);
    }
}
