// src/fractal.rs

//! Escape-time evaluation of complex recurrences.
//!
//! Pixels are mapped onto a fixed window of the complex plane: the region
//! width spans 4 units starting at -2.5 on the real axis, and the region height
//! spans 4 units on the imaginary axis, mirrored so the top row holds the
//! highest imaginary value, with an offset of -2.0.
//!
//! Evaluation is pure: no state is shared between pixels, so they may be
//! evaluated in any order.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul};

/// Width and height of the viewport, in complex-plane units.
pub const VIEWPORT_SPAN: f64 = 4.0;
/// Real value of the left edge of the viewport.
pub const VIEWPORT_RE_OFFSET: f64 = -2.5;
/// Imaginary offset applied after mirroring the vertical axis.
pub const VIEWPORT_IM_OFFSET: f64 = -2.0;
/// Default per-component divergence bound.
pub const DEFAULT_ESCAPE_BOUND: f64 = 1e6;
/// Default iteration budget.
pub const DEFAULT_MAX_ITERATIONS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const ZERO: Complex = Complex { re: 0.0, im: 0.0 };

    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Folds both components into the positive quadrant.
    fn abs_components(self) -> Self {
        Self::new(self.re.abs(), self.im.abs())
    }

    fn exceeds(self, bound: f64) -> bool {
        // NaN and infinities count as diverged.
        !(self.re.abs() <= bound && self.im.abs() <= bound)
    }
}

impl Add for Complex {
    type Output = Complex;

    fn add(self, rhs: Complex) -> Complex {
        Complex::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Mul for Complex {
    type Output = Complex;

    fn mul(self, rhs: Complex) -> Complex {
        Complex::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

/// Why an evaluation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A component exceeded the escape bound.
    Diverged,
    /// The iteration budget ran out without diverging.
    Exhausted,
}

/// Result of evaluating one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escape {
    /// Number of passes survived, in `[0, max_iterations]`.
    pub iterations: u32,
    pub termination: Termination,
}

impl Escape {
    /// A stable pixel reached the iteration budget and is drawn.
    pub fn is_stable(&self) -> bool {
        self.termination == Termination::Exhausted
    }
}

/// Recurrence used for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Formula {
    /// `u <- u^2 + c`, `u` starting at zero, `c` the pixel.
    #[default]
    Mandelbrot,
    /// `u <- (|re u| + i|im u|)^2 + c`, `u` starting at zero, `c` the pixel.
    BurningShip,
    /// `u <- u^2 + c`, `u` starting at the pixel, `c` fixed.
    Julia { re: f64, im: f64 },
}

/// Maps a pixel onto the fixed complex viewport for a region of the given size.
pub fn pixel_to_complex(x: u32, y: u32, width: u32, height: u32) -> Complex {
    let re_scale = f64::from(width) / VIEWPORT_SPAN;
    let im_scale = f64::from(height) / VIEWPORT_SPAN;
    Complex::new(
        f64::from(x) / re_scale + VIEWPORT_RE_OFFSET,
        (f64::from(height) - f64::from(y)) / im_scale + VIEWPORT_IM_OFFSET,
    )
}

/// Everything that parameterises an evaluation besides the pixel itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscapeParams {
    pub formula: Formula,
    pub max_iterations: u32,
    pub escape_bound: f64,
}

impl Default for EscapeParams {
    fn default() -> Self {
        Self {
            formula: Formula::Mandelbrot,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            escape_bound: DEFAULT_ESCAPE_BOUND,
        }
    }
}

impl EscapeParams {
    /// Evaluates the pixel `(x, y)` of a `width` x `height` region.
    ///
    /// A zero-sized region has no viewport; its pixels are reported as diverged
    /// after zero passes (unless the budget itself is zero).
    pub fn evaluate(&self, x: u32, y: u32, width: u32, height: u32) -> Escape {
        if self.max_iterations == 0 {
            return Escape {
                iterations: 0,
                termination: Termination::Exhausted,
            };
        }
        if width == 0 || height == 0 {
            return Escape {
                iterations: 0,
                termination: Termination::Diverged,
            };
        }

        let point = pixel_to_complex(x, y, width, height);
        match self.formula {
            Formula::Mandelbrot => self.iterate(Complex::ZERO, point, false),
            Formula::BurningShip => self.iterate(Complex::ZERO, point, true),
            Formula::Julia { re, im } => self.iterate(point, Complex::new(re, im), false),
        }
    }

    fn iterate(&self, start: Complex, c: Complex, fold: bool) -> Escape {
        let mut u = start;
        let mut iterations = 0;
        while iterations < self.max_iterations {
            if fold {
                u = u.abs_components();
            }
            u = u * u + c;
            if u.exceeds(self.escape_bound) {
                return Escape {
                    iterations,
                    termination: Termination::Diverged,
                };
            }
            iterations += 1;
        }
        Escape {
            iterations,
            termination: Termination::Exhausted,
        }
    }
}

/// Mandelbrot escape time of a pixel with the default escape bound.
pub fn evaluate(x: u32, y: u32, width: u32, height: u32, max_iterations: u32) -> Escape {
    EscapeParams {
        max_iterations,
        ..EscapeParams::default()
    }
    .evaluate(x, y, width, height)
}
