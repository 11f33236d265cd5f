use crate::types::{Point, Value};

/// Axis-aligned box that the sampling grid is laid over.
///
/// `min <= max` on every axis for sensible parameters, but nothing enforces it:
/// a negative span or a NaN half-width simply produces an inverted or NaN box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Width of the box along X. The grid sampler derives its step from this axis only.
    #[inline]
    pub fn extent_x(&self) -> Value {
        self.max.x - self.min.x
    }
}

/// Half-width of the bounding cube: `(span / 2)^zoom`.
///
/// Uses [`f64::powf`], so a negative base with a fractional exponent yields NaN.
#[inline]
pub fn half_extent(span: Value, zoom: Value) -> Value {
    (span / 2.).powf(zoom)
}

/// Returns the cube of half-width `(span / 2)^zoom` around `center`.
///
/// ```text
///  min = center - (span/2)^zoom
///  max = center + (span/2)^zoom
/// ```
///
/// The same half-width is used on all three axes.
#[inline]
pub fn compute_bounds(center: Point, span: Value, zoom: Value) -> Bounds {
    let half = half_extent(span, zoom);
    Bounds {
        min: Point::new(center.x - half, center.y - half, center.z - half),
        max: Point::new(center.x + half, center.y + half, center.z + half),
    }
}
