use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::types::{Exponent, Point, Value};

/// How the azimuth `theta` is recovered from `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArctanMode {
    /// `atan(y / x)`.
    ///
    /// Points with `x < 0` share the angle of their `x > 0` mirror, and `x = 0`
    /// divides by zero. This is the default.
    #[default]
    Single,
    /// `atan2(y, x)`, quadrant aware.
    Quadrant,
}

impl ArctanMode {
    #[inline]
    pub fn theta(self, x: Value, y: Value) -> Value {
        match self {
            ArctanMode::Single => (y / x).atan(),
            ArctanMode::Quadrant => y.atan2(x),
        }
    }
}

/// Raises a triplex to the power `n` using the spherical power rule.
///
/// ```text
/// r     = |p|
/// theta = atan(y / x)
/// phi   = asin(z / r)
///
/// x' = r^n cos(n theta) cos(n phi)
/// y' = r^n sin(n theta) cos(n phi)
/// z' = r^n sin(n phi)
/// ```
///
/// Never panics: the origin maps to `(NaN, NaN, NaN)` and other degenerate
/// inputs yield whatever IEEE arithmetic produces.
#[inline]
pub fn map_point(p: Point, n: Exponent) -> Point {
    map_point_with(p, n, ArctanMode::Single)
}

/// [`map_point`] with an explicit [`ArctanMode`].
#[inline]
pub fn map_point_with(p: Point, n: Exponent, mode: ArctanMode) -> Point {
    let r = (p.x.powi(2) + p.y.powi(2) + p.z.powi(2)).sqrt();
    let theta = mode.theta(p.x, p.y);
    let phi = (p.z / r).asin();

    let rn = r.powf(n);
    let (sin_theta, cos_theta) = (n * theta).sin_cos();
    let (sin_phi, cos_phi) = (n * phi).sin_cos();

    Point::new(
        rn * cos_theta * cos_phi,
        rn * sin_theta * cos_phi,
        rn * sin_phi,
    )
}

/// Maps every point independently. Output `i` corresponds to input `i`.
///
/// Work is spread over Rayon's pool; `collect` on an indexed iterator keeps order.
pub fn map_points(points: &[Point], n: Exponent, mode: ArctanMode) -> Vec<Point> {
    points
        .par_iter()
        .map(|&p| map_point_with(p, n, mode))
        .collect()
}

/// Settings for the escape-time iteration `z -> z^n + c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationConfig {
    pub exponent: Exponent,
    /// Upper bound on power-map applications per point.
    pub max_iterations: usize,
    /// A point escapes once `|z| > bailout`.
    pub bailout: Value,
    pub arctan: ArctanMode,
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            exponent: 8.,
            max_iterations: 10,
            bailout: 2.,
            arctan: ArctanMode::Single,
        }
    }
}

impl IterationConfig {
    pub fn with_exponent(mut self, exponent: Exponent) -> Self {
        self.exponent = exponent;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_bailout(mut self, bailout: Value) -> Self {
        self.bailout = bailout;
        self
    }

    pub fn with_arctan(mut self, arctan: ArctanMode) -> Self {
        self.arctan = arctan;
        self
    }
}

/// Outcome of iterating a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orbit {
    /// Stayed within the bailout radius for every iteration.
    Bounded,
    /// Left the bailout radius after this many iterations.
    Escaped(usize),
}

impl Orbit {
    pub fn is_bounded(self) -> bool {
        matches!(self, Orbit::Bounded)
    }
}

/// Iterates `z -> z^n + c` from `z = 0`.
///
/// `0^n + c` is taken as `c` for the first step, since the power map is
/// undefined at the origin. A NaN magnitude never compares greater than the
/// bailout, so NaN orbits end up [`Orbit::Bounded`].
pub fn iterate(c: Point, config: &IterationConfig) -> Orbit {
    let mut z = Point::origin();
    for iteration in 1..=config.max_iterations {
        z = if iteration == 1 {
            c
        } else {
            map_point_with(z, config.exponent, config.arctan) + c.coords
        };
        if z.coords.norm() > config.bailout {
            return Orbit::Escaped(iteration);
        }
    }
    Orbit::Bounded
}

/// Keeps the points whose orbit stays bounded, preserving their relative order.
pub fn filter_bounded(points: &[Point], config: &IterationConfig) -> Vec<Point> {
    points
        .par_iter()
        .filter(|&&c| iterate(c, config).is_bounded())
        .copied()
        .collect()
}
