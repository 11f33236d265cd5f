use crate::{
    bounds::{Bounds, compute_bounds},
    error::Result,
    flatten::{FlatBuffer, flatten},
    grid::{Granularity, sample_grid_par},
    triplex::{ArctanMode, IterationConfig, filter_bounded, map_points},
    types::{Exponent, Point, Value},
};

/// What the generated cloud contains.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CloudMode {
    /// Every grid sample pushed through one application of the power map.
    #[default]
    PowerMap,
    /// Only the grid samples whose `z -> z^n + c` orbit stays bounded.
    Membership(IterationConfig),
}

/// Parameters for one point-cloud build.
///
/// ```rust,ignore
/// let config = FractalConfig::new(Granularity::new(64))
///     .with_span(3.)
///     .with_exponent(8.);
/// let buffer = generate(&config)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalConfig {
    /// Center of the sampled cube.
    pub center: Point,
    pub span: Value,
    pub zoom: Value,
    pub granularity: Granularity,
    /// Exponent used by [`CloudMode::PowerMap`].
    pub exponent: Exponent,
    pub arctan: ArctanMode,
    pub mode: CloudMode,
}

impl Default for FractalConfig {
    fn default() -> Self {
        Self {
            center: Point::origin(),
            span: 4.,
            zoom: 1.,
            granularity: Granularity::new(32),
            exponent: 2.,
            arctan: ArctanMode::Single,
            mode: CloudMode::PowerMap,
        }
    }
}

impl FractalConfig {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            ..Default::default()
        }
    }

    pub fn with_center(mut self, center: Point) -> Self {
        self.center = center;
        self
    }

    pub fn with_span(mut self, span: Value) -> Self {
        self.span = span;
        self
    }

    pub fn with_zoom(mut self, zoom: Value) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_exponent(mut self, exponent: Exponent) -> Self {
        self.exponent = exponent;
        self
    }

    pub fn with_arctan(mut self, arctan: ArctanMode) -> Self {
        self.arctan = arctan;
        self
    }

    pub fn with_mode(mut self, mode: CloudMode) -> Self {
        self.mode = mode;
        self
    }

    /// The cube this configuration samples.
    pub fn bounds(&self) -> Bounds {
        compute_bounds(self.center, self.span, self.zoom)
    }
}

/// Builds the point cloud described by `config`.
///
/// ```text
/// compute_bounds  →  sample_grid  →  map_points / filter_bounded  →  flatten
/// ```
///
/// Deterministic and free of shared state; concurrent calls are independent.
/// Fails only if the grid is too large to allocate. Non-finite coordinates
/// are passed through to the buffer.
pub fn generate(config: &FractalConfig) -> Result<FlatBuffer> {
    let bounds = config.bounds();
    let grid = sample_grid_par(&bounds, config.granularity)?;
    tracing::debug!(
        granularity = config.granularity.get(),
        points = grid.len(),
        "Sampled fractal grid"
    );

    let points = match config.mode {
        CloudMode::PowerMap => map_points(&grid, config.exponent, config.arctan),
        CloudMode::Membership(iteration) => filter_bounded(&grid, &iteration),
    };
    tracing::debug!(points = points.len(), mode = ?config.mode, "Mapped fractal points");

    Ok(flatten(&points))
}
