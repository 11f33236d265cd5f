use nalgebra::Point3;

/// Scalar type used throughout the sampling and mapping stages.
///
/// Sampling and mapping run in double precision; only [`flatten`](crate::flatten::flatten)
/// narrows to `f32` for the vertex buffer.
pub type Value = f64;

/// A 3D point with [`Value`] components.
///
/// Used both for grid samples and for mapped points. Components may be non-finite.
pub type Point = Point3<Value>;

/// The exponent `n` applied by the triplex power map.
pub type Exponent = Value;
