use rayon::iter::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

use crate::{
    bounds::Bounds,
    error::{Result, TriplexError},
    types::{Point, Value},
};

/// Number of subdivisions per axis of the sampling grid.
///
/// A grid of granularity `g` has `g + 1` samples per axis and `(g + 1)^3` points.
/// Construct it from an integer with [`Granularity::new`], or from an untrusted
/// float with `Granularity::try_from`, which rejects negative, fractional and
/// non-finite values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Granularity(u32);

impl Granularity {
    pub const fn new(subdivisions: u32) -> Self {
        Self(subdivisions)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Samples per axis, `g + 1`.
    pub const fn samples_per_axis(self) -> usize {
        self.0 as usize + 1
    }

    /// Total number of grid points, `(g + 1)^3`.
    ///
    /// Returns [`TriplexError::GridTooLarge`] if the point buffer or its
    /// flattened `f32` buffer would exceed `isize::MAX` bytes.
    pub fn point_count(self) -> Result<usize> {
        let n = self.samples_per_axis();
        let fits = |count: usize, bytes_per_item: usize| {
            count
                .checked_mul(bytes_per_item)
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        };
        n.checked_mul(n)
            .and_then(|nn| nn.checked_mul(n))
            .filter(|&count| fits(count, size_of::<Point>()))
            .filter(|&count| fits(count, 3 * size_of::<f32>()))
            .ok_or(TriplexError::GridTooLarge)
    }
}

impl From<u32> for Granularity {
    fn from(subdivisions: u32) -> Self {
        Self(subdivisions)
    }
}

impl TryFrom<f64> for Granularity {
    type Error = TriplexError;

    fn try_from(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0. || value.fract() != 0. || value > u32::MAX as f64 {
            return Err(TriplexError::InvalidGranularity);
        }
        Ok(Self(value as u32))
    }
}

impl TryFrom<i64> for Granularity {
    type Error = TriplexError;

    fn try_from(value: i64) -> Result<Self> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| TriplexError::InvalidGranularity)
    }
}

/// Allocates an empty point buffer with room for exactly `count` points.
///
/// Allocation failure is reported as [`TriplexError::GridTooLarge`] instead of aborting.
fn reserve_points(count: usize) -> Result<Vec<Point>> {
    let mut points = Vec::new();
    points
        .try_reserve_exact(count)
        .map_err(|_| TriplexError::GridTooLarge)?;
    Ok(points)
}

/// Returns the `i`-th sample along one axis.
///
/// The first sample is always exactly `min`, even when `step` is infinite or NaN
/// (as it is for granularity `0`).
#[inline]
fn axis_sample(min: Value, step: Value, i: usize) -> Value {
    if i == 0 { min } else { min + i as Value * step }
}

/// Distance between neighbouring samples.
///
/// Derived from the X extent only and reused for Y and Z, so a non-cubic box
/// is sampled with X spacing on every axis.
#[inline]
pub fn grid_step(bounds: &Bounds, granularity: Granularity) -> Value {
    bounds.extent_x() / granularity.get() as Value
}

/// Flat index of sample `(i, j, k)` in the grid ordering (X outermost, Z innermost).
///
/// ```text
/// index = (i * n + j) * n + k,   n = g + 1
/// ```
#[inline]
pub fn grid_index(granularity: Granularity, i: usize, j: usize, k: usize) -> usize {
    let n = granularity.samples_per_axis();
    (i * n + j) * n + k
}

/// Lays a uniform lattice over `bounds`.
///
/// Produces `(g + 1)^3` points ordered X outermost, then Y, then Z:
///
/// ```text
/// for i in 0..=g          x = min.x + i * step
///   for j in 0..=g        y = min.y + j * step
///     for k in 0..=g      z = min.z + k * step
/// ```
///
/// The output is allocated once at its final length.
pub fn sample_grid(bounds: &Bounds, granularity: Granularity) -> Result<Vec<Point>> {
    let count = granularity.point_count()?;
    let step = grid_step(bounds, granularity);

    let mut points = reserve_points(count)?;
    for_each_index(granularity, |i, j, k| {
        points.push(Point::new(
            axis_sample(bounds.min.x, step, i),
            axis_sample(bounds.min.y, step, j),
            axis_sample(bounds.min.z, step, k),
        ));
    });

    Ok(points)
}

/// Parallel version of [`sample_grid`] with identical output.
///
/// The output is preallocated and split into one disjoint X slice per task,
/// so no synchronisation is needed beyond Rayon's final join.
pub fn sample_grid_par(bounds: &Bounds, granularity: Granularity) -> Result<Vec<Point>> {
    let count = granularity.point_count()?;
    let n = granularity.samples_per_axis();
    let step = grid_step(bounds, granularity);
    let min = bounds.min;

    let mut points = reserve_points(count)?;
    points.resize(count, Point::origin());
    points
        .par_chunks_mut(n * n)
        .enumerate()
        .for_each(|(i, slice)| {
            let x = axis_sample(min.x, step, i);
            for j in 0..n {
                let y = axis_sample(min.y, step, j);
                for k in 0..n {
                    let z = axis_sample(min.z, step, k);
                    // Index within the slice is the index of (0, j, k) in the whole grid.
                    slice[grid_index(granularity, 0, j, k)] = Point::new(x, y, z);
                }
            }
        });

    Ok(points)
}

/// Visits every `(i, j, k)` index of the grid in sampling order.
pub fn for_each_index<F>(granularity: Granularity, mut f: F)
where
    F: FnMut(usize, usize, usize),
{
    let n = granularity.samples_per_axis();
    (0..n).for_each(|i| (0..n).for_each(|j| (0..n).for_each(|k| f(i, j, k))));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::compute_bounds;

    fn unit_bounds() -> Bounds {
        compute_bounds(Point::origin(), 4., 1.)
    }

    #[test]
    fn granularity_one_gives_eight_ordered_corners() {
        let points = sample_grid(&unit_bounds(), Granularity::new(1)).unwrap();
        let expected = [
            (-2., -2., -2.),
            (-2., -2., 2.),
            (-2., 2., -2.),
            (-2., 2., 2.),
            (2., -2., -2.),
            (2., -2., 2.),
            (2., 2., -2.),
            (2., 2., 2.),
        ];
        assert_eq!(points.len(), 8);
        for (p, (x, y, z)) in points.iter().zip(expected) {
            assert_eq!(*p, Point::new(x, y, z));
        }
    }

    #[test]
    fn granularity_zero_is_min_corner() {
        let bounds = unit_bounds();
        let points = sample_grid(&bounds, Granularity::new(0)).unwrap();
        assert_eq!(points, vec![bounds.min]);

        let points = sample_grid_par(&bounds, Granularity::new(0)).unwrap();
        assert_eq!(points, vec![bounds.min]);
    }

    #[test]
    fn length_is_cube_of_samples() {
        for g in [0, 1, 2, 5, 9] {
            let granularity = Granularity::new(g);
            let points = sample_grid(&unit_bounds(), granularity).unwrap();
            let n = g as usize + 1;
            assert_eq!(points.len(), n * n * n);
            assert_eq!(points.len(), granularity.point_count().unwrap());
        }
    }

    #[test]
    fn parallel_matches_serial() {
        let bounds = compute_bounds(Point::new(0.3, -1.2, 4.), 3., 1.5);
        for g in [1, 4, 7] {
            let granularity = Granularity::new(g);
            let serial = sample_grid(&bounds, granularity).unwrap();
            let parallel = sample_grid_par(&bounds, granularity).unwrap();
            assert_eq!(serial, parallel);
        }
    }

    #[test]
    fn step_uses_x_extent_for_every_axis() {
        // Wide in X, thin in Y and Z.
        let bounds = Bounds::new(Point::new(0., 0., 0.), Point::new(10., 1., 1.));
        let points = sample_grid(&bounds, Granularity::new(2)).unwrap();
        let last = points[points.len() - 1];
        assert_eq!(last, Point::new(10., 10., 10.));
    }

    #[test]
    fn grid_index_matches_sampling_order() {
        let granularity = Granularity::new(3);
        let mut expected = 0;
        for_each_index(granularity, |i, j, k| {
            assert_eq!(grid_index(granularity, i, j, k), expected);
            expected += 1;
        });
        assert_eq!(expected, 64);
    }

    #[test]
    fn granularity_from_float() {
        assert_eq!(Granularity::try_from(3.0), Ok(Granularity::new(3)));
        assert_eq!(Granularity::try_from(0.0), Ok(Granularity::new(0)));
        assert_eq!(
            Granularity::try_from(-1.0),
            Err(TriplexError::InvalidGranularity)
        );
        assert_eq!(
            Granularity::try_from(1.5),
            Err(TriplexError::InvalidGranularity)
        );
        assert_eq!(
            Granularity::try_from(f64::NAN),
            Err(TriplexError::InvalidGranularity)
        );
        assert_eq!(
            Granularity::try_from(f64::INFINITY),
            Err(TriplexError::InvalidGranularity)
        );
    }

    #[test]
    fn granularity_from_signed_integer() {
        assert_eq!(Granularity::try_from(12_i64), Ok(Granularity::new(12)));
        assert_eq!(
            Granularity::try_from(-3_i64),
            Err(TriplexError::InvalidGranularity)
        );
    }

    #[test]
    fn oversized_grid_is_rejected() {
        if usize::BITS == 64 {
            // (2^32)^3 overflows a 64-bit usize.
            assert_eq!(
                Granularity::new(u32::MAX).point_count(),
                Err(TriplexError::GridTooLarge)
            );
        }
    }

    #[test]
    fn grid_whose_bytes_overflow_is_rejected() {
        if usize::BITS == 64 {
            // 2^60 points fit in a usize, their 24-byte storage does not.
            let granularity = Granularity::new((1 << 20) - 1);
            assert_eq!(granularity.point_count(), Err(TriplexError::GridTooLarge));
            assert_eq!(
                sample_grid_par(&unit_bounds(), granularity),
                Err(TriplexError::GridTooLarge)
            );
            assert_eq!(
                sample_grid(&unit_bounds(), granularity),
                Err(TriplexError::GridTooLarge)
            );
        }
    }

    #[test]
    fn unallocatable_grid_is_rejected() {
        if usize::BITS == 64 {
            // 2^57 points is within isize::MAX bytes but far beyond any address space.
            let granularity = Granularity::new((1 << 19) - 1);
            assert!(granularity.point_count().is_ok());
            assert_eq!(
                sample_grid(&unit_bounds(), granularity),
                Err(TriplexError::GridTooLarge)
            );
        }
    }
}
