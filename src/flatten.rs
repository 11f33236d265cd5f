use crate::types::Point;

/// Tightly packed vertex positions ready for upload: `[x0, y0, z0, x1, y1, z1, ...]`.
///
/// Always holds a multiple of three `f32`s. Values are narrowed from [`Value`](crate::types::Value),
/// so precision loss is expected; non-finite components are kept as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatBuffer(Vec<f32>);

impl FlatBuffer {
    /// Returns the packed scalars.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Number of scalars, `3 * point_count`.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of `[x, y, z]` triples.
    pub fn point_count(&self) -> usize {
        self.0.len() / 3
    }

    /// Returns the `i`-th position, if any.
    pub fn point(&self, i: usize) -> Option<[f32; 3]> {
        self.0
            .get(3 * i..3 * i + 3)
            .map(|xyz| [xyz[0], xyz[1], xyz[2]])
    }

    /// Regroups the scalars into positions, the layout Bevy's `ATTRIBUTE_POSITION` expects.
    pub fn positions(&self) -> Vec<[f32; 3]> {
        self.0
            .chunks_exact(3)
            .map(|xyz| [xyz[0], xyz[1], xyz[2]])
            .collect()
    }
}

impl From<FlatBuffer> for Vec<f32> {
    fn from(buffer: FlatBuffer) -> Self {
        buffer.0
    }
}

/// Packs `points` into a single [`FlatBuffer`], preserving order.
///
/// Allocates exactly `3 * points.len()` scalars once.
pub fn flatten(points: &[Point]) -> FlatBuffer {
    let mut vertices = Vec::with_capacity(points.len() * 3);
    for p in points {
        vertices.extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
    }
    FlatBuffer(vertices)
}
