//! Conversions between the index space of a pyramid level and world space.
//!
//! The index-to-world map is `Translate(origin) · Direction · Scale(spacing)`, applied to continuous index coordinates.

use crate::{Axis, AxisShape, IndexExtent, Point3f, PointN, WorldBounds};

use nalgebra::{Matrix3, Matrix4, Point3 as NaPoint3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("direction must have 4 (2D) or 9 (3D) elements, got {0}")]
    DirectionShape(usize),
    #[error("direction rows do not include axis {0}")]
    MissingDirectionAxis(Axis),
    #[error("index-to-world transform is singular (origin {origin:?}, spacing {spacing:?})")]
    Singular { origin: [f64; 3], spacing: [f64; 3] },
}

/// A 3×3 direction cosine matrix in row-major order. Column `j` is the world direction of index axis `j`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Direction(pub [f64; 9]);

impl Default for Direction {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Direction {
    pub const IDENTITY: Self = Direction([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// Accepts either a 3×3 or a 2×2 row-major matrix. A 2×2 matrix is padded with an identity z row and column.
    pub fn from_slice(values: &[f64]) -> Result<Self, TransformError> {
        match *values {
            [d0, d1, d2, d3] => Ok(Direction([d0, d1, 0.0, d2, d3, 0.0, 0.0, 0.0, 1.0])),
            _ if values.len() == 9 => {
                let mut m = [0.0; 9];
                m.copy_from_slice(values);
                Ok(Direction(m))
            }
            _ => Err(TransformError::DirectionShape(values.len())),
        }
    }

    /// Builds a direction from a square matrix whose rows and columns follow the storage axis order `dims`, keeping
    /// only the spatial axes of an image with `dimension` and reordering them into x, y, z order.
    pub fn from_storage_rows(rows: &[Vec<f64>], dims: &[Axis], dimension: usize) -> Result<Self, TransformError> {
        let spatial = Axis::spatial(dimension);
        let position = |axis: Axis| {
            dims.iter()
                .position(|&d| d == axis)
                .filter(|&i| i < rows.len())
                .ok_or(TransformError::MissingDirectionAxis(axis))
        };

        let mut square = Vec::with_capacity(spatial.len() * spatial.len());
        for &row_axis in spatial {
            let row = &rows[position(row_axis)?];
            for &col_axis in spatial {
                let col = position(col_axis)?;
                square.push(row.get(col).copied().ok_or(TransformError::MissingDirectionAxis(col_axis))?);
            }
        }

        Self::from_slice(&square)
    }

    #[inline]
    pub fn as_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_row_slice(&self.0)
    }

    /// The leading `dimension × dimension` block in row-major order.
    pub fn to_vec(&self, dimension: usize) -> Vec<f64> {
        let n = dimension.min(3);
        let mut out = Vec::with_capacity(n * n);
        for row in 0..n {
            out.extend_from_slice(&self.0[row * 3..row * 3 + n]);
        }

        out
    }
}

/// The physical placement of a level's index grid.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct ImageGeometry {
    pub origin: Point3f,
    pub spacing: Point3f,
    pub direction: Direction,
}

impl Default for ImageGeometry {
    fn default() -> Self {
        Self {
            origin: Point3f::ZERO,
            spacing: Point3f::ONES,
            direction: Direction::IDENTITY,
        }
    }
}

impl ImageGeometry {
    /// Pads 2D origin and spacing with z = 0 and z = 1 respectively.
    pub fn from_slices(origin: &[f64], spacing: &[f64], direction: Direction) -> Self {
        let pad = |values: &[f64], fill: f64| {
            PointN([0, 1, 2].map(|i| values.get(i).copied().unwrap_or(fill)))
        };

        Self {
            origin: pad(origin, 0.0),
            spacing: pad(spacing, 1.0),
            direction,
        }
    }
}

/// An invertible affine map between continuous index coordinates and world coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    index_to_world: Matrix4<f64>,
    world_to_index: Matrix4<f64>,
}

impl AffineTransform {
    pub fn new(geometry: &ImageGeometry) -> Result<Self, TransformError> {
        let index_to_world = Matrix4::new_translation(&Vector3::from(geometry.origin))
            * geometry.direction.as_matrix().to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&Vector3::from(geometry.spacing));

        let world_to_index = index_to_world.try_inverse().ok_or(TransformError::Singular {
            origin: geometry.origin.0,
            spacing: geometry.spacing.0,
        })?;

        Ok(Self {
            index_to_world,
            world_to_index,
        })
    }

    #[inline]
    pub fn index_to_world(&self, p: &Point3f) -> Point3f {
        self.index_to_world.transform_point(&NaPoint3::from(*p)).into()
    }

    #[inline]
    pub fn world_to_index(&self, p: &Point3f) -> Point3f {
        self.world_to_index.transform_point(&NaPoint3::from(*p)).into()
    }

    pub fn index_to_world_matrix(&self) -> &Matrix4<f64> {
        &self.index_to_world
    }

    pub fn world_to_index_matrix(&self) -> &Matrix4<f64> {
        &self.world_to_index
    }
}

/// Maps a world-space box to the index extent of an array with `array_shape` that it touches.
///
/// With no bounds, the full extent is returned. Otherwise the 8 corners are mapped to index space, and their bounding
/// box is clamped to the array, floored at the low edge and ceiled at the high edge. The component and time axes always
/// cover the full array. A spatial axis is never empty: a box that collapses onto a lattice plane selects the single
/// element at that plane.
pub fn world_to_index_bounds(
    world_bounds: Option<&WorldBounds>,
    array_shape: &AxisShape,
    transform: &AffineTransform,
) -> IndexExtent {
    let full = IndexExtent::full(*array_shape);
    let world_bounds = match world_bounds {
        Some(b) => b,
        None => return full,
    };

    let index_corners = world_bounds.corners().map(|c| transform.world_to_index(&c));
    let index_box = match WorldBounds::from_points(index_corners) {
        Some(b) => b,
        None => return full,
    };

    let mut minimum = full.minimum;
    let mut lub = full.least_upper_bound();
    for axis in Axis::SPATIAL {
        let i = axis.spatial_index().unwrap_or_default();
        let size = array_shape[axis].max(1);
        let clamp = |v: f64| v.max(0.0).min(size as f64);

        let mut lo = clamp(index_box.minimum.at(i)).floor() as i64;
        let mut hi = clamp(index_box.maximum.at(i)).ceil() as i64;
        if hi <= lo {
            if lo >= size {
                lo = size - 1;
            }
            hi = lo + 1;
        }
        minimum[axis] = lo;
        lub[axis] = hi;
    }

    IndexExtent::from_min_and_lub(minimum, lub)
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝

#[cfg(test)]
mod test {
    use super::*;
    use crate::AxisMap;

    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng};

    fn shape_xyz(x: i64, y: i64, z: i64) -> AxisShape {
        AxisShape::from_pairs(vec![(Axis::X, x), (Axis::Y, y), (Axis::Z, z)])
    }

    fn scaled_geometry() -> ImageGeometry {
        ImageGeometry {
            origin: PointN([10.0, -5.0, 2.0]),
            spacing: PointN([0.5, 2.0, 2.0]),
            direction: Direction::IDENTITY,
        }
    }

    #[test]
    fn missing_bounds_select_full_extent() {
        let shape = AxisMap([3, 100, 80, 20, 4]);
        let transform = AffineTransform::new(&scaled_geometry()).unwrap();

        let extent = world_to_index_bounds(None, &shape, &transform);

        for axis in Axis::CXYZT {
            assert_eq!(extent.range(axis), 0..shape[axis]);
        }
    }

    #[test]
    fn interior_bounds_select_strict_subset() {
        let shape = AxisMap([2, 100, 100, 100, 3]);
        let transform = AffineTransform::new(&ImageGeometry::default()).unwrap();
        let bounds = WorldBounds::from_flat([10.5, 20.5, 30.0, 40.0, 1.2, 98.7]);

        let extent = world_to_index_bounds(Some(&bounds), &shape, &transform);

        assert_eq!(extent.range(Axis::X), 10..21);
        assert_eq!(extent.range(Axis::Y), 30..40);
        assert_eq!(extent.range(Axis::Z), 1..99);
        assert_eq!(extent.range(Axis::C), 0..2);
        assert_eq!(extent.range(Axis::T), 0..3);
        assert!(extent.is_subset_of(&IndexExtent::full(shape)));
    }

    #[test]
    fn bounds_outside_the_image_are_clamped() {
        let shape = shape_xyz(64, 64, 1);
        let transform = AffineTransform::new(&ImageGeometry::default()).unwrap();
        let bounds = WorldBounds::from_flat([-100.0, 1000.0, -1.0, 32.0, 0.0, 0.0]);

        let extent = world_to_index_bounds(Some(&bounds), &shape, &transform);

        assert_eq!(extent.range(Axis::X), 0..64);
        assert_eq!(extent.range(Axis::Y), 0..32);
        assert_eq!(extent.range(Axis::Z), 0..1);
    }

    #[test]
    fn degenerate_bounds_select_one_element() {
        let shape = shape_xyz(10, 10, 10);
        let transform = AffineTransform::new(&ImageGeometry::default()).unwrap();

        let plane = WorldBounds::from_flat([0.0, 10.0, 0.0, 10.0, 4.0, 4.0]);
        let extent = world_to_index_bounds(Some(&plane), &shape, &transform);
        assert_eq!(extent.range(Axis::Z), 4..5);

        let far_plane = WorldBounds::from_flat([0.0, 10.0, 0.0, 10.0, 10.0, 10.0]);
        let extent = world_to_index_bounds(Some(&far_plane), &shape, &transform);
        assert_eq!(extent.range(Axis::Z), 9..10);
    }

    #[test]
    fn spacing_and_origin_scale_index_bounds() {
        let shape = shape_xyz(100, 100, 100);
        let transform = AffineTransform::new(&scaled_geometry()).unwrap();
        // x: (12 - 10) / 0.5 = 4 .. (15 - 10) / 0.5 = 10
        let bounds = WorldBounds::from_flat([12.0, 15.0, -5.0, 15.0, 2.0, 22.0]);

        let extent = world_to_index_bounds(Some(&bounds), &shape, &transform);

        assert_eq!(extent.range(Axis::X), 4..10);
        assert_eq!(extent.range(Axis::Y), 0..10);
        assert_eq!(extent.range(Axis::Z), 0..10);
    }

    #[test]
    fn index_world_round_trip() {
        let geometry = ImageGeometry {
            origin: PointN([1.0, 2.0, 3.0]),
            spacing: PointN([0.3, 0.7, 2.5]),
            // 90 degree rotation about z.
            direction: Direction([0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
        };
        let transform = AffineTransform::new(&geometry).unwrap();

        let mut rng = rand::rngs::StdRng::seed_from_u64(0xB0B);
        for _ in 0..100 {
            let p = PointN([
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
            ]);
            let q = transform.world_to_index(&transform.index_to_world(&p));
            assert!(p.approx_eq(&q, 1e-9), "{:?} != {:?}", p, q);
        }
    }

    #[test]
    fn direction_columns_are_index_axes() {
        let geometry = ImageGeometry {
            direction: Direction([0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
            ..Default::default()
        };
        let transform = AffineTransform::new(&geometry).unwrap();

        // Index axis x points along world +y.
        assert!(transform
            .index_to_world(&PointN([1.0, 0.0, 0.0]))
            .approx_eq(&PointN([0.0, 1.0, 0.0]), 1e-12));
        // Index axis y points along world -x.
        assert!(transform
            .index_to_world(&PointN([0.0, 1.0, 0.0]))
            .approx_eq(&PointN([-1.0, 0.0, 0.0]), 1e-12));
    }

    #[test]
    fn two_dimensional_geometry_is_padded() {
        let direction = Direction::from_slice(&[0.0, 1.0, 1.0, 0.0]).unwrap();
        let geometry = ImageGeometry::from_slices(&[5.0, 6.0], &[2.0, 3.0], direction);

        assert_eq!(direction.0, [0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(geometry.origin, PointN([5.0, 6.0, 0.0]));
        assert_eq!(geometry.spacing, PointN([2.0, 3.0, 1.0]));
        assert_eq!(direction.to_vec(2), vec![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(Direction::from_slice(&[1.0; 5]), Err(TransformError::DirectionShape(5)));
    }

    #[test]
    fn storage_rows_are_reordered_to_xyz() {
        // Stored as z, y, x.
        let rows = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 1.0, 0.0],
        ];
        let dims = [Axis::Z, Axis::Y, Axis::X];

        let direction = Direction::from_storage_rows(&rows, &dims, 3).unwrap();

        // (x, x) = rows[2][2], (x, y) = rows[2][1], (y, x) = rows[1][2], (z, z) = rows[0][0]
        assert_eq!(direction.0, [0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(
            Direction::from_storage_rows(&rows, &[Axis::X, Axis::Y], 3),
            Err(TransformError::MissingDirectionAxis(Axis::Z))
        );
    }

    #[test]
    fn zero_spacing_is_singular() {
        let geometry = ImageGeometry {
            spacing: PointN([1.0, 0.0, 1.0]),
            ..Default::default()
        };

        assert!(matches!(
            AffineTransform::new(&geometry),
            Err(TransformError::Singular { .. })
        ));
    }
}
