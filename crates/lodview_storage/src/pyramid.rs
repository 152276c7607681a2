use crate::SmallKeyHashMap;

use lodview_core::prelude::*;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LevelError {
    #[error("level has no storage axes")]
    NoDims,
    #[error("axis {0} appears more than once in dims")]
    DuplicateAxis(Axis),
    #[error("axis {axis} has extent {extent} > 1 but is not listed in dims")]
    UndeclaredAxis { axis: Axis, extent: i64 },
    #[error("{what} extent along axis {axis} must be positive, got {extent}")]
    NonPositiveExtent { what: &'static str, axis: Axis, extent: i64 },
    #[error("chunk grid along axis {axis} is {declared}, expected ceil({array} / {chunk}) = {expected}")]
    ChunkGridMismatch {
        axis: Axis,
        declared: i64,
        expected: i64,
        array: i64,
        chunk: i64,
    },
}

/// The serializable description of one pyramid level, as found in multiscale image metadata.
///
/// Per-axis maps may omit axes; an omitted axis has extent 1.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct LevelSpec {
    pub name: String,
    /// Storage axis order, which is also the C-order layout of each chunk buffer (last axis varies fastest).
    pub dims: Vec<Axis>,
    pub array_shape: BTreeMap<Axis, i64>,
    pub chunk_shape: BTreeMap<Axis, i64>,
    /// Number of chunks along each axis. Derived from `array_shape` and `chunk_shape` when absent.
    #[serde(default)]
    pub chunk_grid_shape: Option<BTreeMap<Axis, i64>>,
    /// Known `[min, max]` per component index.
    #[serde(default)]
    pub value_ranges: Option<BTreeMap<usize, [f64; 2]>>,
    /// Square direction matrix whose rows and columns follow `dims`. Only consulted on scale 0.
    #[serde(default)]
    pub direction: Option<Vec<Vec<f64>>>,
}

/// World coordinates of each index along one axis. Either already available or produced by a deferred computation
/// that runs at most once, no matter how many times the sequence is resolved.
#[derive(Clone)]
pub enum CoordinateSequence {
    Ready(Arc<[f64]>),
    Deferred(Shared<BoxFuture<'static, Arc<[f64]>>>),
}

impl CoordinateSequence {
    pub fn ready(coords: impl Into<Arc<[f64]>>) -> Self {
        CoordinateSequence::Ready(coords.into())
    }

    pub fn deferred(future: impl Future<Output = Arc<[f64]>> + Send + 'static) -> Self {
        CoordinateSequence::Deferred(future.boxed().shared())
    }

    /// A uniformly spaced sequence of `len` coordinates.
    pub fn uniform(origin: f64, spacing: f64, len: usize) -> Self {
        Self::ready((0..len).map(|i| origin + spacing * i as f64).collect::<Vec<_>>())
    }

    pub async fn resolve(&self) -> Arc<[f64]> {
        match self {
            CoordinateSequence::Ready(coords) => coords.clone(),
            CoordinateSequence::Deferred(shared) => shared.clone().await,
        }
    }
}

impl std::fmt::Debug for CoordinateSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinateSequence::Ready(coords) => f.debug_tuple("Ready").field(&coords.len()).finish(),
            CoordinateSequence::Deferred(shared) => f
                .debug_tuple("Deferred")
                .field(&shared.peek().map(|c| c.len()))
                .finish(),
        }
    }
}

/// Origin and spacing of a level, padded to 3 dimensions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelGeometry {
    pub origin: Point3f,
    pub spacing: Point3f,
}

/// One resolution of a multiscale image, with validated shapes and lazily resolved geometry.
#[derive(Debug)]
pub struct PyramidLevel {
    name: String,
    dims: Vec<Axis>,
    array_shape: AxisShape,
    chunk_shape: AxisShape,
    chunk_grid_shape: AxisShape,
    value_ranges: Option<BTreeMap<usize, [f64; 2]>>,
    direction: Option<Vec<Vec<f64>>>,
    coordinates: SmallKeyHashMap<Axis, CoordinateSequence>,
    geometry: OnceLock<LevelGeometry>,
}

impl PyramidLevel {
    pub fn new(
        spec: LevelSpec,
        coordinates: impl IntoIterator<Item = (Axis, CoordinateSequence)>,
    ) -> Result<Self, LevelError> {
        let LevelSpec {
            name,
            dims,
            array_shape,
            chunk_shape,
            chunk_grid_shape,
            value_ranges,
            direction,
        } = spec;

        if dims.is_empty() {
            return Err(LevelError::NoDims);
        }
        for (i, axis) in dims.iter().enumerate() {
            if dims[..i].contains(axis) {
                return Err(LevelError::DuplicateAxis(*axis));
            }
        }

        let array_shape = positive_shape("array", &array_shape)?;
        let chunk_shape = positive_shape("chunk", &chunk_shape)?;
        for (axis, extent) in array_shape.iter() {
            if extent > 1 && !dims.contains(&axis) {
                return Err(LevelError::UndeclaredAxis { axis, extent });
            }
        }

        let expected_grid = array_shape.zip_with(&chunk_shape, |a, c| num::Integer::div_ceil(&a, &c));
        if let Some(declared) = chunk_grid_shape {
            for (axis, expected) in expected_grid.iter() {
                let declared = declared.get(&axis).copied().unwrap_or(1);
                if declared != expected {
                    return Err(LevelError::ChunkGridMismatch {
                        axis,
                        declared,
                        expected,
                        array: array_shape[axis],
                        chunk: chunk_shape[axis],
                    });
                }
            }
        }

        Ok(Self {
            name,
            dims,
            array_shape,
            chunk_shape,
            chunk_grid_shape: expected_grid,
            value_ranges,
            direction,
            coordinates: coordinates.into_iter().collect(),
            geometry: OnceLock::new(),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn dims(&self) -> &[Axis] {
        &self.dims
    }

    #[inline]
    pub fn array_shape(&self) -> &AxisShape {
        &self.array_shape
    }

    #[inline]
    pub fn chunk_shape(&self) -> &AxisShape {
        &self.chunk_shape
    }

    #[inline]
    pub fn chunk_grid_shape(&self) -> &AxisShape {
        &self.chunk_grid_shape
    }

    /// Number of elements in one (padded) chunk buffer.
    #[inline]
    pub fn chunk_len(&self) -> usize {
        self.dims.iter().map(|&a| self.chunk_shape[a] as usize).product()
    }

    /// Spatial element count of the whole level.
    #[inline]
    pub fn voxel_count(&self) -> u64 {
        self.array_shape.spatial_volume()
    }

    #[inline]
    pub fn value_ranges(&self) -> Option<&BTreeMap<usize, [f64; 2]>> {
        self.value_ranges.as_ref()
    }

    #[inline]
    pub fn direction_rows(&self) -> Option<&[Vec<f64>]> {
        self.direction.as_deref()
    }

    pub fn coordinates(&self, axis: Axis) -> Option<&CoordinateSequence> {
        self.coordinates.get(&axis)
    }

    /// The origin and spacing, if they have been resolved.
    #[inline]
    pub fn geometry(&self) -> Option<LevelGeometry> {
        self.geometry.get().copied()
    }

    /// Resolves origin and spacing from the coordinate sequences of the spatial axes of an image with `dimension`. The
    /// result is memoized, so coordinates are only awaited on the first call.
    ///
    /// An axis with fewer than 2 coordinates gets origin 0 and spacing 1.
    pub async fn resolve_geometry(&self, dimension: usize) -> LevelGeometry {
        if let Some(geometry) = self.geometry() {
            return geometry;
        }

        let mut geometry = LevelGeometry {
            origin: Point3f::ZERO,
            spacing: Point3f::ONES,
        };
        for &axis in Axis::spatial(dimension) {
            let i = match axis.spatial_index() {
                Some(i) => i,
                None => continue,
            };
            if let Some(sequence) = self.coordinates(axis) {
                let coords = sequence.resolve().await;
                if let [first, second, ..] = *coords {
                    geometry.origin.0[i] = first;
                    geometry.spacing.0[i] = second - first;
                }
            }
        }

        *self.geometry.get_or_init(|| geometry)
    }
}

fn positive_shape(what: &'static str, extents: &BTreeMap<Axis, i64>) -> Result<AxisShape, LevelError> {
    let shape = AxisShape::from_pairs(extents.iter().map(|(&a, &e)| (a, e)));
    for (axis, extent) in shape.iter() {
        if extent <= 0 {
            return Err(LevelError::NonPositiveExtent { what, axis, extent });
        }
    }

    Ok(shape)
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

    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn spec_2d(x: i64, y: i64, chunk: i64) -> LevelSpec {
        LevelSpec {
            name: "plane".into(),
            dims: vec![Axis::Y, Axis::X],
            array_shape: [(Axis::X, x), (Axis::Y, y)].into_iter().collect(),
            chunk_shape: [(Axis::X, chunk), (Axis::Y, chunk)].into_iter().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn chunk_grid_is_derived_from_shapes() {
        let level = PyramidLevel::new(spec_2d(130, 64, 64), None).unwrap();

        assert_eq!(level.chunk_grid_shape(), &AxisMap([1, 3, 1, 1, 1]));
        assert_eq!(level.chunk_len(), 64 * 64);
        assert_eq!(level.voxel_count(), 130 * 64);
    }

    #[test]
    fn inconsistent_chunk_grid_is_rejected() {
        let mut spec = spec_2d(130, 64, 64);
        spec.chunk_grid_shape = Some([(Axis::X, 2), (Axis::Y, 1)].into_iter().collect());

        assert_eq!(
            PyramidLevel::new(spec, None).unwrap_err(),
            LevelError::ChunkGridMismatch {
                axis: Axis::X,
                declared: 2,
                expected: 3,
                array: 130,
                chunk: 64
            }
        );
    }

    #[test]
    fn malformed_dims_are_rejected() {
        let mut spec = spec_2d(8, 8, 4);
        spec.dims = vec![Axis::X, Axis::X];
        assert_eq!(PyramidLevel::new(spec, None).unwrap_err(), LevelError::DuplicateAxis(Axis::X));

        let mut spec = spec_2d(8, 8, 4);
        spec.dims = vec![Axis::X];
        assert_eq!(
            PyramidLevel::new(spec, None).unwrap_err(),
            LevelError::UndeclaredAxis { axis: Axis::Y, extent: 8 }
        );

        let mut spec = spec_2d(8, 8, 4);
        spec.chunk_shape.insert(Axis::X, 0);
        assert!(matches!(
            PyramidLevel::new(spec, None),
            Err(LevelError::NonPositiveExtent { what: "chunk", .. })
        ));
    }

    #[test]
    fn geometry_from_coordinates() {
        let level = PyramidLevel::new(
            spec_2d(4, 4, 4),
            vec![
                (Axis::X, CoordinateSequence::uniform(10.0, 0.5, 4)),
                (Axis::Y, CoordinateSequence::ready(vec![3.0])),
            ],
        )
        .unwrap();
        assert_eq!(level.geometry(), None);

        let geometry = block_on(level.resolve_geometry(2));

        assert_eq!(geometry.origin, PointN([10.0, 0.0, 0.0]));
        assert_eq!(geometry.spacing, PointN([0.5, 1.0, 1.0]));
        assert_eq!(level.geometry(), Some(geometry));
    }

    #[test]
    fn deferred_coordinates_resolve_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let sequence = CoordinateSequence::deferred(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::from(vec![1.0, 3.0, 5.0])
        });
        let level = PyramidLevel::new(spec_2d(3, 1, 4), vec![(Axis::X, sequence.clone())]).unwrap();

        let first = block_on(level.resolve_geometry(2));
        let second = block_on(level.resolve_geometry(2));
        let again = block_on(sequence.resolve());

        assert_eq!(first, second);
        assert_eq!(first.spacing.x(), 2.0);
        assert_eq!(&*again, &[1.0, 3.0, 5.0]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn level_spec_parses_from_json() {
        let json = r#"{
            "name": "scan",
            "dims": ["z", "y", "x"],
            "array_shape": {"x": 100, "y": 80, "z": 10},
            "chunk_shape": {"x": 64, "y": 64, "z": 10},
            "value_ranges": {"0": [0.0, 255.0]}
        }"#;

        let spec: LevelSpec = serde_json::from_str(json).unwrap();
        let level = PyramidLevel::new(spec, None).unwrap();

        assert_eq!(level.dims(), &[Axis::Z, Axis::Y, Axis::X]);
        assert_eq!(level.chunk_grid_shape(), &AxisMap([1, 2, 2, 1, 1]));
        assert_eq!(level.value_ranges().and_then(|r| r.get(&0)), Some(&[0.0, 255.0]));
    }
}
