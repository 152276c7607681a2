use crate::{ChunkCoord, PyramidLevel};

use lodview_core::prelude::*;

use itertools::iproduct;

/// Everything about a region request that can be decided without touching chunk data: which elements are wanted, which
/// chunks hold them, and where the region sits in world space.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchPlan {
    pub scale: usize,
    /// The elements to assemble. Only time point 0 is included.
    pub index_extent: IndexExtent,
    /// The chunk indices covering `index_extent`.
    pub chunk_extent: IndexExtent,
    /// Chunk coordinates in request order: z outermost, then y, then x, and the component chunk innermost.
    pub chunk_coords: Vec<ChunkCoord>,
    /// World position of the first element of the region.
    pub origin: Point3f,
}

impl FetchPlan {
    pub fn new(
        scale: usize,
        level: &PyramidLevel,
        geometry: &ImageGeometry,
        bounds: Option<&WorldBounds>,
    ) -> Result<Self, TransformError> {
        let transform = AffineTransform::new(geometry)?;

        let mut index_extent = world_to_index_bounds(bounds, level.array_shape(), &transform);
        index_extent.minimum[Axis::T] = 0;
        index_extent.shape[Axis::T] = 1;

        let chunk_extent = index_extent.covering_chunks(level.chunk_shape());
        let chunk_coords = iproduct!(
            chunk_extent.range(Axis::Z),
            chunk_extent.range(Axis::Y),
            chunk_extent.range(Axis::X),
            chunk_extent.range(Axis::C)
        )
        .map(|(z, y, x, c)| AxisMap([c, x, y, z, 0]))
        .collect();

        let origin = transform.index_to_world(&index_extent.spatial_minimum().to_float());

        Ok(Self {
            scale,
            index_extent,
            chunk_extent,
            chunk_coords,
            origin,
        })
    }

    /// Number of spatial elements in the region.
    #[inline]
    pub fn voxel_count(&self) -> u64 {
        self.index_extent.spatial_volume()
    }

    /// Spatial size of the region, truncated to `dimension` axes.
    pub fn size(&self, dimension: usize) -> Vec<usize> {
        Axis::spatial(dimension)
            .iter()
            .map(|&a| self.index_extent.shape[a] as usize)
            .collect()
    }
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
    use crate::LevelSpec;

    use pretty_assertions::assert_eq;

    fn level() -> PyramidLevel {
        let spec = LevelSpec {
            name: "volume".into(),
            dims: vec![Axis::C, Axis::Z, Axis::Y, Axis::X],
            array_shape: [(Axis::C, 2), (Axis::X, 200), (Axis::Y, 100), (Axis::Z, 10)]
                .into_iter()
                .collect(),
            chunk_shape: [(Axis::C, 1), (Axis::X, 64), (Axis::Y, 64), (Axis::Z, 10)]
                .into_iter()
                .collect(),
            ..Default::default()
        };

        PyramidLevel::new(spec, None).unwrap()
    }

    #[test]
    fn full_request_covers_every_chunk() {
        let level = level();

        let plan = FetchPlan::new(0, &level, &ImageGeometry::default(), None).unwrap();

        assert_eq!(plan.index_extent, IndexExtent::full(*level.array_shape()));
        assert_eq!(plan.chunk_extent.shape, AxisMap([2, 4, 2, 1, 1]));
        assert_eq!(plan.chunk_coords.len(), 2 * 4 * 2);
        assert_eq!(plan.voxel_count(), 200 * 100 * 10);
        assert_eq!(plan.size(3), vec![200, 100, 10]);
    }

    #[test]
    fn chunk_coords_enumerate_component_innermost() {
        let level = level();
        let bounds = WorldBounds::from_flat([10.0, 130.0, 0.0, 10.0, 0.0, 10.0]);

        let plan = FetchPlan::new(0, &level, &ImageGeometry::default(), Some(&bounds)).unwrap();

        assert_eq!(plan.chunk_extent.range(Axis::X), 0..3);
        assert_eq!(
            plan.chunk_coords,
            vec![
                AxisMap([0, 0, 0, 0, 0]),
                AxisMap([1, 0, 0, 0, 0]),
                AxisMap([0, 1, 0, 0, 0]),
                AxisMap([1, 1, 0, 0, 0]),
                AxisMap([0, 2, 0, 0, 0]),
                AxisMap([1, 2, 0, 0, 0]),
            ]
        );
    }

    #[test]
    fn region_origin_is_world_position_of_first_element() {
        let level = level();
        let geometry = ImageGeometry {
            origin: PointN([100.0, 200.0, 300.0]),
            spacing: PointN([2.0, 2.0, 4.0]),
            ..Default::default()
        };
        let bounds = WorldBounds::from_flat([120.0, 140.0, 210.0, 220.0, 300.0, 340.0]);

        let plan = FetchPlan::new(1, &level, &geometry, Some(&bounds)).unwrap();

        assert_eq!(plan.index_extent.range(Axis::X), 10..20);
        assert_eq!(plan.index_extent.range(Axis::Y), 5..10);
        assert_eq!(plan.index_extent.range(Axis::Z), 0..10);
        assert_eq!(plan.origin, PointN([120.0, 210.0, 300.0]));
    }
}
