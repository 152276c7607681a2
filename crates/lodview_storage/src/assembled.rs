use crate::{CacheWeight, ImageType, PixelBuffer};

use lodview_core::prelude::*;

use serde::{Deserialize, Serialize};

/// A dense image materialized from one pyramid level, possibly restricted to a region.
///
/// `data` has x varying fastest, then y, then z, with the components of each pixel interleaved innermost. `origin`,
/// `spacing` and `size` have `image_type.dimension` entries; `direction` is the `dimension × dimension` row-major matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledImage {
    pub image_type: ImageType,
    pub name: String,
    pub origin: Vec<f64>,
    pub spacing: Vec<f64>,
    pub direction: Vec<f64>,
    pub size: Vec<usize>,
    pub data: PixelBuffer,
}

impl AssembledImage {
    pub fn num_pixels(&self) -> usize {
        self.size.iter().product()
    }

    /// The world-space box covered by the image's elements, taking each element as a cell of size `spacing`.
    pub fn world_bounds(&self) -> WorldBounds {
        cell_bounds(&self.origin, &self.spacing, &self.direction, &self.size)
    }

    /// The `[min, max]` of each component, computed from `data`. NaN values are ignored. A component with no values gets
    /// `[0, 0]`.
    pub fn component_ranges(&self) -> Vec<[f64; 2]> {
        let components = self.image_type.components.max(1);

        (0..components)
            .map(|c| self.data.strided_range(c, components).unwrap_or([0.0, 0.0]))
            .collect()
    }
}

impl CacheWeight for AssembledImage {
    fn weight_bytes(&self) -> usize {
        self.data.byte_len()
    }
}

/// The same description as an `AssembledImage`, without any pixel data.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ImageMeta {
    pub image_type: ImageType,
    pub name: String,
    pub origin: Vec<f64>,
    pub spacing: Vec<f64>,
    pub direction: Vec<f64>,
    pub size: Vec<usize>,
}

impl ImageMeta {
    pub fn geometry(&self) -> ImageGeometry {
        geometry(&self.origin, &self.spacing, &self.direction)
    }

    /// See `AssembledImage::world_bounds`.
    pub fn world_bounds(&self) -> WorldBounds {
        cell_bounds(&self.origin, &self.spacing, &self.direction, &self.size)
    }
}

fn geometry(origin: &[f64], spacing: &[f64], direction: &[f64]) -> ImageGeometry {
    let direction = Direction::from_slice(direction).unwrap_or_default();

    ImageGeometry::from_slices(origin, spacing, direction)
}

/// A degenerate geometry yields the empty box at `origin`.
fn cell_bounds(origin: &[f64], spacing: &[f64], direction: &[f64], size: &[usize]) -> WorldBounds {
    let geometry = geometry(origin, spacing, direction);
    let transform = match AffineTransform::new(&geometry) {
        Ok(t) => t,
        Err(_) => return WorldBounds::from_min_and_max(geometry.origin, geometry.origin),
    };

    let extent = PointN([0, 1, 2].map(|i| size.get(i).copied().unwrap_or(1) as f64));
    let index_box = WorldBounds::from_min_and_max(Point3f::ZERO, extent);
    let corners = index_box.corners().map(|c| transform.index_to_world(&c));

    WorldBounds::from_points(corners).unwrap_or(index_box)
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
    use crate::ComponentType;

    fn image() -> AssembledImage {
        AssembledImage {
            image_type: ImageType {
                components: 2,
                ..ImageType::scalar(2, ComponentType::I16)
            },
            name: "pair".into(),
            origin: vec![1.0, 2.0],
            spacing: vec![0.5, 2.0],
            direction: vec![1.0, 0.0, 0.0, 1.0],
            size: vec![2, 3],
            data: PixelBuffer::I16(vec![0, 10, 1, 11, 2, 12, -3, 13, 4, 14, 5, 15]),
        }
    }

    #[test]
    fn world_bounds_span_whole_cells() {
        assert_eq!(image().world_bounds().to_flat(), [1.0, 2.0, 2.0, 8.0, 0.0, 1.0]);
    }

    #[test]
    fn component_ranges_are_per_component() {
        let image = image();

        assert_eq!(image.component_ranges(), vec![[-3.0, 5.0], [10.0, 15.0]]);
        assert_eq!(image.weight_bytes(), 24);
        assert_eq!(image.num_pixels(), 6);
    }
}
