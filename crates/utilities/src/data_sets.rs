use crate::sources::{CountingChunkSource, FetchStats, InMemoryChunkSource};

use lodview_core::prelude::*;
use lodview_storage::prelude::*;

use std::sync::Arc;

/// Stored in chunk elements that lie outside the array, so tests can tell if padding leaks into an image.
pub const PADDING_VALUE: u16 = u16::MAX;

/// Describes a synthetic `u16` pyramid where every level halves the previous one (rounding up) along each spatial axis.
#[derive(Clone, Debug)]
pub struct PyramidParams {
    pub dimension: usize,
    /// Spatial shape of scale 0. Ignored beyond `dimension`.
    pub shape: [i64; 3],
    pub chunk_shape: [i64; 3],
    pub components: usize,
    pub num_scales: usize,
    /// Spacing of scale 0; doubles with every scale.
    pub spacing: f64,
}

impl Default for PyramidParams {
    fn default() -> Self {
        Self {
            dimension: 3,
            shape: [64, 64, 64],
            chunk_shape: [16, 16, 16],
            components: 1,
            num_scales: 3,
            spacing: 1.0,
        }
    }
}

impl PyramidParams {
    pub fn image_type(&self) -> ImageType {
        ImageType {
            components: self.components,
            ..ImageType::scalar(self.dimension, ComponentType::U16)
        }
    }

    /// Spatial shape at `scale`.
    pub fn shape_at(&self, scale: usize) -> [i64; 3] {
        let mut shape = self.shape;
        for _ in 0..scale {
            shape = shape.map(|s| (s + 1) / 2);
        }

        shape
    }

    pub fn spacing_at(&self, scale: usize) -> f64 {
        self.spacing * (1 << scale) as f64
    }

    fn spatial(&self) -> &'static [Axis] {
        Axis::spatial(self.dimension)
    }

    fn level_spec(&self, scale: usize) -> LevelSpec {
        let shape = self.shape_at(scale);
        let mut dims = vec![Axis::C];
        dims.extend(self.spatial().iter().rev());

        let mut array_shape: std::collections::BTreeMap<_, _> = self
            .spatial()
            .iter()
            .map(|&a| (a, shape[a.index() - 1]))
            .collect();
        array_shape.insert(Axis::C, self.components as i64);

        let mut chunk_shape: std::collections::BTreeMap<_, _> = self
            .spatial()
            .iter()
            .map(|&a| (a, self.chunk_shape[a.index() - 1]))
            .collect();
        chunk_shape.insert(Axis::C, 1);

        LevelSpec {
            name: format!("ramp_s{}", scale),
            dims,
            array_shape,
            chunk_shape,
            ..Default::default()
        }
    }
}

/// The value stored at `p` of `scale`.
pub fn ramp_value(scale: usize, p: &AxisMap<i64>) -> u16 {
    let v = scale as i64 * 7 + p[Axis::C] * 1000 + p[Axis::Z] * 100 + p[Axis::Y] * 10 + p[Axis::X];

    (v % 60_000) as u16
}

/// Builds the levels of a ramp pyramid along with a source serving all of its chunks.
pub fn ramp_pyramid(params: &PyramidParams) -> (Vec<PyramidLevel>, InMemoryChunkSource) {
    let mut source = InMemoryChunkSource::default();
    let mut levels = Vec::with_capacity(params.num_scales);

    for scale in 0..params.num_scales {
        let spacing = params.spacing_at(scale);
        let coordinates: Vec<_> = params
            .spatial()
            .iter()
            .map(|&a| {
                let len = params.shape_at(scale)[a.index() - 1] as usize;
                (a, CoordinateSequence::uniform(0.0, spacing, len))
            })
            .collect();

        let level = PyramidLevel::new(params.level_spec(scale), coordinates)
            .unwrap_or_else(|e| panic!("bad synthetic level {}: {}", scale, e));

        let grid = IndexExtent::full(*level.chunk_grid_shape());
        let layout = ChunkLayout::new(&level, ComponentType::U16);
        let strides = layout.strides();
        let full = IndexExtent::full(*level.array_shape());
        for coord in grid.iter_points() {
            let elements = IndexExtent::chunk_elements(&coord, level.chunk_shape());
            let mut values = vec![PADDING_VALUE; level.chunk_len()];
            for p in elements.iter_points().filter(|p| full.contains(p)) {
                let offset: usize = Axis::CXYZT
                    .iter()
                    .map(|&a| (p[a] - elements.minimum[a]) as usize * strides[a])
                    .sum();
                values[offset] = ramp_value(scale, &p);
            }
            let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
            source.insert(scale, coord, Arc::from(bytes));
        }

        levels.push(level);
    }

    (levels, source)
}

/// A `MultiscaleImage` over a ramp pyramid, with the stats of its chunk source.
pub fn ramp_image(params: &PyramidParams, config: AccessorConfig) -> (MultiscaleImage, Arc<FetchStats>) {
    let (levels, source) = ramp_pyramid(params);
    let source = CountingChunkSource::new(source);
    let stats = source.stats();

    let image = MultiscaleImage::new("ramp", params.image_type(), levels, source, config)
        .unwrap_or_else(|e| panic!("bad synthetic image: {}", e));

    (image, stats)
}
