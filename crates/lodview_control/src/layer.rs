use crate::LoadedImages;

use lodview_core::prelude::*;
use lodview_storage::prelude::*;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Bounds that differ by less than this are considered equal.
pub const BOUNDS_EPSILON: f64 = 1e-6;

/// Everything a `LodController` knows about the layer it drives.
#[derive(Clone, Debug)]
pub struct LayerActorState {
    pub image: Option<MultiscaleImage>,
    pub label_image: Option<MultiscaleImage>,
    /// The scale the next load will use.
    pub rendered_scale: usize,
    /// The scale of the load in flight, or of the last one started.
    pub target_scale: usize,
    /// The scale of the images currently displayed.
    pub loaded_scale: Option<usize>,
    /// The world bounds the consumer reported for the displayed images.
    pub loaded_bounds: Option<WorldBounds>,
    /// The current crop. `None` is the whole image.
    pub needed_bounds: Option<WorldBounds>,
    /// The bounds of the whole level at `loaded_scale`.
    pub full_bounds: Option<WorldBounds>,
    pub is_framerate_scale_picking_on: bool,
    pub independent_components: bool,
    pub visualized_components: Vec<usize>,
    /// The latest frame rate sample.
    pub framerate: Option<f64>,
    /// Incremented for every load; completions of older generations are dropped.
    pub generation: u64,
    /// A crop change arrived outside of `Active` and has not been handled yet.
    pub bounds_change_pending: bool,
    pub rendered: Option<RenderedLayer>,
}

impl Default for LayerActorState {
    fn default() -> Self {
        Self {
            image: None,
            label_image: None,
            rendered_scale: 0,
            target_scale: 0,
            loaded_scale: None,
            loaded_bounds: None,
            needed_bounds: None,
            full_bounds: None,
            is_framerate_scale_picking_on: true,
            independent_components: true,
            visualized_components: Vec::new(),
            framerate: None,
            generation: 0,
            bounds_change_pending: false,
            rendered: None,
        }
    }
}

impl LayerActorState {
    /// The image whose levels decide the scales: the intensity image if there is one, else the label image.
    pub fn primary(&self) -> Option<&MultiscaleImage> {
        self.image.as_ref().or(self.label_image.as_ref())
    }

    pub fn has_image(&self) -> bool {
        self.primary().is_some()
    }

    pub fn lowest_scale(&self) -> usize {
        self.primary().map_or(0, MultiscaleImage::lowest_scale)
    }

    /// The voxel count of the level one finer than `rendered_scale`, if there is one.
    pub fn next_finer_voxel_count(&self) -> Option<u64> {
        let finer = self.rendered_scale.checked_sub(1)?;

        self.primary().map(|image| image.voxel_count(finer))
    }

    /// Starts over at the coarsest scale of `image`.
    pub fn assign_image(&mut self, image: MultiscaleImage) {
        self.visualized_components = (0..image.image_type().components).collect();
        self.image = Some(image);
        self.reset_scale();
    }

    pub fn assign_label_image(&mut self, image: MultiscaleImage) {
        self.label_image = Some(image);
        if self.image.is_none() {
            self.reset_scale();
        } else {
            // Forces a reload at the current scale.
            self.loaded_scale = None;
        }
    }

    fn reset_scale(&mut self) {
        self.rendered_scale = self.lowest_scale();
        self.target_scale = self.rendered_scale;
        self.loaded_scale = None;
        self.loaded_bounds = None;
        self.full_bounds = None;
    }

    /// # Panics
    ///
    /// If `scale` is coarser than the coarsest level.
    pub fn set_rendered_scale(&mut self, scale: usize) {
        assert!(
            scale <= self.lowest_scale(),
            "scale {} is out of range, the coarsest is {}",
            scale,
            self.lowest_scale()
        );
        self.rendered_scale = scale;
    }

    /// Goes back to the scale of the displayed images, if any.
    pub fn revert_scale(&mut self) {
        if let Some(loaded) = self.loaded_scale {
            self.rendered_scale = loaded;
        }
        self.target_scale = self.rendered_scale;
    }

    /// Records `loaded` as displayed, covering `displayed_bounds`.
    pub fn commit(&mut self, rendered: RenderedLayer, displayed_bounds: WorldBounds) {
        self.full_bounds = self.primary().and_then(|image| image.image_meta(rendered.scale)).map(|m| m.world_bounds());
        self.loaded_scale = Some(rendered.scale);
        self.loaded_bounds = Some(displayed_bounds);
        self.rendered = Some(rendered);
    }

    /// False only when the displayed images are at the rendered scale and already cover the crop.
    pub fn is_image_update_needed(&self) -> bool {
        if self.loaded_scale != Some(self.rendered_scale) {
            return true;
        }
        let (loaded, full) = match (self.loaded_bounds, self.full_bounds) {
            (Some(loaded), Some(full)) => (loaded, full),
            _ => return true,
        };
        let needed = self.needed_bounds.map_or(full, |b| b.clamped_to(&full));

        needed.extends_beyond(&loaded.clamped_to(&full), BOUNDS_EPSILON)
    }

    pub fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot {
            has_image: self.has_image(),
            rendered_scale: self.rendered_scale,
            lowest_scale: self.lowest_scale(),
            next_finer_voxel_count: self.next_finer_voxel_count(),
            is_framerate_scale_picking_on: self.is_framerate_scale_picking_on,
            is_image_update_needed: self.is_image_update_needed(),
        }
    }
}

/// The facts about a layer that transitions depend on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerSnapshot {
    pub has_image: bool,
    pub rendered_scale: usize,
    pub lowest_scale: usize,
    pub next_finer_voxel_count: Option<u64>,
    pub is_framerate_scale_picking_on: bool,
    pub is_image_update_needed: bool,
}

/// What the consumer displays for a layer.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedLayer {
    pub scale: usize,
    pub image: Option<Arc<AssembledImage>>,
    pub label_image: Option<Arc<AssembledImage>>,
    /// `[min, max]` of each component of `image`.
    pub ranges: Vec<[f64; 2]>,
    /// The distinct values of `label_image`, ascending.
    pub labels: Vec<i64>,
}

impl RenderedLayer {
    /// Ranges declared by the level in `value_ranges` take precedence over ranges computed from the pixels.
    pub fn new(loaded: &LoadedImages, value_ranges: Option<&BTreeMap<usize, [f64; 2]>>) -> Self {
        let ranges = loaded
            .image
            .as_ref()
            .map(|image| {
                let mut ranges = image.component_ranges();
                for (c, range) in ranges.iter_mut().enumerate() {
                    if let Some(declared) = value_ranges.and_then(|v| v.get(&c)) {
                        *range = *declared;
                    }
                }
                ranges
            })
            .unwrap_or_default();

        let labels = loaded
            .label_image
            .as_ref()
            .map(|label| {
                let data = &label.data;
                let unique: BTreeSet<i64> = (0..data.len()).filter_map(|i| data.get_f64(i)).map(|v| v as i64).collect();
                unique.into_iter().collect()
            })
            .unwrap_or_default();

        Self {
            scale: loaded.scale,
            image: loaded.image.clone(),
            label_image: loaded.label_image.clone(),
            ranges,
            labels,
        }
    }

    /// The bounds covered by the rendered images.
    pub fn world_bounds(&self) -> Option<WorldBounds> {
        self.image.as_ref().or(self.label_image.as_ref()).map(|image| image.world_bounds())
    }
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
