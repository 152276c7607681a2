use lodview_control::{AppearanceChange, LayerConsumer, RenderedLayer};
use lodview_core::prelude::*;

/// One call to `LayerConsumer::render`.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderRecord {
    pub scale: usize,
    pub target_scale: usize,
    pub bounds: WorldBounds,
    pub num_pixels: usize,
}

/// Remembers every call it receives. Reports the bounds of the rendered images as displayed.
#[derive(Clone, Debug, Default)]
pub struct RecordingConsumer {
    pub renders: Vec<RenderRecord>,
    pub framerate_requests: usize,
    pub histogram_updates: usize,
    pub appearance: Vec<AppearanceChange>,
    pub last_rendered: Option<RenderedLayer>,
}

impl RecordingConsumer {
    pub fn rendered_scales(&self) -> Vec<usize> {
        self.renders.iter().map(|r| r.scale).collect()
    }
}

impl LayerConsumer for RecordingConsumer {
    fn render(&mut self, layer: &RenderedLayer, target_scale: usize) -> WorldBounds {
        let bounds = layer
            .world_bounds()
            .unwrap_or_else(|| WorldBounds::from_flat([0.0; 6]));
        self.renders.push(RenderRecord {
            scale: layer.scale,
            target_scale,
            bounds,
            num_pixels: layer.image.as_ref().map_or(0, |image| image.num_pixels()),
        });
        self.last_rendered = Some(layer.clone());

        bounds
    }

    fn request_framerate(&mut self) {
        self.framerate_requests += 1;
    }

    fn update_histogram(&mut self, _layer: &RenderedLayer) {
        self.histogram_updates += 1;
    }

    fn apply_appearance(&mut self, change: &AppearanceChange) {
        self.appearance.push(change.clone());
    }
}
