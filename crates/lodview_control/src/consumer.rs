use crate::{AppearanceChange, RenderedLayer};

use lodview_core::WorldBounds;

use auto_impl::auto_impl;

/// The rendering side of a layer. A `LodController` tells it what to display and when to measure.
#[auto_impl(&mut, Box)]
pub trait LayerConsumer {
    /// Displays `layer`, which was loaded for `target_scale`. Returns the world bounds actually displayed.
    fn render(&mut self, layer: &RenderedLayer, target_scale: usize) -> WorldBounds;

    /// Asks for a frame rate sample. The answer is sent back as `Event::FramerateUpdated`.
    fn request_framerate(&mut self);

    fn update_histogram(&mut self, layer: &RenderedLayer);

    fn apply_appearance(&mut self, change: &AppearanceChange);
}
