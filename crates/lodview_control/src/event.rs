use lodview_core::prelude::*;
use lodview_storage::prelude::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything a `LodController` reacts to.
#[derive(Clone, Debug)]
pub enum Event {
    ImageAssigned(MultiscaleImage),
    LabelImageAssigned(MultiscaleImage),
    /// Reload the image at the rendered scale.
    UpdateRenderedImage,
    UpdateHistogram,
    /// Start an adjustment run from the rendered scale.
    AdjustScaleForFramerate,
    /// Pin the rendered scale. Disables frame rate adaptation.
    SetImageScale(usize),
    /// The crop region changed. `None` is the whole image.
    CroppingPlanesChanged(Option<WorldBounds>),
    /// The debounce window closed. Sent by `LodController::poll_timers`.
    DebounceElapsed,
    ImageLoaded(LoadedImages),
    ImageLoadFailed { scale: usize, error: AccessError },
    /// The consumer finished its histogram update.
    HistogramUpdated,
    FramerateUpdated(f64),
    FramerateScalePickingToggled(bool),
    IndependentComponentsToggled(bool),
    Appearance(AppearanceChange),
    Finish,
}

/// The result of one load, at one scale and generation.
#[derive(Clone, Debug)]
pub struct LoadedImages {
    pub generation: u64,
    pub scale: usize,
    pub bounds: Option<WorldBounds>,
    pub image: Option<Arc<AssembledImage>>,
    pub label_image: Option<Arc<AssembledImage>>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    Composite,
    Maximum,
    Minimum,
    Average,
}

/// A change of how a layer looks. Applied by the consumer without touching the loaded data.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum AppearanceChange {
    LayerVisibility(bool),
    ComponentVisibility { component: usize, visible: bool },
    ColorMap { component: usize, color_map: String },
    ColorRange { component: usize, range: [f64; 2] },
    PiecewiseFunction { component: usize, points: Vec<[f64; 2]> },
    GradientOpacity(f64),
    GradientOpacityScale(f64),
    Interpolation(bool),
    Shadow(bool),
    BlendMode(BlendMode),
    VolumeSampleDistance(f64),
    LabelLookupTable(String),
    LabelBlend(f64),
    LabelWeights(BTreeMap<i64, f64>),
    LabelNames(BTreeMap<i64, String>),
    SelectedLabel(Option<i64>),
}
