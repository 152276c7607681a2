//! Adaptive level-of-detail for multiscale image layers.
//!
//! A `LodController` owns the `LayerActorState` of one displayed layer and decides which scale of its
//! `MultiscaleImage` to render. It reacts to `Event`s from the application (crop changes, explicit scale requests,
//! frame rate samples) and talks back to the renderer through a `LayerConsumer`.
//!
//! While frame rate scale picking is on, every update ends with a hill climb: the layer is rendered, a frame rate
//! sample is requested, and the scale moves one level finer while frames are fast or one level coarser when they are
//! too slow. A coarser step is final: the sample after it ends the run, so a run can return to the scale it just left.
//!
//! The decisions themselves live in the pure `transition` function, so they can be tested without any images.

mod config;
mod consumer;
mod controller;
mod event;
mod layer;
mod machine;
mod state;

pub use config::*;
pub use consumer::*;
pub use controller::*;
pub use event::*;
pub use layer::*;
pub use machine::*;
pub use state::*;

pub mod prelude {
    pub use super::{
        AdjustPhase, AppearanceChange, Awaiting, BlendMode, ControllerError, Event, LayerActorState, LayerConsumer,
        LoadedImages, LodConfig, LodController, RenderedLayer, State,
    };
}
