//! The transition function of the level-of-detail machine.
//!
//! `transition` is pure: it looks only at the current `State`, a `LayerSnapshot` and the incoming `Event`, and returns
//! the next state with the `Action`s that take it there. The `LodController` applies the actions.

use crate::{AdjustPhase, AppearanceChange, Awaiting, Event, LayerSnapshot, LoadedImages, LodConfig, State};

use lodview_core::WorldBounds;
use lodview_storage::{AccessError, MultiscaleImage};

/// A side effect requested by a transition.
#[derive(Clone, Debug)]
pub enum Action {
    AssignImage(MultiscaleImage),
    AssignLabelImage(MultiscaleImage),
    SetRenderedScale(usize),
    /// Start loading the images at the rendered scale and the needed bounds.
    LoadImage,
    CommitImage(LoadedImages),
    /// Go back to the scale of the displayed images.
    RevertScale,
    ReportError { scale: usize, error: AccessError },
    RequestFramerate,
    RecordFramerate(f64),
    UpdateHistogram,
    ApplyAppearance(AppearanceChange),
    SetNeededBounds(Option<WorldBounds>),
    /// (Re)start the debounce window.
    ArmDebounce,
    /// Replay the crop change once `Active` is reached.
    DeferBoundsChange,
    SetFramerateScalePicking(bool),
    SetIndependentComponents(bool),
}

#[derive(Clone, Debug)]
pub struct Transition {
    pub next: State,
    pub actions: Vec<Action>,
}

impl Transition {
    fn to(next: State, actions: Vec<Action>) -> Self {
        Self { next, actions }
    }

    fn stay(state: State) -> Self {
        Self::to(state, Vec::new())
    }
}

/// At or below the minimum frame rate.
pub fn is_too_slow(fps: f64, config: &LodConfig) -> bool {
    fps <= config.min_framerate
}

/// Whether the sample `fps` ends an adjustment run in `phase`.
pub fn is_adjustment_finished(phase: AdjustPhase, snapshot: &LayerSnapshot, fps: f64, config: &LodConfig) -> bool {
    phase == AdjustPhase::ScaleJustRight
        || config.is_framerate_acceptable(fps)
        || snapshot.rendered_scale == 0
        || snapshot
            .next_finer_voxel_count
            .map_or(false, |count| count > config.max_rendered_voxels)
        || (is_too_slow(fps, config) && snapshot.rendered_scale >= snapshot.lowest_scale)
}

pub fn transition(state: &State, snapshot: &LayerSnapshot, event: &Event, config: &LodConfig) -> Transition {
    let state = *state;
    if state.is_finished() {
        return Transition::stay(state);
    }

    // Valid in every state.
    match event {
        Event::Finish => return Transition::stay(State::Finished),
        Event::Appearance(change) => {
            return Transition::to(state, vec![Action::ApplyAppearance(change.clone())]);
        }
        Event::FramerateScalePickingToggled(on) => {
            return Transition::to(state, vec![Action::SetFramerateScalePicking(*on)]);
        }
        Event::IndependentComponentsToggled(on) => {
            return Transition::to(state, vec![Action::SetIndependentComponents(*on)]);
        }
        Event::ImageAssigned(image) => {
            return Transition::to(
                State::UpdateRenderedImage,
                vec![Action::AssignImage(image.clone()), Action::LoadImage],
            );
        }
        Event::LabelImageAssigned(image) => {
            return Transition::to(
                State::UpdateRenderedImage,
                vec![Action::AssignLabelImage(image.clone()), Action::LoadImage],
            );
        }
        Event::CroppingPlanesChanged(bounds) => return crop_changed(state, *bounds),
        Event::UpdateRenderedImage if snapshot.has_image => {
            return Transition::to(State::UpdateRenderedImage, vec![Action::LoadImage]);
        }
        Event::UpdateHistogram if snapshot.has_image => {
            return Transition::to(State::UpdateHistogram, vec![Action::UpdateHistogram]);
        }
        Event::AdjustScaleForFramerate if snapshot.has_image => {
            return Transition::to(
                State::AdjustScaleForFramerate {
                    phase: AdjustPhase::CheckStarted,
                    awaiting: Awaiting::Sample,
                },
                vec![Action::RequestFramerate],
            );
        }
        Event::SetImageScale(scale) if snapshot.has_image => {
            return Transition::to(
                State::SetImageScale,
                vec![
                    Action::SetFramerateScalePicking(false),
                    Action::SetRenderedScale(*scale),
                    Action::LoadImage,
                ],
            );
        }
        _ => {}
    }

    match (state, event) {
        (State::ImageBoundsDebouncing, Event::DebounceElapsed) => debounce_elapsed(snapshot),
        (_, Event::ImageLoaded(loaded)) => image_loaded(state, snapshot, loaded),
        (_, Event::ImageLoadFailed { scale, error }) => {
            let next = if state.is_loading() { State::Active } else { state };
            let report = Action::ReportError {
                scale: *scale,
                error: error.clone(),
            };
            Transition::to(next, vec![Action::RevertScale, report])
        }
        (
            State::AdjustScaleForFramerate {
                phase,
                awaiting: Awaiting::Sample,
            },
            Event::FramerateUpdated(fps),
        ) => framerate_sampled(phase, snapshot, *fps, config),
        (_, Event::FramerateUpdated(fps)) => Transition::to(state, vec![Action::RecordFramerate(*fps)]),
        (State::UpdateHistogram, Event::HistogramUpdated) => Transition::stay(State::Active),
        _ => Transition::stay(state),
    }
}

fn crop_changed(state: State, bounds: Option<WorldBounds>) -> Transition {
    match state {
        State::Active | State::ImageBoundsDebouncing => Transition::to(
            State::ImageBoundsDebouncing,
            vec![Action::SetNeededBounds(bounds), Action::ArmDebounce],
        ),
        // The first load picks up the bounds.
        State::Idle => Transition::to(state, vec![Action::SetNeededBounds(bounds)]),
        _ => Transition::to(state, vec![Action::SetNeededBounds(bounds), Action::DeferBoundsChange]),
    }
}

fn debounce_elapsed(snapshot: &LayerSnapshot) -> Transition {
    if !snapshot.is_image_update_needed {
        Transition::to(State::UpdateHistogram, vec![Action::UpdateHistogram])
    } else if snapshot.is_framerate_scale_picking_on {
        Transition::to(
            State::AdjustScaleForFramerate {
                phase: AdjustPhase::CheckStarted,
                awaiting: Awaiting::Render,
            },
            vec![Action::LoadImage],
        )
    } else {
        Transition::to(State::UpdateRenderedImage, vec![Action::LoadImage])
    }
}

fn image_loaded(state: State, snapshot: &LayerSnapshot, loaded: &LoadedImages) -> Transition {
    let mut actions = vec![Action::CommitImage(loaded.clone())];

    let next = match state {
        State::UpdateRenderedImage if snapshot.is_framerate_scale_picking_on => {
            actions.push(Action::RequestFramerate);
            State::AdjustScaleForFramerate {
                phase: AdjustPhase::CheckStarted,
                awaiting: Awaiting::Sample,
            }
        }
        State::UpdateRenderedImage | State::SetImageScale => {
            actions.push(Action::UpdateHistogram);
            State::UpdateHistogram
        }
        State::AdjustScaleForFramerate {
            phase,
            awaiting: Awaiting::Render,
        } => {
            actions.push(Action::RequestFramerate);
            State::AdjustScaleForFramerate {
                phase,
                awaiting: Awaiting::Sample,
            }
        }
        other => other,
    };

    Transition::to(next, actions)
}

fn framerate_sampled(phase: AdjustPhase, snapshot: &LayerSnapshot, fps: f64, config: &LodConfig) -> Transition {
    let mut actions = vec![Action::RecordFramerate(fps)];

    if is_adjustment_finished(phase, snapshot, fps, config) {
        actions.push(Action::UpdateHistogram);
        return Transition::to(State::UpdateHistogram, actions);
    }

    let (scale, phase) = if is_too_slow(fps, config) {
        (snapshot.rendered_scale + 1, AdjustPhase::ScaleJustRight)
    } else {
        (snapshot.rendered_scale - 1, AdjustPhase::ScaleTooLow)
    };
    actions.push(Action::SetRenderedScale(scale));
    actions.push(Action::LoadImage);

    Transition::to(
        State::AdjustScaleForFramerate {
            phase,
            awaiting: Awaiting::Render,
        },
        actions,
    )
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
