use core::fmt;

/// The state of one layer's level-of-detail machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    /// No image has been assigned yet.
    Idle,
    /// Loading the image at the rendered scale.
    UpdateRenderedImage,
    /// Waiting for the consumer to recompute its histogram.
    UpdateHistogram,
    /// Steady state.
    Active,
    /// Waiting for crop changes to settle.
    ImageBoundsDebouncing,
    /// Hill climbing over scales driven by frame rate samples.
    AdjustScaleForFramerate { phase: AdjustPhase, awaiting: Awaiting },
    /// Loading an explicitly requested scale.
    SetImageScale,
    /// Terminal. Every event is ignored.
    Finished,
}

impl State {
    /// True in the states that wait on an image load.
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            State::UpdateRenderedImage
                | State::SetImageScale
                | State::AdjustScaleForFramerate {
                    awaiting: Awaiting::Render,
                    ..
                }
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, State::Finished)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::AdjustScaleForFramerate { phase, awaiting } => {
                write!(f, "AdjustScaleForFramerate.{:?} ({:?})", phase, awaiting)
            }
            other => write!(f, "{:?}", other),
        }
    }
}

/// Where an adjustment run is.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdjustPhase {
    /// No step has been taken yet.
    CheckStarted,
    /// The last step went one level finer.
    ScaleTooLow,
    /// The last step went one level coarser. The next sample ends the run.
    ScaleJustRight,
}

/// What an adjustment step is waiting for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Awaiting {
    Render,
    Sample,
}
