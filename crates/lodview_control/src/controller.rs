use crate::{
    transition, Action, AppearanceChange, Event, LayerActorState, LayerConsumer, LoadedImages, LodConfig,
    RenderedLayer, State, Transition,
};

use lodview_core::WorldBounds;
use lodview_storage::{AccessError, AssembledImage, MultiscaleImage};

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesOrdered, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum ControllerError {
    #[error("failed to load scale {scale}")]
    Load {
        scale: usize,
        #[source]
        source: AccessError,
    },
}

struct LoadOutcome {
    generation: u64,
    scale: usize,
    result: Result<LoadedImages, AccessError>,
}

/// Drives the level-of-detail machine of one layer.
///
/// Events are handled synchronously by `send`. Image loads run in the background: await `next_load` (or
/// `run_until_idle`) to complete them, in the order they were started. A load that completes after a newer one was
/// started is dropped. Time only advances through the `Instant`s given to `send` and `poll_timers`.
pub struct LodController<C> {
    config: LodConfig,
    state: State,
    layer: LayerActorState,
    consumer: C,
    queue: VecDeque<Event>,
    loads: FuturesOrdered<BoxFuture<'static, LoadOutcome>>,
    debounce_deadline: Option<Instant>,
    error: Option<ControllerError>,
}

impl<C> LodController<C>
where
    C: LayerConsumer,
{
    pub fn new(config: LodConfig, consumer: C) -> Self {
        Self {
            config,
            state: State::Idle,
            layer: LayerActorState::default(),
            consumer,
            queue: VecDeque::new(),
            loads: FuturesOrdered::new(),
            debounce_deadline: None,
            error: None,
        }
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn layer(&self) -> &LayerActorState {
        &self.layer
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debounce_deadline
    }

    pub fn num_pending_loads(&self) -> usize {
        self.loads.len()
    }

    /// Handles `event` and every event it leads to.
    ///
    /// # Panics
    ///
    /// On `Event::SetImageScale` with a scale coarser than the coarsest level.
    pub fn send(&mut self, event: Event, now: Instant) {
        self.queue.push_back(event);
        self.process(now);
    }

    /// Closes the debounce window if it ended at or before `now`. Returns `true` if it did.
    pub fn poll_timers(&mut self, now: Instant) -> bool {
        match self.debounce_deadline {
            Some(deadline) if deadline <= now => {
                self.debounce_deadline = None;
                self.send(Event::DebounceElapsed, now);
                true
            }
            _ => false,
        }
    }

    /// Waits for the oldest load in flight and handles its result. Returns `None` when nothing is loading.
    pub async fn next_load(&mut self, now: Instant) -> Option<Result<(), ControllerError>> {
        let outcome = self.loads.next().await?;

        if outcome.generation != self.layer.generation {
            tracing::warn!(
                "dropping stale load of scale {} (generation {}, current {})",
                outcome.scale,
                outcome.generation,
                self.layer.generation
            );
            return Some(Ok(()));
        }

        let event = match outcome.result {
            Ok(loaded) => Event::ImageLoaded(loaded),
            Err(error) => Event::ImageLoadFailed {
                scale: outcome.scale,
                error,
            },
        };
        self.send(event, now);

        Some(self.error.take().map_or(Ok(()), Err))
    }

    /// Handles loads until none are in flight, stopping at the first failure.
    pub async fn run_until_idle(&mut self, now: Instant) -> Result<(), ControllerError> {
        while let Some(result) = self.next_load(now).await {
            result?;
        }

        Ok(())
    }

    fn process(&mut self, now: Instant) {
        while let Some(event) = self.queue.pop_front() {
            let snapshot = self.layer.snapshot();
            let Transition { next, actions } = transition(&self.state, &snapshot, &event, &self.config);
            if next != self.state {
                tracing::debug!("{} -> {}", self.state, next);
            }
            self.state = next;

            for action in actions {
                self.apply(action, now);
            }

            if self.state != State::ImageBoundsDebouncing {
                self.debounce_deadline = None;
            }
            match self.state {
                State::Active if self.layer.bounds_change_pending => {
                    self.layer.bounds_change_pending = false;
                    self.queue.push_back(Event::CroppingPlanesChanged(self.layer.needed_bounds));
                }
                State::Finished => {
                    self.queue.clear();
                    self.loads = FuturesOrdered::new();
                }
                _ => {}
            }
        }
    }

    fn apply(&mut self, action: Action, now: Instant) {
        match action {
            Action::AssignImage(image) => {
                tracing::info!("assigned image {} with {} scales", image.name(), image.num_scales());
                self.layer.assign_image(image);
            }
            Action::AssignLabelImage(image) => {
                tracing::info!("assigned label image {} with {} scales", image.name(), image.num_scales());
                self.layer.assign_label_image(image);
            }
            Action::SetRenderedScale(scale) => {
                if scale != self.layer.rendered_scale {
                    tracing::info!("rendered scale {} -> {}", self.layer.rendered_scale, scale);
                }
                self.layer.set_rendered_scale(scale);
            }
            Action::LoadImage => self.start_load(),
            Action::CommitImage(loaded) => self.commit(loaded),
            Action::RevertScale => self.layer.revert_scale(),
            Action::ReportError { scale, error } => {
                self.error = Some(ControllerError::Load { scale, source: error });
            }
            Action::RequestFramerate => self.consumer.request_framerate(),
            Action::RecordFramerate(fps) => self.layer.framerate = Some(fps),
            Action::UpdateHistogram => {
                if let Some(rendered) = &self.layer.rendered {
                    self.consumer.update_histogram(rendered);
                }
                self.queue.push_back(Event::HistogramUpdated);
            }
            Action::ApplyAppearance(change) => {
                if let AppearanceChange::ComponentVisibility { component, visible } = change {
                    self.set_component_visibility(component, visible);
                }
                self.consumer.apply_appearance(&change);
            }
            Action::SetNeededBounds(bounds) => self.layer.needed_bounds = bounds,
            Action::ArmDebounce => self.debounce_deadline = Some(now + self.config.debounce()),
            Action::DeferBoundsChange => self.layer.bounds_change_pending = true,
            Action::SetFramerateScalePicking(on) => self.layer.is_framerate_scale_picking_on = on,
            Action::SetIndependentComponents(on) => self.layer.independent_components = on,
        }
    }

    fn set_component_visibility(&mut self, component: usize, visible: bool) {
        let components = &mut self.layer.visualized_components;
        match (components.binary_search(&component), visible) {
            (Err(i), true) => components.insert(i, component),
            (Ok(i), false) => {
                components.remove(i);
            }
            _ => {}
        }
    }

    fn start_load(&mut self) {
        if !self.layer.has_image() {
            return;
        }

        self.layer.generation += 1;
        self.layer.target_scale = self.layer.rendered_scale;
        let generation = self.layer.generation;
        let scale = self.layer.rendered_scale;
        let bounds = self.layer.needed_bounds;
        let image = self.layer.image.clone();
        let label_image = self.layer.label_image.clone();
        tracing::debug!("loading scale {} (generation {})", scale, generation);

        let load = async move {
            let (image, label_image) =
                futures::future::join(load_scale(image, scale, bounds), load_scale(label_image, scale, bounds)).await;
            let result = image.and_then(|image| {
                label_image.map(|label_image| LoadedImages {
                    generation,
                    scale,
                    bounds,
                    image,
                    label_image,
                })
            });

            LoadOutcome {
                generation,
                scale,
                result,
            }
        };
        self.loads.push_back(load.boxed());
    }

    fn commit(&mut self, loaded: LoadedImages) {
        let value_ranges = self.layer.image.as_ref().and_then(|image| image.value_ranges(loaded.scale));
        let rendered = RenderedLayer::new(&loaded, value_ranges);

        let displayed = self.consumer.render(&rendered, self.layer.target_scale);
        tracing::debug!("displaying scale {} over {:?}", rendered.scale, displayed.to_flat());
        self.layer.commit(rendered, displayed);
    }
}

/// Loads `scale` of `image`, or the coarsest scale if `image` has fewer levels.
async fn load_scale(
    image: Option<MultiscaleImage>,
    scale: usize,
    bounds: Option<WorldBounds>,
) -> Result<Option<Arc<AssembledImage>>, AccessError> {
    match image {
        Some(image) => {
            let scale = scale.min(image.lowest_scale());
            image.get_image(scale, bounds.as_ref()).await.map(Some)
        }
        None => Ok(None),
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

    use lodview_storage::FetchError;
    use pretty_assertions::assert_eq;
    use std::error::Error as StdError;

    #[test]
    fn load_error_chains_its_cause() {
        let error = ControllerError::Load {
            scale: 1,
            source: AccessError::Fetch(FetchError::new(1, 4, "disk gone")),
        };

        assert_eq!(error.to_string(), "failed to load scale 1");
        let cause = error.source().unwrap();
        assert_eq!(cause.to_string(), "failed to fetch 4 chunk(s) at scale 1");
        assert_eq!(cause.source().map(|e| e.to_string()), Some("disk gone".to_owned()));
    }
}
