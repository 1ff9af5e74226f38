//! The primary [`Component`] of the controller, [`MapController`].

use std::time::Duration;

use bevy_derive::{Deref, DerefMut};
use bevy_ecs::prelude::*;
use bevy_log::prelude::*;
use bevy_reflect::prelude::*;
use bevy_time::prelude::*;
use bevy_window::{RequestRedraw, SystemCursorIcon};

use super::{
    animation::{animatable_fields_differ, AnimationStep, PreemptionStart, ViewportAnimator},
    error::ConfigurationError,
    gestures::{GestureEvent, MapGesture},
    inputs::InputNormalizer,
    limits::ViewportLimits,
    props::{default_cursor, CursorAccessor, InteractionCallback, ViewportCallback, ViewportProps},
    translator::{GestureTranslator, InteractionState},
    viewport::ViewportState,
};

/// Why a viewport changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum ChangeCause {
    /// A gesture or its momentum. Controlled callers feed these back through
    /// [`MapController::set_props`].
    Interaction,
    /// A frame of a running animation. Only for display, feeding it back would restart the
    /// animation.
    Animation,
}

/// Sent after every committed viewport change.
#[derive(Debug, Clone, Copy, PartialEq, Event)]
pub struct ViewportChanged {
    /// The entity holding the [`MapController`].
    pub controller: Entity,
    /// The new viewport.
    pub viewport: ViewportState,
    /// What caused the change.
    pub cause: ChangeCause,
}

/// Sent when a controller starts or stops dragging. Not sent for other interaction changes.
#[derive(Debug, Clone, Copy, PartialEq, Event)]
pub struct InteractionStateChanged {
    /// The entity holding the [`MapController`].
    pub controller: Entity,
    /// The interaction state after the change.
    pub state: InteractionState,
}

/// Sent when a viewport animation runs to completion. Not sent for preempted animations.
#[derive(Debug, Clone, Copy, PartialEq, Event)]
pub struct AnimationFinished {
    /// The entity holding the [`MapController`].
    pub controller: Entity,
}

/// The viewport a rendering collaborator should draw. Written to every entity subscribed with
/// [`MapController::subscribe`], including each interpolated frame of an animation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deref, DerefMut, Component, Reflect)]
pub struct LiveViewport(pub ViewportState);

/// What happened while handling a single gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureOutcome {
    /// The committed viewport, if the gesture moved the camera.
    pub committed: Option<ViewportState>,
    /// The new interaction state, only if dragging started or stopped.
    pub interaction_changed: Option<InteractionState>,
}

/// What happened during one frame of [`MapController::update`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerUpdate {
    /// Viewports committed by pan momentum.
    pub committed: Vec<ViewportState>,
    /// Interpolated animation frames, in tick order.
    pub frames: Vec<ViewportState>,
    /// Did the running animation finish?
    pub finished: bool,
}

/// Owns the canonical viewport of one map, and composes the gesture translator and the viewport
/// animator around it.
///
/// # Moving the map
///
/// The [`MapControllerPlugin`](super::MapControllerPlugin) routes window input to controllers
/// through the [`InputNormalizer`](super::inputs::InputNormalizer), once a surface is attached
/// with [`MapInputWorldExt::attach_map_input`](super::inputs::MapInputWorldExt). To drive a
/// controller manually:
///
/// 1. Feed gestures with [`MapController::handle_gesture`]. Each one may commit a viewport.
/// 2. Supply external viewport updates with [`MapController::set_props`]. Pitch and bearing
///    changes are animated when [`ViewportProps::animate_viewport`] is set.
/// 3. Call [`MapController::update`] once per frame to advance momentum and animation.
///
/// The canonical viewport always satisfies the limits. While animating, the viewport shown to
/// subscribers is the interpolated one, see [`MapController::displayed_viewport`].
#[derive(Component)]
pub struct MapController {
    viewport: ViewportState,
    /// The viewport from the last external update. An animation that preempts another starts
    /// here under [`PreemptionStart::PreviousProps`].
    props_viewport: ViewportState,
    translator: GestureTranslator,
    animator: ViewportAnimator,
    animate_viewport: bool,
    notified_dragging: bool,
    on_viewport_change: Option<ViewportCallback>,
    on_interaction_state_change: Option<InteractionCallback>,
    get_cursor: Option<CursorAccessor>,
    subscribers: Vec<Entity>,
    disposed: bool,
}

impl MapController {
    /// Create a controller from its initial props. The initial viewport is clamped to the
    /// limits.
    pub fn new(props: ViewportProps) -> Result<Self, ConfigurationError> {
        props.validate()?;
        let viewport = props.viewport.clamped(&props.limits);
        Ok(Self {
            viewport,
            props_viewport: viewport,
            translator: GestureTranslator::new(
                props.limits,
                props.gestures,
                props.sensitivity,
                props.momentum,
            ),
            animator: ViewportAnimator::new(props.animation),
            animate_viewport: props.animate_viewport,
            notified_dragging: false,
            on_viewport_change: props.on_viewport_change,
            on_interaction_state_change: props.on_interaction_state_change,
            get_cursor: props.get_cursor,
            subscribers: Vec::new(),
            disposed: false,
        })
    }

    /// The canonical viewport. While animating this is already the end state.
    pub fn current_viewport(&self) -> ViewportState {
        self.viewport
    }

    /// The viewport that should be on screen: the interpolated viewport while animating, the
    /// canonical one otherwise.
    pub fn displayed_viewport(&self) -> ViewportState {
        self.animator
            .live_viewport()
            .copied()
            .unwrap_or(self.viewport)
    }

    /// Is a viewport animation running?
    pub fn is_animating(&self) -> bool {
        self.animator.is_animating()
    }

    /// Is the map still moving from a released pan?
    pub fn is_coasting(&self) -> bool {
        self.translator.is_coasting()
    }

    /// The current interaction state.
    pub fn interaction(&self) -> InteractionState {
        self.translator.interaction()
    }

    /// The zoom and pitch bounds.
    pub fn limits(&self) -> &ViewportLimits {
        self.translator.limits()
    }

    /// The animator, for inspecting animation progress.
    pub fn animator(&self) -> &ViewportAnimator {
        &self.animator
    }

    /// The cursor to show over the map.
    pub fn cursor(&self) -> SystemCursorIcon {
        let state = self.interaction();
        match &self.get_cursor {
            Some(get_cursor) => get_cursor(&state),
            None => default_cursor(&state),
        }
    }

    /// Has [`MapController::dispose`] been called?
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Interpret a gesture and commit the resulting viewport.
    ///
    /// A committed gesture stops any running animation. Callbacks run after the new state is
    /// committed.
    pub fn handle_gesture(&mut self, gesture: &GestureEvent) -> GestureOutcome {
        if self.disposed {
            debug!("Ignoring gesture sent to a disposed map controller");
            return GestureOutcome::default();
        }
        let output = self.translator.handle(gesture, &self.viewport);

        let committed = output.next_viewport.inspect(|next| {
            if self.animator.cancel() {
                debug!("Interaction interrupted viewport animation");
            }
            self.viewport = *next;
        });
        let interaction_changed = self.track_dragging(output.interaction);

        if let (Some(viewport), Some(callback)) = (&committed, &self.on_viewport_change) {
            callback(viewport);
        }
        if let (Some(state), Some(callback)) =
            (&interaction_changed, &self.on_interaction_state_change)
        {
            callback(state);
        }

        GestureOutcome {
            committed,
            interaction_changed,
        }
    }

    /// Apply an external update, as in a controlled component: the owner accepted a change (or
    /// made its own) and supplies the full props again.
    ///
    /// Returns `true` if the update started an animation.
    pub fn set_props(&mut self, props: ViewportProps) -> Result<bool, ConfigurationError> {
        props.validate()?;
        if self.disposed {
            debug!("Ignoring props sent to a disposed map controller");
            return Ok(false);
        }

        self.translator.set_limits(props.limits);
        self.translator.set_enabled(props.gestures);
        self.translator.set_sensitivity(props.sensitivity);
        self.translator.set_momentum(props.momentum);
        self.animator.set_settings(props.animation);
        self.animate_viewport = props.animate_viewport;
        self.on_viewport_change = props.on_viewport_change;
        self.on_interaction_state_change = props.on_interaction_state_change;
        self.get_cursor = props.get_cursor;

        let next = props.viewport.clamped(&props.limits);
        let started = self.evaluate_animation(next);
        self.viewport = next;
        self.props_viewport = next;
        Ok(started)
    }

    fn evaluate_animation(&mut self, next: ViewportState) -> bool {
        let displayed = self.displayed_viewport();
        let Some(end) = self.animator.end_viewport().copied() else {
            return self.animate_viewport
                && animatable_fields_differ(&displayed, &next)
                && self.animator.start(displayed, next);
        };

        if !self.animate_viewport {
            self.animator.cancel();
            return false;
        }
        if !animatable_fields_differ(&end, &next) {
            // Same destination, only non-animated fields changed.
            self.animator.retarget(next);
            return false;
        }
        let start = match self.animator.settings().preemption {
            PreemptionStart::PreviousProps => self.props_viewport,
            PreemptionStart::LiveViewport => displayed,
        };
        if self.animator.start(start, next) {
            true
        } else {
            // The previous props already match: nothing left to animate.
            self.animator.cancel();
            false
        }
    }

    /// Move to `viewport`, animating pitch and bearing from the displayed viewport whether or not
    /// [`ViewportProps::animate_viewport`] is set. Other fields jump immediately.
    ///
    /// Returns `true` if an animation started. Without one, the jump is reported to
    /// `on_viewport_change` right away. A gesture in progress keeps going and interrupts the
    /// animation with its next commit.
    pub fn animate_to(&mut self, viewport: ViewportState) -> Result<bool, ConfigurationError> {
        viewport.validate()?;
        if self.disposed {
            debug!("Ignoring animation requested on a disposed map controller");
            return Ok(false);
        }
        let next = viewport.clamped(self.translator.limits());
        let started = self.animator.start(self.displayed_viewport(), next);
        if !started {
            self.animator.cancel();
        }
        self.viewport = next;
        self.props_viewport = next;
        if let (false, Some(callback)) = (started, &self.on_viewport_change) {
            callback(&next);
        }
        Ok(started)
    }

    /// Advance pan momentum and the animation timer by `delta_time`.
    pub fn update(&mut self, delta_time: Duration) -> ControllerUpdate {
        let mut update = ControllerUpdate::default();
        if self.disposed {
            return update;
        }

        if let Some(next) = self.translator.advance_inertia(delta_time, &self.viewport) {
            self.viewport = next;
            // Frames take their position from the destination.
            self.animator.retarget(next);
            update.committed.push(next);
        }

        for step in self.animator.tick(delta_time) {
            match step {
                AnimationStep::Frame(frame) => update.frames.push(frame),
                AnimationStep::Finished => update.finished = true,
            }
        }

        if let Some(callback) = &self.on_viewport_change {
            update
                .committed
                .iter()
                .chain(update.frames.iter())
                .for_each(|viewport| callback(viewport));
        }
        update
    }

    /// Abort the gesture in progress, for example because its input surface went away.
    ///
    /// Returns the new interaction state if this ended a drag.
    pub fn cancel_interaction(&mut self) -> Option<InteractionState> {
        self.translator.cancel();
        let changed = self.track_dragging(self.translator.interaction());
        if let (Some(state), Some(callback)) = (&changed, &self.on_interaction_state_change) {
            callback(state);
        }
        changed
    }

    /// Stop everything this controller is running. Later gestures, updates, and props are
    /// ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.animator.cancel();
        self.translator.cancel();
        self.notified_dragging = false;
        self.subscribers.clear();
        self.disposed = true;
    }

    /// Register an entity to receive the displayed viewport in its [`LiveViewport`] component.
    pub fn subscribe(&mut self, entity: Entity) {
        if !self.subscribers.contains(&entity) {
            self.subscribers.push(entity);
        }
    }

    /// Stop sending the displayed viewport to `entity`.
    pub fn unsubscribe(&mut self, entity: Entity) {
        self.subscribers.retain(|subscriber| *subscriber != entity);
    }

    /// Entities receiving the displayed viewport.
    pub fn subscribers(&self) -> &[Entity] {
        &self.subscribers
    }

    /// Edge detection on `is_dragging`.
    fn track_dragging(&mut self, state: InteractionState) -> Option<InteractionState> {
        (state.is_dragging != self.notified_dragging).then(|| {
            self.notified_dragging = state.is_dragging;
            state
        })
    }

    /// Route [`MapGesture`]s to their controllers, in arrival order.
    pub fn apply_gestures(
        mut gestures: EventReader<MapGesture>,
        mut controllers: Query<&mut MapController>,
        mut changed: EventWriter<ViewportChanged>,
        mut interaction: EventWriter<InteractionStateChanged>,
        mut redraw: EventWriter<RequestRedraw>,
    ) {
        for MapGesture {
            controller: entity,
            gesture,
        } in gestures.read()
        {
            let Ok(mut controller) = controllers.get_mut(*entity) else {
                warn_once!("Gesture sent to {entity}, which has no MapController");
                continue;
            };
            let outcome = controller.handle_gesture(gesture);
            if let Some(viewport) = outcome.committed {
                changed.send(ViewportChanged {
                    controller: *entity,
                    viewport,
                    cause: ChangeCause::Interaction,
                });
                redraw.send(RequestRedraw);
            }
            if let Some(state) = outcome.interaction_changed {
                interaction.send(InteractionStateChanged {
                    controller: *entity,
                    state,
                });
            }
        }
    }

    /// Advance momentum and animations of all controllers. Called once per frame.
    pub fn update_controllers(
        mut controllers: Query<(Entity, &mut MapController)>,
        mut changed: EventWriter<ViewportChanged>,
        mut finished: EventWriter<AnimationFinished>,
        mut redraw: EventWriter<RequestRedraw>,
        time: Res<Time>,
    ) {
        for (entity, mut controller) in &mut controllers {
            if !controller.is_animating() && !controller.is_coasting() {
                continue;
            }
            let update = controller.update(time.delta());
            let committed = update.committed.into_iter().map(|viewport| ViewportChanged {
                controller: entity,
                viewport,
                cause: ChangeCause::Interaction,
            });
            let frames = update.frames.into_iter().map(|viewport| ViewportChanged {
                controller: entity,
                viewport,
                cause: ChangeCause::Animation,
            });
            changed.send_batch(committed.chain(frames));
            if update.finished {
                finished.send(AnimationFinished { controller: entity });
            }
            redraw.send(RequestRedraw);
        }
    }

    /// Write the displayed viewport of every controller into its subscribers.
    pub fn propagate_live_viewport(
        controllers: Query<&MapController>,
        mut subscribers: Query<&mut LiveViewport>,
        mut commands: Commands,
    ) {
        for controller in &controllers {
            let displayed = LiveViewport(controller.displayed_viewport());
            for &subscriber in controller.subscribers() {
                match subscribers.get_mut(subscriber) {
                    Ok(mut live) => {
                        live.set_if_neq(displayed);
                    }
                    Err(_) => {
                        if let Some(mut entity) = commands.get_entity(subscriber) {
                            entity.insert(displayed);
                        }
                    }
                }
            }
        }
    }

    /// Tear down a controller whose component is being removed, so no timer or gesture outlives
    /// it.
    pub(crate) fn on_remove(
        trigger: Trigger<OnRemove, MapController>,
        mut controllers: Query<&mut MapController>,
        normalizer: Option<ResMut<InputNormalizer>>,
    ) {
        let entity = trigger.entity();
        if let Ok(mut controller) = controllers.get_mut(entity) {
            controller.dispose();
        }
        if let Some(mut normalizer) = normalizer {
            normalizer.detach_controller(entity);
        }
        debug!("Disposed map controller {entity}");
    }
}

impl std::fmt::Debug for MapController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapController")
            .field("viewport", &self.viewport)
            .field("props_viewport", &self.props_viewport)
            .field("translator", &self.translator)
            .field("animator", &self.animator)
            .field("animate_viewport", &self.animate_viewport)
            .field("subscribers", &self.subscribers)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}
