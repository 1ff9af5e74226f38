//! Turns a stream of [`GestureEvent`]s into proposed viewports.
//!
//! The translator never mutates the canonical viewport. It receives the current viewport with
//! every event and returns a clamped proposal that the
//! [`MapController`](super::component::MapController) may commit.

use std::time::Duration;

use bevy_math::{prelude::*, DVec2};
use bevy_reflect::prelude::*;

use super::{
    gestures::{GestureEvent, GestureKind, KeyCommand, Modifiers, PointerButton},
    limits::ViewportLimits,
    momentum::{Inertia, Momentum, VelocityTracker},
    viewport::{wrap_bearing, ViewportState},
};

/// Zoom levels per pixel of wheel input. One wheel notch (120 px) is half a zoom level.
pub const WHEEL_ZOOM_RATE: f64 = 1.0 / 240.0;

/// Screen pixels panned by one arrow key press.
const KEY_PAN_PIXELS: f64 = 100.0;
/// Degrees of bearing changed by one rotate key press.
const KEY_BEARING_DEGREES: f64 = 15.0;
/// Degrees of pitch changed by one pitch key press.
const KEY_PITCH_DEGREES: f64 = 10.0;

/// Which kind of camera motion the user is performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum ActiveGesture {
    #[default]
    None,
    Pan,
    Rotate,
    Zoom,
    Pitch,
}

/// Interaction state reported to observers. Reset when a gesture ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub struct InteractionState {
    /// Is a pointer or pinch currently held down?
    pub is_dragging: bool,
    /// The motion being performed.
    pub active_gesture: ActiveGesture,
}

/// Controls which gestures are honored. Disabled gestures leave the viewport untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EnabledGestures {
    /// Scroll to zoom.
    pub scroll_zoom: bool,
    /// Drag to pan.
    pub drag_pan: bool,
    /// Right-drag, or drag with a modifier, to rotate and pitch.
    pub drag_rotate: bool,
    /// Double click or double tap to zoom in, with shift to zoom out.
    pub double_click_zoom: bool,
    /// Pinch to zoom and rotate.
    pub touch_zoom_rotate: bool,
    /// Arrow keys, `+` and `-`.
    pub keyboard: bool,
}

impl Default for EnabledGestures {
    fn default() -> Self {
        Self {
            scroll_zoom: true,
            drag_pan: true,
            drag_rotate: true,
            double_click_zoom: true,
            touch_zoom_rotate: true,
            keyboard: true,
        }
    }
}

/// The sensitivity of the translator to inputs.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Sensitivity {
    /// Multiplier on pan distance.
    pub pan: f32,
    /// Multiplier on drag and pinch rotation.
    pub rotate: f32,
    /// Multiplier on wheel and pinch zoom.
    pub zoom: f32,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self {
            pan: 1.0,
            rotate: 1.0,
            zoom: 1.0,
        }
    }
}

/// Result of handling one gesture event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslatorOutput {
    /// The proposed viewport, if the event changes the camera. Always inside the limits.
    pub next_viewport: Option<ViewportState>,
    /// Interaction state after the event.
    pub interaction: InteractionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Pan,
    Rotate,
}

impl DragMode {
    fn for_input(button: PointerButton, modifiers: Modifiers) -> Self {
        if button == PointerButton::Secondary || modifiers.any() {
            DragMode::Rotate
        } else {
            DragMode::Pan
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DragSession {
    button: PointerButton,
    mode: DragMode,
    start_position: Vec2,
    /// The world point grabbed at `start_position`.
    start_world: DVec2,
    start_viewport: ViewportState,
    last_position: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct PinchSession {
    start_centroid: Vec2,
    start_viewport: ViewportState,
}

#[derive(Debug, Clone, Copy, Default)]
enum Session {
    #[default]
    Idle,
    Drag(DragSession),
    Pinch(PinchSession),
}

/// Stateful interpreter of one controller's gesture stream.
#[derive(Debug, Clone, Default)]
pub struct GestureTranslator {
    limits: ViewportLimits,
    enabled: EnabledGestures,
    sensitivity: Sensitivity,
    momentum: Momentum,
    session: Session,
    interaction: InteractionState,
    velocity: VelocityTracker,
    inertia: Option<Inertia>,
}

impl GestureTranslator {
    /// Create a translator with the given settings.
    pub fn new(
        limits: ViewportLimits,
        enabled: EnabledGestures,
        sensitivity: Sensitivity,
        momentum: Momentum,
    ) -> Self {
        Self {
            limits,
            enabled,
            sensitivity,
            momentum,
            ..Default::default()
        }
    }

    /// Update the clamping bounds used for all later proposals.
    pub fn set_limits(&mut self, limits: ViewportLimits) {
        self.limits = limits;
    }

    /// The clamping bounds.
    pub fn limits(&self) -> &ViewportLimits {
        &self.limits
    }

    /// Update which gestures are honored.
    pub fn set_enabled(&mut self, enabled: EnabledGestures) {
        self.enabled = enabled;
    }

    /// Which gestures are honored.
    pub fn enabled(&self) -> &EnabledGestures {
        &self.enabled
    }

    /// Update input sensitivity.
    pub fn set_sensitivity(&mut self, sensitivity: Sensitivity) {
        self.sensitivity = sensitivity;
    }

    /// Update momentum settings.
    pub fn set_momentum(&mut self, momentum: Momentum) {
        self.momentum = momentum;
    }

    /// Current interaction state.
    pub fn interaction(&self) -> InteractionState {
        self.interaction
    }

    /// Is the map still moving from a released pan?
    pub fn is_coasting(&self) -> bool {
        self.inertia.is_some()
    }

    /// Drop any gesture session and momentum.
    pub fn cancel(&mut self) {
        self.session = Session::Idle;
        self.interaction = InteractionState::default();
        self.velocity.clear();
        self.inertia = None;
    }

    /// Interpret one gesture against the current viewport.
    pub fn handle(&mut self, event: &GestureEvent, viewport: &ViewportState) -> TranslatorOutput {
        let (next, transient) = match event.kind {
            GestureKind::PointerDown { button } => {
                self.begin_drag(button, event, viewport);
                (None, None)
            }
            GestureKind::PointerMove => (self.drag(event, viewport), None),
            GestureKind::PointerUp => {
                self.end_drag(event);
                (None, None)
            }
            GestureKind::Wheel => (self.wheel(event, viewport), Some(ActiveGesture::Zoom)),
            GestureKind::PinchStart => {
                self.begin_pinch(event, viewport);
                (None, None)
            }
            GestureKind::PinchMove { scale, rotation } => (self.pinch(event, scale, rotation), None),
            GestureKind::PinchEnd => {
                if matches!(self.session, Session::Pinch(_)) {
                    self.session = Session::Idle;
                    self.interaction = InteractionState::default();
                }
                (None, None)
            }
            GestureKind::DoubleClick => (
                self.double_click(event, viewport),
                Some(ActiveGesture::Zoom),
            ),
            GestureKind::Key(command) => self.key(command, viewport),
        };

        let interaction = match transient {
            Some(active_gesture) if next.is_some() && !self.interaction.is_dragging => {
                InteractionState {
                    is_dragging: false,
                    active_gesture,
                }
            }
            _ => self.interaction,
        };

        TranslatorOutput {
            next_viewport: next.map(|viewport| viewport.clamped(&self.limits)),
            interaction,
        }
    }

    /// Advance pan momentum by `delta_time`, proposing the next viewport while the map is still
    /// moving.
    pub fn advance_inertia(
        &mut self,
        delta_time: Duration,
        viewport: &ViewportState,
    ) -> Option<ViewportState> {
        let inertia = self.inertia.as_mut()?;
        match inertia.advance(&self.momentum, delta_time) {
            Some(pan) => Some(viewport.panned_by(pan).clamped(&self.limits)),
            None => {
                self.inertia = None;
                None
            }
        }
    }

    fn begin_drag(&mut self, button: PointerButton, event: &GestureEvent, viewport: &ViewportState) {
        self.inertia = None;
        if !(self.enabled.drag_pan || self.enabled.drag_rotate) {
            return;
        }
        let mode = DragMode::for_input(button, event.modifiers);
        self.session = Session::Drag(DragSession {
            button,
            mode,
            start_position: event.position,
            start_world: viewport.screen_to_world(event.position.as_dvec2()),
            start_viewport: *viewport,
            last_position: event.position,
        });
        self.velocity.clear();
        self.velocity.record(event.timestamp, event.position);
        self.interaction = InteractionState {
            is_dragging: true,
            active_gesture: match mode {
                DragMode::Pan => ActiveGesture::Pan,
                DragMode::Rotate => ActiveGesture::Rotate,
            },
        };
    }

    fn drag(&mut self, event: &GestureEvent, viewport: &ViewportState) -> Option<ViewportState> {
        let Session::Drag(ref mut session) = self.session else {
            return None;
        };

        let mode = DragMode::for_input(session.button, event.modifiers);
        if mode != session.mode {
            // Restart from where the previous mode left the camera.
            session.mode = mode;
            session.start_position = session.last_position;
            session.start_world = viewport.screen_to_world(session.last_position.as_dvec2());
            session.start_viewport = *viewport;
        }
        session.last_position = event.position;
        self.velocity.record(event.timestamp, event.position);

        let delta = (event.position - session.start_position).as_dvec2();
        let session = *session;
        // Moves build on the current viewport so zoom, bearing, and external changes made
        // during the drag are kept.
        match mode {
            DragMode::Pan => {
                if !self.enabled.drag_pan {
                    return None;
                }
                self.interaction.active_gesture = ActiveGesture::Pan;
                let target = session.start_position.as_dvec2() + delta * self.sensitivity.pan as f64;
                Some(viewport.with_world_at_screen(session.start_world, target))
            }
            DragMode::Rotate => {
                if !self.enabled.drag_rotate {
                    return None;
                }
                self.interaction.active_gesture = if delta.y.abs() > delta.x.abs() {
                    ActiveGesture::Pitch
                } else {
                    ActiveGesture::Rotate
                };
                let rotated = self.rotated(&session.start_viewport, delta);
                Some(ViewportState {
                    bearing: rotated.bearing,
                    pitch: rotated.pitch,
                    ..*viewport
                })
            }
        }
    }

    /// Bearing follows horizontal motion, half a turn per viewport width. Pitch moves towards
    /// its upper limit when dragging up and towards its lower limit when dragging down.
    fn rotated(&self, start: &ViewportState, delta: DVec2) -> ViewportState {
        let sensitivity = self.sensitivity.rotate as f64;
        let bearing = start.bearing + 180.0 * delta.x / start.width * sensitivity;
        let delta_scale_y = (-delta.y / start.height * sensitivity).clamp(-1.0, 1.0);
        let start_pitch = self.limits.clamp_pitch(start.pitch);
        let pitch = if delta_scale_y > 0.0 {
            start_pitch + delta_scale_y * (self.limits.max_pitch - start_pitch)
        } else {
            start_pitch + delta_scale_y * (start_pitch - self.limits.min_pitch)
        };
        ViewportState {
            bearing: wrap_bearing(bearing),
            pitch: self.limits.clamp_pitch(pitch),
            ..*start
        }
    }

    fn end_drag(&mut self, event: &GestureEvent) {
        let Session::Drag(session) = self.session else {
            return;
        };
        self.velocity.record(event.timestamp, event.position);
        if session.mode == DragMode::Pan && self.enabled.drag_pan {
            let velocity = self.velocity.velocity_at(event.timestamp) * self.sensitivity.pan;
            self.inertia = Inertia::from_release(&self.momentum, velocity);
        }
        self.velocity.clear();
        self.session = Session::Idle;
        self.interaction = InteractionState::default();
    }

    fn wheel(&mut self, event: &GestureEvent, viewport: &ViewportState) -> Option<ViewportState> {
        if !self.enabled.scroll_zoom {
            return None;
        }
        self.inertia = None;
        let change = event.delta.y as f64 * WHEEL_ZOOM_RATE * self.sensitivity.zoom as f64;
        self.zoom_to(viewport, viewport.zoom + change, event.position)
    }

    fn double_click(
        &mut self,
        event: &GestureEvent,
        viewport: &ViewportState,
    ) -> Option<ViewportState> {
        if !self.enabled.double_click_zoom {
            return None;
        }
        self.inertia = None;
        let change = if event.modifiers.shift { -1.0 } else { 1.0 };
        self.zoom_to(viewport, viewport.zoom + change, event.position)
    }

    /// Zoom around `anchor`, or `None` when the clamped zoom would not change.
    fn zoom_to(
        &self,
        viewport: &ViewportState,
        zoom: f64,
        anchor: Vec2,
    ) -> Option<ViewportState> {
        let zoom = self.limits.clamp_zoom(zoom);
        (zoom != viewport.zoom).then(|| viewport.zoomed_around(zoom, anchor.as_dvec2()))
    }

    fn begin_pinch(&mut self, event: &GestureEvent, viewport: &ViewportState) {
        self.inertia = None;
        self.velocity.clear();
        if !self.enabled.touch_zoom_rotate {
            self.session = Session::Idle;
            self.interaction = InteractionState::default();
            return;
        }
        self.session = Session::Pinch(PinchSession {
            start_centroid: event.position,
            start_viewport: *viewport,
        });
        self.interaction = InteractionState {
            is_dragging: true,
            active_gesture: ActiveGesture::Zoom,
        };
    }

    /// Zoom by `log2(scale)` and turn the bearing by the counter-clockwise `rotation`, keeping
    /// the start centroid under the fingers.
    fn pinch(&mut self, event: &GestureEvent, scale: f32, rotation: f32) -> Option<ViewportState> {
        let Session::Pinch(session) = self.session else {
            return None;
        };
        if !scale.is_finite() || scale <= 0.0 || !rotation.is_finite() {
            return None;
        }
        let start = session.start_viewport;
        let zoom = self.limits.clamp_zoom(
            start.zoom + (scale as f64).log2() * self.sensitivity.zoom as f64,
        );
        let bearing = wrap_bearing(start.bearing + rotation as f64 * self.sensitivity.rotate as f64);
        let anchor_world = start.screen_to_world(session.start_centroid.as_dvec2());
        Some(
            ViewportState {
                zoom,
                bearing,
                ..start
            }
            .with_world_at_screen(anchor_world, event.position.as_dvec2()),
        )
    }

    fn key(
        &mut self,
        command: KeyCommand,
        viewport: &ViewportState,
    ) -> (Option<ViewportState>, Option<ActiveGesture>) {
        if !self.enabled.keyboard {
            return (None, None);
        }
        self.inertia = None;
        let center = viewport.size() / 2.0;
        let pan = |x: f64, y: f64| Some(viewport.panned_by(DVec2::new(x, y)));
        let rotate = |bearing: f64| {
            Some(ViewportState {
                bearing: wrap_bearing(viewport.bearing + bearing),
                ..*viewport
            })
        };
        let pitch = |pitch: f64| {
            let pitch = self.limits.clamp_pitch(viewport.pitch + pitch);
            (pitch != viewport.pitch).then_some(ViewportState { pitch, ..*viewport })
        };
        match command {
            KeyCommand::PanLeft => (pan(KEY_PAN_PIXELS, 0.0), Some(ActiveGesture::Pan)),
            KeyCommand::PanRight => (pan(-KEY_PAN_PIXELS, 0.0), Some(ActiveGesture::Pan)),
            KeyCommand::PanUp => (pan(0.0, KEY_PAN_PIXELS), Some(ActiveGesture::Pan)),
            KeyCommand::PanDown => (pan(0.0, -KEY_PAN_PIXELS), Some(ActiveGesture::Pan)),
            KeyCommand::ZoomIn => (
                self.zoom_to(viewport, viewport.zoom + 1.0, center.as_vec2()),
                Some(ActiveGesture::Zoom),
            ),
            KeyCommand::ZoomOut => (
                self.zoom_to(viewport, viewport.zoom - 1.0, center.as_vec2()),
                Some(ActiveGesture::Zoom),
            ),
            KeyCommand::RotateLeft => (rotate(-KEY_BEARING_DEGREES), Some(ActiveGesture::Rotate)),
            KeyCommand::RotateRight => (rotate(KEY_BEARING_DEGREES), Some(ActiveGesture::Rotate)),
            KeyCommand::PitchUp => (pitch(KEY_PITCH_DEGREES), Some(ActiveGesture::Pitch)),
            KeyCommand::PitchDown => (pitch(-KEY_PITCH_DEGREES), Some(ActiveGesture::Pitch)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn viewport(zoom: f64) -> ViewportState {
        ViewportState::new(800.0, 600.0, -122.4, 37.8, zoom)
    }

    fn translator() -> GestureTranslator {
        GestureTranslator::new(
            ViewportLimits::default(),
            EnabledGestures::default(),
            Sensitivity::default(),
            Momentum::disabled(),
        )
    }

    fn drag(translator: &mut GestureTranslator, start: &ViewportState, to: Vec2) -> ViewportState {
        let down = translator.handle(&GestureEvent::pointer_down(Vec2::new(100.0, 100.0)), start);
        assert_eq!(down.next_viewport, None);
        assert!(down.interaction.is_dragging);
        translator
            .handle(&GestureEvent::pointer_move(to), start)
            .next_viewport
            .unwrap()
    }

    #[test]
    fn pointer_down_starts_drag_without_moving() {
        let mut translator = translator();
        let output = translator.handle(&GestureEvent::pointer_down(Vec2::ZERO), &viewport(3.0));
        assert_eq!(output.next_viewport, None);
        assert_eq!(
            output.interaction,
            InteractionState {
                is_dragging: true,
                active_gesture: ActiveGesture::Pan
            }
        );
    }

    #[test]
    fn move_without_drag_is_ignored() {
        let mut translator = translator();
        let output = translator.handle(&GestureEvent::pointer_move(Vec2::ONE), &viewport(3.0));
        assert_eq!(output.next_viewport, None);
        assert!(!output.interaction.is_dragging);
    }

    #[test]
    fn panning_is_scale_dependent() {
        let to = Vec2::new(150.0, 100.0);
        let near = viewport(10.0);
        let far = viewport(5.0);
        let near_delta = (drag(&mut translator(), &near, to).longitude - near.longitude).abs();
        let far_delta = (drag(&mut translator(), &far, to).longitude - far.longitude).abs();
        assert!(near_delta > 0.0);
        assert!(near_delta < far_delta);
        // 5 zoom levels apart is a factor of 32.
        assert!((far_delta / near_delta - 32.0).abs() < 1e-6);
    }

    #[test]
    fn double_click_zoom_survives_drag_jitter() {
        let mut translator = translator();
        let start = viewport(10.0);
        let click = Vec2::new(400.0, 300.0);
        translator.handle(&GestureEvent::pointer_down(click), &start);
        let zoomed = translator
            .handle(&GestureEvent::new(GestureKind::DoubleClick, click), &start)
            .next_viewport
            .unwrap();
        assert_eq!(zoomed.zoom, 11.0);

        let moved = translator
            .handle(&GestureEvent::pointer_move(click + Vec2::X), &zoomed)
            .next_viewport
            .unwrap();
        assert_eq!(moved.zoom, 11.0);
        assert!(moved.longitude < zoomed.longitude);
        let grabbed = start.screen_to_world(click.as_dvec2());
        let under_cursor = moved.screen_to_world((click + Vec2::X).as_dvec2());
        assert!(grabbed.distance(under_cursor) < 1e-9);
    }

    #[test]
    fn wheel_zoom_during_drag_is_kept() {
        let mut translator = translator();
        let start = viewport(6.0);
        translator.handle(&GestureEvent::pointer_down(Vec2::new(100.0, 100.0)), &start);
        let panned = translator
            .handle(&GestureEvent::pointer_move(Vec2::new(150.0, 100.0)), &start)
            .next_viewport
            .unwrap();
        let zoomed = translator
            .handle(&GestureEvent::wheel(Vec2::new(150.0, 100.0), 240.0), &panned)
            .next_viewport
            .unwrap();
        assert!((zoomed.zoom - 7.0).abs() < 1e-9);
        assert!(translator.interaction().is_dragging);

        let moved = translator
            .handle(&GestureEvent::pointer_move(Vec2::new(160.0, 100.0)), &zoomed)
            .next_viewport
            .unwrap();
        assert!((moved.zoom - 7.0).abs() < 1e-9);
        // 10 pixels at zoom 7.
        let expected = zoomed.panned_by(DVec2::new(10.0, 0.0));
        assert!((moved.longitude - expected.longitude).abs() < 1e-9);
    }

    #[test]
    fn rotate_drag_keeps_the_current_center_and_zoom() {
        let mut translator = translator();
        let start = viewport(3.0);
        let shift = |event: GestureEvent| event.with_modifiers(Modifiers::SHIFT);
        translator.handle(&shift(GestureEvent::pointer_down(Vec2::new(400.0, 300.0))), &start);
        let elsewhere = ViewportState::new(800.0, 600.0, 2.0, 48.0, 4.0);
        let rotated = translator
            .handle(&shift(GestureEvent::pointer_move(Vec2::new(600.0, 300.0))), &elsewhere)
            .next_viewport
            .unwrap();
        assert_eq!(rotated.longitude, 2.0);
        assert_eq!(rotated.latitude, 48.0);
        assert_eq!(rotated.zoom, 4.0);
        assert!((rotated.bearing - 45.0).abs() < 1e-9);
    }

    #[test]
    fn pointer_up_ends_drag() {
        let mut translator = translator();
        let start = viewport(3.0);
        drag(&mut translator, &start, Vec2::new(120.0, 100.0));
        let up = translator.handle(&GestureEvent::pointer_up(Vec2::new(120.0, 100.0)), &start);
        assert_eq!(up.next_viewport, None);
        assert_eq!(up.interaction, InteractionState::default());
    }

    #[test]
    fn modifier_drag_rotates_and_pitches_within_limits() {
        let mut translator = translator();
        let start = viewport(3.0);
        translator.handle(
            &GestureEvent::pointer_down(Vec2::new(400.0, 300.0)).with_modifiers(Modifiers::SHIFT),
            &start,
        );
        let rotated = translator
            .handle(
                &GestureEvent::pointer_move(Vec2::new(600.0, -2000.0))
                    .with_modifiers(Modifiers::SHIFT),
                &start,
            )
            .next_viewport
            .unwrap();
        assert_eq!(rotated.longitude, start.longitude);
        assert_eq!(rotated.latitude, start.latitude);
        assert!((rotated.bearing - 45.0).abs() < 1e-9);
        assert_eq!(rotated.pitch, 60.0);
    }

    #[test]
    fn secondary_button_drag_rotates() {
        let mut translator = translator();
        let start = viewport(3.0);
        let down = GestureEvent::new(
            GestureKind::PointerDown {
                button: PointerButton::Secondary,
            },
            Vec2::ZERO,
        );
        assert_eq!(
            translator.handle(&down, &start).interaction.active_gesture,
            ActiveGesture::Rotate
        );
        let moved = translator
            .handle(&GestureEvent::pointer_move(Vec2::new(0.0, -300.0)), &start)
            .next_viewport
            .unwrap();
        assert!(moved.pitch > start.pitch);
        assert_eq!(moved.bearing, 0.0);
    }

    #[test]
    fn wheel_zoom_clamps_at_max() {
        let mut translator = translator();
        let start = viewport(19.5);
        let output = translator.handle(&GestureEvent::wheel(Vec2::new(400.0, 300.0), 1000.0), &start);
        assert_eq!(output.next_viewport.unwrap().zoom, 20.0);
        assert_eq!(output.interaction.active_gesture, ActiveGesture::Zoom);
        assert!(!output.interaction.is_dragging);

        // Already at the limit, nothing left to commit.
        let at_max = viewport(20.0);
        let output = translator.handle(&GestureEvent::wheel(Vec2::new(400.0, 300.0), 1000.0), &at_max);
        assert_eq!(output.next_viewport, None);
    }

    #[test]
    fn random_zoom_gestures_stay_in_limits() {
        let mut translator = translator();
        let mut rng = rand::thread_rng();
        let mut current = viewport(10.0);
        for _ in 0..500 {
            let amount = rng.gen_range(-5000.0..5000.0);
            let position = Vec2::new(rng.gen_range(0.0..800.0), rng.gen_range(0.0..600.0));
            let event = if rng.gen_bool(0.5) {
                GestureEvent::wheel(position, amount)
            } else {
                GestureEvent::new(GestureKind::DoubleClick, position)
            };
            if let Some(next) = translator.handle(&event, &current).next_viewport {
                assert!(next.zoom >= 0.0 && next.zoom <= 20.0, "zoom {}", next.zoom);
                current = next;
            }
        }
    }

    #[test]
    fn wheel_zoom_keeps_cursor_anchor() {
        let mut translator = translator();
        let start = viewport(8.0);
        let cursor = Vec2::new(700.0, 50.0);
        let next = translator
            .handle(&GestureEvent::wheel(cursor, 240.0), &start)
            .next_viewport
            .unwrap();
        assert!((next.zoom - 9.0).abs() < 1e-9);
        let before = start.screen_to_world(cursor.as_dvec2());
        let after = next.screen_to_world(cursor.as_dvec2());
        assert!(before.distance(after) < 1e-9);
    }

    #[test]
    fn disabled_gestures_are_ignored() {
        let mut translator = translator();
        translator.set_enabled(EnabledGestures {
            scroll_zoom: false,
            drag_pan: false,
            drag_rotate: false,
            double_click_zoom: false,
            touch_zoom_rotate: false,
            keyboard: false,
        });
        let start = viewport(5.0);
        for event in [
            GestureEvent::wheel(Vec2::ZERO, 100.0),
            GestureEvent::pointer_down(Vec2::ZERO),
            GestureEvent::pointer_move(Vec2::ONE * 50.0),
            GestureEvent::new(GestureKind::DoubleClick, Vec2::ZERO),
            GestureEvent::new(GestureKind::PinchStart, Vec2::ZERO),
            GestureEvent::new(
                GestureKind::PinchMove {
                    scale: 2.0,
                    rotation: 0.0,
                },
                Vec2::ZERO,
            ),
            GestureEvent::new(GestureKind::Key(KeyCommand::ZoomIn), Vec2::ZERO),
        ] {
            let output = translator.handle(&event, &start);
            assert_eq!(output.next_viewport, None, "{event:?}");
            assert!(!output.interaction.is_dragging);
        }
    }

    #[test]
    fn pinch_zooms_and_rotates() {
        let mut translator = translator();
        let start = viewport(5.0);
        let centroid = Vec2::new(400.0, 300.0);
        let begin = translator.handle(&GestureEvent::new(GestureKind::PinchStart, centroid), &start);
        assert!(begin.interaction.is_dragging);
        let moved = translator
            .handle(
                &GestureEvent::new(
                    GestureKind::PinchMove {
                        scale: 4.0,
                        rotation: 30.0,
                    },
                    centroid,
                ),
                &start,
            )
            .next_viewport
            .unwrap();
        assert!((moved.zoom - 7.0).abs() < 1e-6);
        assert!((moved.bearing - 30.0).abs() < 1e-4);
        let end = translator.handle(&GestureEvent::new(GestureKind::PinchEnd, centroid), &moved);
        assert!(!end.interaction.is_dragging);
    }

    #[test]
    fn fast_release_coasts_until_rest() {
        let mut translator = translator();
        translator.set_momentum(Momentum::default());
        let start = viewport(5.0);
        let ms = Duration::from_millis;
        translator.handle(&GestureEvent::pointer_down(Vec2::ZERO).at(ms(0)), &start);
        let moved = translator
            .handle(
                &GestureEvent::pointer_move(Vec2::new(50.0, 0.0)).at(ms(50)),
                &start,
            )
            .next_viewport
            .unwrap();
        translator.handle(&GestureEvent::pointer_up(Vec2::new(100.0, 0.0)).at(ms(100)), &moved);
        assert!(translator.is_coasting());

        let mut current = moved;
        let mut frames = 0;
        while let Some(next) = translator.advance_inertia(ms(16), &current) {
            assert!(next.longitude < current.longitude);
            current = next;
            frames += 1;
            assert!(frames < 1000);
        }
        assert!(frames > 0);
        assert!(!translator.is_coasting());
    }

    #[test]
    fn pointer_down_stops_coasting() {
        let mut translator = translator();
        translator.set_momentum(Momentum::default());
        let start = viewport(5.0);
        let ms = Duration::from_millis;
        translator.handle(&GestureEvent::pointer_down(Vec2::ZERO).at(ms(0)), &start);
        translator.handle(&GestureEvent::pointer_move(Vec2::new(80.0, 0.0)).at(ms(40)), &start);
        translator.handle(&GestureEvent::pointer_up(Vec2::new(100.0, 0.0)).at(ms(50)), &start);
        assert!(translator.is_coasting());
        translator.handle(&GestureEvent::pointer_down(Vec2::ZERO).at(ms(60)), &start);
        assert!(!translator.is_coasting());
    }

    #[test]
    fn keyboard_commands() {
        let mut translator = translator();
        let start = viewport(5.0);
        let key = |command| GestureEvent::new(GestureKind::Key(command), Vec2::ZERO);

        let zoomed = translator.handle(&key(KeyCommand::ZoomIn), &start);
        assert_eq!(zoomed.next_viewport.unwrap().zoom, 6.0);
        let rotated = translator.handle(&key(KeyCommand::RotateRight), &start);
        assert_eq!(rotated.next_viewport.unwrap().bearing, 15.0);
        let panned = translator.handle(&key(KeyCommand::PanRight), &start);
        assert!(panned.next_viewport.unwrap().longitude > start.longitude);
        // Pitch is already at its minimum.
        assert_eq!(translator.handle(&key(KeyCommand::PitchDown), &start).next_viewport, None);
    }

    #[test]
    fn cancel_resets_interaction() {
        let mut translator = translator();
        translator.handle(&GestureEvent::pointer_down(Vec2::ZERO), &viewport(3.0));
        assert!(translator.interaction().is_dragging);
        translator.cancel();
        assert_eq!(translator.interaction(), InteractionState::default());
        let output = translator.handle(&GestureEvent::pointer_move(Vec2::ONE), &viewport(3.0));
        assert_eq!(output.next_viewport, None);
    }
}
