//! Turns raw window input into the canonical [`GestureEvent`] stream.
//!
//! Each attached [`Listener`] watches one window and feeds one controller. Listeners do no camera
//! math: they only track pointer, touch, and modifier state to decide which gesture a physical
//! action is.

use std::time::Duration;

use bevy_ecs::prelude::*;
use bevy_input::{
    keyboard::{KeyCode, KeyboardInput},
    mouse::{MouseButton, MouseButtonInput, MouseScrollUnit, MouseWheel},
    touch::{TouchInput, TouchPhase},
    ButtonState,
};
use bevy_log::prelude::*;
use bevy_math::prelude::*;
use bevy_time::prelude::*;
use bevy_utils::HashMap;
use bevy_window::{CursorMoved, Window, WindowEvent, WindowResized};

use super::{
    component::{InteractionStateChanged, MapController},
    error::ConfigurationError,
    gestures::{GestureEvent, GestureKind, KeyCommand, MapGesture, Modifiers, PointerButton},
    translator::WHEEL_ZOOM_RATE,
};

/// Identifies an attached [`Listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

/// Tuning for how raw input is classified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputOptions {
    /// Longest time between two presses that still counts as a double click.
    pub double_click_interval: Duration,
    /// Farthest two presses may be apart, in logical pixels, to count as a double click.
    pub double_click_distance: f32,
    /// Pixels scrolled per wheel line.
    pub line_height: f32,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            double_click_interval: Duration::from_millis(300),
            double_click_distance: 5.0,
            line_height: 120.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TouchSession {
    None,
    Single(u64),
    Pinch {
        fingers: [u64; 2],
        start_distance: f32,
        start_angle: f32,
    },
    /// A pinch ended while fingers are still down. Ignored until every finger lifts.
    Spent,
}

/// Routes the input of one surface to one controller.
#[derive(Debug, Clone)]
pub struct Listener {
    surface: Entity,
    controller: Entity,
    options: InputOptions,
    size: Vec2,
    cursor: Option<Vec2>,
    pressed: Option<PointerButton>,
    last_press: Option<(Duration, Vec2)>,
    touches: HashMap<u64, Vec2>,
    touch_session: TouchSession,
    modifiers: Modifiers,
}

impl Listener {
    fn new(surface: Entity, controller: Entity, size: Vec2, options: InputOptions) -> Self {
        Self {
            surface,
            controller,
            options,
            size,
            cursor: None,
            pressed: None,
            last_press: None,
            touches: HashMap::default(),
            touch_session: TouchSession::None,
            modifiers: Modifiers::NONE,
        }
    }

    /// The window this listener reads input from.
    pub fn surface(&self) -> Entity {
        self.surface
    }

    /// The entity holding the controller this listener drives.
    pub fn controller(&self) -> Entity {
        self.controller
    }

    /// Classification settings.
    pub fn options(&self) -> &InputOptions {
        &self.options
    }

    /// Convert one window event. Events for other windows produce nothing.
    pub fn convert(&mut self, event: &WindowEvent, now: Duration) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        match event {
            WindowEvent::WindowResized(WindowResized {
                window,
                width,
                height,
            }) if *window == self.surface => {
                self.size = Vec2::new(*width, *height);
            }
            WindowEvent::CursorMoved(CursorMoved {
                window, position, ..
            }) if *window == self.surface => {
                let previous = self.cursor.replace(*position);
                if self.pressed.is_some() && self.touches.is_empty() {
                    let delta = previous.map_or(Vec2::ZERO, |previous| *position - previous);
                    out.push(self.gesture(GestureKind::PointerMove, *position, now).with_delta(delta));
                }
            }
            WindowEvent::CursorLeft(left) if left.window == self.surface => {
                if self.pressed.is_none() {
                    self.cursor = None;
                }
            }
            WindowEvent::MouseButtonInput(MouseButtonInput {
                button,
                state,
                window,
            }) if *window == self.surface => self.mouse_button(*button, *state, now, &mut out),
            WindowEvent::MouseWheel(MouseWheel { unit, y, window, .. }) if *window == self.surface => {
                let pixels = match unit {
                    MouseScrollUnit::Line => *y * self.options.line_height,
                    MouseScrollUnit::Pixel => *y,
                };
                if pixels != 0.0 {
                    let position = self.cursor.unwrap_or(self.size / 2.0);
                    out.push(
                        self.gesture(GestureKind::Wheel, position, now)
                            .with_delta(Vec2::new(0.0, pixels)),
                    );
                }
            }
            WindowEvent::PinchGesture(pinch) => {
                // Trackpad pinches have no window, they go to the surface under the cursor.
                if let Some(position) = self.cursor {
                    let pixels = pinch_to_wheel_pixels(pinch.0);
                    if pixels != 0.0 {
                        out.push(
                            self.gesture(GestureKind::Wheel, position, now)
                                .with_delta(Vec2::new(0.0, pixels)),
                        );
                    }
                }
            }
            WindowEvent::DoubleTapGesture(_) => {
                if let Some(position) = self.cursor {
                    out.push(self.gesture(GestureKind::DoubleClick, position, now));
                }
            }
            WindowEvent::TouchInput(touch) if touch.window == self.surface => {
                self.touch(touch, now, &mut out);
            }
            WindowEvent::KeyboardInput(KeyboardInput {
                key_code,
                state,
                window,
                ..
            }) if *window == self.surface => {
                let pressed = state.is_pressed();
                if !set_modifier(&mut self.modifiers, *key_code, pressed) && pressed {
                    if let Some(command) = key_command(*key_code, self.modifiers) {
                        out.push(self.gesture(GestureKind::Key(command), self.size / 2.0, now));
                    }
                }
            }
            WindowEvent::KeyboardFocusLost(_) => self.modifiers = Modifiers::NONE,
            _ => {}
        }
        out
    }

    /// End whatever gesture is in progress, as if every button and finger was lifted.
    pub fn release(&mut self, now: Duration) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        if self.pressed.take().is_some() {
            let position = self.cursor.unwrap_or(self.size / 2.0);
            out.push(self.gesture(GestureKind::PointerUp, position, now));
        }
        match self.touch_session {
            TouchSession::Single(id) => {
                let position = self.touches.get(&id).copied().unwrap_or_default();
                out.push(self.gesture(GestureKind::PointerUp, position, now));
            }
            TouchSession::Pinch { fingers, .. } => {
                let position = self.centroid(fingers).unwrap_or_default();
                out.push(self.gesture(GestureKind::PinchEnd, position, now));
            }
            TouchSession::None | TouchSession::Spent => {}
        }
        self.touches.clear();
        self.touch_session = TouchSession::None;
        out
    }

    fn gesture(&self, kind: GestureKind, position: Vec2, now: Duration) -> GestureEvent {
        GestureEvent::new(kind, position)
            .with_modifiers(self.modifiers)
            .at(now)
    }

    fn mouse_button(
        &mut self,
        button: MouseButton,
        state: ButtonState,
        now: Duration,
        out: &mut Vec<GestureEvent>,
    ) {
        let button = match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Right => PointerButton::Secondary,
            MouseButton::Middle => PointerButton::Middle,
            _ => return,
        };
        let Some(position) = self.cursor else {
            return;
        };
        match state {
            ButtonState::Pressed if self.pressed.is_none() && self.touches.is_empty() => {
                self.pressed = Some(button);
                out.push(self.gesture(GestureKind::PointerDown { button }, position, now));
                if button == PointerButton::Primary {
                    self.detect_double(position, now, out);
                }
            }
            ButtonState::Released if self.pressed == Some(button) => {
                self.pressed = None;
                out.push(self.gesture(GestureKind::PointerUp, position, now));
            }
            _ => {}
        }
    }

    fn detect_double(&mut self, position: Vec2, now: Duration, out: &mut Vec<GestureEvent>) {
        let is_double = self.last_press.is_some_and(|(time, last)| {
            now.saturating_sub(time) <= self.options.double_click_interval
                && last.distance(position) <= self.options.double_click_distance
        });
        if is_double {
            self.last_press = None;
            out.push(self.gesture(GestureKind::DoubleClick, position, now));
        } else {
            self.last_press = Some((now, position));
        }
    }

    fn touch(&mut self, touch: &TouchInput, now: Duration, out: &mut Vec<GestureEvent>) {
        match touch.phase {
            TouchPhase::Started => {
                self.touches.insert(touch.id, touch.position);
                match self.touch_session {
                    TouchSession::None if self.pressed.is_none() => {
                        self.touch_session = TouchSession::Single(touch.id);
                        out.push(self.gesture(
                            GestureKind::PointerDown {
                                button: PointerButton::Primary,
                            },
                            touch.position,
                            now,
                        ));
                        self.detect_double(touch.position, now, out);
                    }
                    TouchSession::Single(first) => {
                        let first_position = self.touches.get(&first).copied().unwrap_or_default();
                        out.push(self.gesture(GestureKind::PointerUp, first_position, now));
                        let fingers = [first, touch.id];
                        let span = touch.position - first_position;
                        self.touch_session = TouchSession::Pinch {
                            fingers,
                            start_distance: span.length(),
                            start_angle: span.to_angle(),
                        };
                        let centroid = (first_position + touch.position) / 2.0;
                        out.push(self.gesture(GestureKind::PinchStart, centroid, now));
                    }
                    _ => {}
                }
            }
            TouchPhase::Moved => {
                let Some(previous) = self.touches.insert(touch.id, touch.position) else {
                    return;
                };
                match self.touch_session {
                    TouchSession::Single(id) if id == touch.id => {
                        out.push(
                            self.gesture(GestureKind::PointerMove, touch.position, now)
                                .with_delta(touch.position - previous),
                        );
                    }
                    TouchSession::Pinch {
                        fingers,
                        start_distance,
                        start_angle,
                    } if fingers.contains(&touch.id) => {
                        let (Some(a), Some(b)) =
                            (self.touches.get(&fingers[0]), self.touches.get(&fingers[1]))
                        else {
                            return;
                        };
                        let span = *b - *a;
                        let scale = if start_distance > f32::EPSILON {
                            span.length() / start_distance
                        } else {
                            1.0
                        };
                        // Screen y points down, so a positive screen angle is clockwise.
                        let rotation = -wrap_degrees((span.to_angle() - start_angle).to_degrees());
                        let centroid = (*a + *b) / 2.0;
                        out.push(self.gesture(
                            GestureKind::PinchMove { scale, rotation },
                            centroid,
                            now,
                        ));
                    }
                    _ => {}
                }
            }
            TouchPhase::Ended | TouchPhase::Canceled => {
                let position = self.touches.get(&touch.id).copied().unwrap_or(touch.position);
                match self.touch_session {
                    TouchSession::Single(id) if id == touch.id => {
                        self.touch_session = TouchSession::None;
                        out.push(self.gesture(GestureKind::PointerUp, position, now));
                    }
                    TouchSession::Pinch { fingers, .. } if fingers.contains(&touch.id) => {
                        let centroid = self.centroid(fingers).unwrap_or(position);
                        self.touch_session = TouchSession::Spent;
                        out.push(self.gesture(GestureKind::PinchEnd, centroid, now));
                    }
                    _ => {}
                }
                self.touches.remove(&touch.id);
                if self.touches.is_empty() {
                    self.touch_session = TouchSession::None;
                }
            }
        }
    }

    fn centroid(&self, fingers: [u64; 2]) -> Option<Vec2> {
        let a = self.touches.get(&fingers[0])?;
        let b = self.touches.get(&fingers[1])?;
        Some((*a + *b) / 2.0)
    }
}

/// Wheel pixels producing the same zoom change as a trackpad pinch of `amount`.
fn pinch_to_wheel_pixels(amount: f32) -> f32 {
    let scale = 1.0 + amount;
    if !scale.is_finite() || scale <= 0.0 {
        return 0.0;
    }
    (scale.log2() as f64 / WHEEL_ZOOM_RATE) as f32
}

fn wrap_degrees(degrees: f32) -> f32 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

/// Track a modifier key. Returns `true` if `key` is a modifier.
fn set_modifier(modifiers: &mut Modifiers, key: KeyCode, pressed: bool) -> bool {
    let flag = match key {
        KeyCode::ShiftLeft | KeyCode::ShiftRight => &mut modifiers.shift,
        KeyCode::ControlLeft | KeyCode::ControlRight => &mut modifiers.ctrl,
        KeyCode::AltLeft | KeyCode::AltRight => &mut modifiers.alt,
        KeyCode::SuperLeft | KeyCode::SuperRight => &mut modifiers.super_key,
        _ => return false,
    };
    *flag = pressed;
    true
}

/// Keyboard navigation: arrows pan, shift+arrows rotate and pitch, `+`/`=` and `-` zoom.
fn key_command(key: KeyCode, modifiers: Modifiers) -> Option<KeyCommand> {
    let command = match (key, modifiers.shift) {
        (KeyCode::ArrowLeft, false) => KeyCommand::PanLeft,
        (KeyCode::ArrowRight, false) => KeyCommand::PanRight,
        (KeyCode::ArrowUp, false) => KeyCommand::PanUp,
        (KeyCode::ArrowDown, false) => KeyCommand::PanDown,
        (KeyCode::ArrowLeft, true) => KeyCommand::RotateLeft,
        (KeyCode::ArrowRight, true) => KeyCommand::RotateRight,
        (KeyCode::ArrowUp, true) => KeyCommand::PitchUp,
        (KeyCode::ArrowDown, true) => KeyCommand::PitchDown,
        (KeyCode::Equal | KeyCode::NumpadAdd, _) => KeyCommand::ZoomIn,
        (KeyCode::Minus | KeyCode::NumpadSubtract, _) => KeyCommand::ZoomOut,
        _ => return None,
    };
    Some(command)
}

/// Owns every input [`Listener`]. Holds no camera state.
#[derive(Debug, Default, Resource)]
pub struct InputNormalizer {
    next_handle: u64,
    listeners: HashMap<ListenerHandle, Listener>,
}

impl InputNormalizer {
    /// Start routing input from the `surface` window to the controller on `controller`.
    ///
    /// `window` is the [`Window`] component of `surface`, `None` if it has none.
    pub fn attach(
        &mut self,
        surface: Entity,
        window: Option<&Window>,
        controller: Entity,
        options: InputOptions,
    ) -> Result<ListenerHandle, ConfigurationError> {
        let Some(window) = window else {
            return Err(ConfigurationError::InvalidSurface(surface));
        };
        let size = Vec2::new(window.width(), window.height());
        if !(size.x > 0.0 && size.y > 0.0) {
            return Err(ConfigurationError::InvalidSurface(surface));
        }
        let handle = ListenerHandle(self.next_handle);
        self.next_handle += 1;
        self.listeners
            .insert(handle, Listener::new(surface, controller, size, options));
        debug!("Attached map input listener {handle:?} from {surface} to {controller}");
        Ok(handle)
    }

    /// Stop routing input for `handle`. Detaching twice is a no-op that returns `None`.
    pub fn detach(&mut self, handle: ListenerHandle) -> Option<Listener> {
        let listener = self.listeners.remove(&handle)?;
        debug!("Detached map input listener {handle:?}");
        Some(listener)
    }

    /// Detach every listener feeding `controller`, returning how many were removed.
    pub fn detach_controller(&mut self, controller: Entity) -> usize {
        let before = self.listeners.len();
        self.listeners
            .retain(|_, listener| listener.controller != controller);
        let removed = before - self.listeners.len();
        if removed > 0 {
            debug!("Detached {removed} map input listener(s) of {controller}");
        }
        removed
    }

    /// Is `handle` still attached?
    pub fn is_attached(&self, handle: ListenerHandle) -> bool {
        self.listeners.contains_key(&handle)
    }

    /// The listener for `handle`.
    pub fn listener(&self, handle: ListenerHandle) -> Option<&Listener> {
        self.listeners.get(&handle)
    }

    /// Convert this frame's window events into [`MapGesture`]s, in arrival order.
    pub fn dispatch(
        mut normalizer: ResMut<Self>,
        mut window_events: EventReader<WindowEvent>,
        mut gestures: EventWriter<MapGesture>,
        time: Res<Time>,
    ) {
        if normalizer.listeners.is_empty() {
            window_events.clear();
            return;
        }
        let now = time.elapsed();
        for event in window_events.read() {
            if let WindowEvent::WindowDestroyed(destroyed) = event {
                normalizer.surface_destroyed(destroyed.window, now, &mut gestures);
                continue;
            }
            for listener in normalizer.listeners.values_mut() {
                let controller = listener.controller;
                gestures.send_batch(
                    listener
                        .convert(event, now)
                        .into_iter()
                        .map(|gesture| MapGesture {
                            controller,
                            gesture,
                        }),
                );
            }
        }
    }

    fn surface_destroyed(
        &mut self,
        surface: Entity,
        now: Duration,
        gestures: &mut EventWriter<MapGesture>,
    ) {
        self.listeners.retain(|handle, listener| {
            if listener.surface != surface {
                return true;
            }
            let controller = listener.controller;
            gestures.send_batch(
                listener
                    .release(now)
                    .into_iter()
                    .map(|gesture| MapGesture {
                        controller,
                        gesture,
                    }),
            );
            debug!("Detached map input listener {handle:?}, its surface {surface} was destroyed");
            false
        });
    }
}

/// Attach and detach input listeners through the [`World`], looking up the window and the
/// controller.
pub trait MapInputWorldExt {
    /// Route input from the `surface` window to the [`MapController`] on `controller`.
    fn attach_map_input(
        &mut self,
        surface: Entity,
        controller: Entity,
        options: InputOptions,
    ) -> Result<ListenerHandle, ConfigurationError>;

    /// Detach a listener and abort the gesture it was driving. Returns `false` if it was
    /// already detached.
    fn detach_map_input(&mut self, handle: ListenerHandle) -> bool;
}

impl MapInputWorldExt for World {
    fn attach_map_input(
        &mut self,
        surface: Entity,
        controller: Entity,
        options: InputOptions,
    ) -> Result<ListenerHandle, ConfigurationError> {
        if self.get::<MapController>(controller).is_none() {
            return Err(ConfigurationError::UnknownController(controller));
        }
        self.init_resource::<InputNormalizer>();
        self.resource_scope(|world, mut normalizer: Mut<InputNormalizer>| {
            normalizer.attach(surface, world.get::<Window>(surface), controller, options)
        })
    }

    fn detach_map_input(&mut self, handle: ListenerHandle) -> bool {
        let Some(listener) = self
            .get_resource_mut::<InputNormalizer>()
            .and_then(|mut normalizer| normalizer.detach(handle))
        else {
            return false;
        };
        let controller = listener.controller();
        let changed = self
            .get_mut::<MapController>(controller)
            .and_then(|mut map_controller| map_controller.cancel_interaction());
        if let Some(state) = changed {
            self.send_event(InteractionStateChanged { controller, state });
        }
        true
    }
}
