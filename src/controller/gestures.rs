//! The canonical gesture stream produced by the input normalizer and consumed by the
//! translator. Mouse, touch, trackpad, and keyboard input all end up as [`GestureEvent`]s.

use std::time::Duration;

use bevy_ecs::prelude::*;
use bevy_math::prelude::*;
use bevy_reflect::prelude::*;

/// The button that started a pointer drag. Touches act as [`PointerButton::Primary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum PointerButton {
    /// Left mouse button, or a single finger.
    Primary,
    /// Right mouse button. Dragging with it rotates and pitches the map.
    Secondary,
    /// Middle mouse button. Treated like the primary button.
    Middle,
}

/// Keyboard modifiers held when a gesture event was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub struct Modifiers {
    /// Either shift key.
    pub shift: bool,
    /// Either control key.
    pub ctrl: bool,
    /// Either alt/option key.
    pub alt: bool,
    /// Either super/command/windows key.
    pub super_key: bool,
}

impl Modifiers {
    /// No modifiers held.
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        super_key: false,
    };

    /// Only shift held.
    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    /// Is any modifier held? Dragging with a modifier rotates instead of panning.
    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.super_key
    }
}

/// Discrete keyboard navigation commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum KeyCommand {
    PanLeft,
    PanRight,
    PanUp,
    PanDown,
    ZoomIn,
    ZoomOut,
    RotateLeft,
    RotateRight,
    PitchUp,
    PitchDown,
}

/// What kind of physical action a [`GestureEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum GestureKind {
    /// A button or finger went down.
    PointerDown {
        /// Which button, [`PointerButton::Primary`] for touches.
        button: PointerButton,
    },
    /// The pointer moved while a button was held.
    PointerMove,
    /// The button or finger was released.
    PointerUp,
    /// Scroll input. `delta.y` is in pixels, positive values zoom in.
    Wheel,
    /// A second finger touched down. `position` is the centroid of both fingers.
    PinchStart,
    /// The fingers of a pinch moved.
    PinchMove {
        /// Finger spread relative to the start of the pinch.
        scale: f32,
        /// Counter-clockwise rotation of the fingers since the start of the pinch, in degrees.
        rotation: f32,
    },
    /// One of the pinching fingers lifted.
    PinchEnd,
    /// Two quick clicks or taps at about the same position.
    DoubleClick,
    /// A keyboard navigation command.
    Key(KeyCommand),
}

/// A single normalized input event, in surface-local logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct GestureEvent {
    /// What happened.
    pub kind: GestureKind,
    /// Pointer position, or the pinch centroid.
    pub position: Vec2,
    /// Movement since the previous event of the same gesture, when meaningful.
    pub delta: Vec2,
    /// Modifier keys held at the time of the event.
    pub modifiers: Modifiers,
    /// Time the event happened, used to estimate release velocity for inertia.
    pub timestamp: Duration,
}

impl GestureEvent {
    /// Create an event without delta, modifiers, or timestamp.
    pub fn new(kind: GestureKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            delta: Vec2::ZERO,
            modifiers: Modifiers::NONE,
            timestamp: Duration::ZERO,
        }
    }

    /// Set the movement delta.
    #[must_use = "with_delta returns a modified GestureEvent"]
    pub fn with_delta(self, delta: Vec2) -> Self {
        Self { delta, ..self }
    }

    /// Set the held modifiers.
    #[must_use = "with_modifiers returns a modified GestureEvent"]
    pub fn with_modifiers(self, modifiers: Modifiers) -> Self {
        Self { modifiers, ..self }
    }

    /// Set the timestamp.
    #[must_use = "at returns a modified GestureEvent"]
    pub fn at(self, timestamp: Duration) -> Self {
        Self { timestamp, ..self }
    }

    /// Shorthand for a primary-button [`GestureKind::PointerDown`].
    pub fn pointer_down(position: Vec2) -> Self {
        Self::new(
            GestureKind::PointerDown {
                button: PointerButton::Primary,
            },
            position,
        )
    }

    /// Shorthand for a [`GestureKind::PointerMove`].
    pub fn pointer_move(position: Vec2) -> Self {
        Self::new(GestureKind::PointerMove, position)
    }

    /// Shorthand for a [`GestureKind::PointerUp`].
    pub fn pointer_up(position: Vec2) -> Self {
        Self::new(GestureKind::PointerUp, position)
    }

    /// Shorthand for a [`GestureKind::Wheel`] that zooms in for positive `amount`.
    pub fn wheel(position: Vec2, amount: f32) -> Self {
        Self::new(GestureKind::Wheel, position).with_delta(Vec2::new(0.0, amount))
    }
}

/// A [`GestureEvent`] addressed to the entity holding the
/// [`MapController`](super::component::MapController) it should drive.
#[derive(Debug, Clone, Copy, Event)]
pub struct MapGesture {
    /// The controller entity.
    pub controller: Entity,
    /// The gesture.
    pub gesture: GestureEvent,
}
