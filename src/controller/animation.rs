//! Smooth transitions between externally supplied viewports.
//!
//! When a new viewport differs from the displayed one in an animatable field, the
//! [`ViewportAnimator`] interpolates those fields over a sequence of fixed-interval ticks. All
//! other fields jump straight to the new viewport.

use std::time::Duration;

use bevy_log::prelude::*;
use bevy_math::prelude::*;
use bevy_reflect::prelude::*;
use bevy_time::{Timer, TimerMode};

use super::viewport::ViewportState;

/// Time between animation ticks.
pub const ANIMATION_INTERVAL: Duration = Duration::from_millis(50);

/// Progress added per tick. 50 ticks of 50 ms take 2.5 seconds. A step of 0.01 gives the
/// slower 100-tick, 5 second transition.
pub const ANIMATION_STEP: f64 = 0.02;

/// Tolerance on `t` so that accumulated rounding never drops the final frame.
const T_EPSILON: f64 = 1e-9;

/// Viewport fields that are interpolated instead of applied instantly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum AnimatableField {
    Pitch,
    Bearing,
}

impl AnimatableField {
    /// Every animatable field.
    pub const ALL: [Self; 2] = [Self::Pitch, Self::Bearing];

    /// Read this field.
    pub fn get(self, viewport: &ViewportState) -> f64 {
        match self {
            Self::Pitch => viewport.pitch,
            Self::Bearing => viewport.bearing,
        }
    }

    /// Write this field.
    pub fn set(self, viewport: &mut ViewportState, value: f64) {
        match self {
            Self::Pitch => viewport.pitch = value,
            Self::Bearing => viewport.bearing = value,
        }
    }
}

/// Returns `true` if any [`AnimatableField`] differs between the two viewports.
pub fn animatable_fields_differ(a: &ViewportState, b: &ViewportState) -> bool {
    AnimatableField::ALL
        .iter()
        .any(|field| field.get(a) != field.get(b))
}

/// Compose the viewport at progress `t`: animatable fields are `t·end + (1 − t)·start`, every
/// other field is taken from `end`.
pub fn interpolate(start: &ViewportState, end: &ViewportState, t: f64) -> ViewportState {
    let mut viewport = *end;
    for field in AnimatableField::ALL {
        field.set(&mut viewport, t * field.get(end) + (1.0 - t) * field.get(start));
    }
    viewport
}

/// Maps linear progress to eased progress.
#[derive(Debug, Clone, Default)]
pub enum Easing {
    /// Constant speed.
    #[default]
    Linear,
    /// A cubic bezier timing curve, like CSS `cubic-bezier()`.
    Curve(CubicSegment<Vec2>),
}

impl Easing {
    /// The standard ease-in-out curve.
    pub fn ease_in_out() -> Self {
        Self::Curve(CubicSegment::new_bezier((0.42, 0.0), (0.58, 1.0)))
    }

    /// Eased progress. The end points are always exact.
    pub fn ease(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::Curve(_) if t <= 0.0 => 0.0,
            Easing::Curve(_) if t >= 1.0 => 1.0,
            Easing::Curve(curve) => curve.ease(t as f32) as f64,
        }
    }
}

/// Where a preempting animation starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum PreemptionStart {
    /// Start from the previously supplied viewport, the end point of the animation being
    /// replaced. The displayed viewport can jump at the moment of preemption.
    #[default]
    PreviousProps,
    /// Start from the interpolated viewport on screen at the moment of preemption.
    LiveViewport,
}

/// Animation tuning.
#[derive(Debug, Clone)]
pub struct AnimationSettings {
    /// Time between ticks.
    pub interval: Duration,
    /// Progress per tick.
    pub step: f64,
    /// Easing applied to progress.
    pub easing: Easing,
    /// Start point of an animation that replaces one already running.
    pub preemption: PreemptionStart,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            interval: ANIMATION_INTERVAL,
            step: ANIMATION_STEP,
            easing: Easing::Linear,
            preemption: PreemptionStart::PreviousProps,
        }
    }
}

/// Observable phase of the animator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum AnimationPhase {
    Idle,
    Animating,
}

/// One result of an animation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationStep {
    /// The interpolated viewport for this tick.
    Frame(ViewportState),
    /// Progress passed 1.0 and the animation was torn down.
    Finished,
}

#[derive(Debug, Clone)]
struct ActiveAnimation {
    ticks: u32,
    start: ViewportState,
    end: ViewportState,
    current: ViewportState,
    timer: Timer,
}

/// Drives interpolation between two viewports with a repeating timer.
///
/// Exists in one of two phases. While [`AnimationPhase::Animating`], it owns the start and end
/// viewports and the tick timer. [`ViewportAnimator::cancel`] and completion both drop them.
#[derive(Debug, Clone, Default)]
pub struct ViewportAnimator {
    settings: AnimationSettings,
    active: Option<ActiveAnimation>,
}

impl ViewportAnimator {
    /// Create an idle animator.
    pub fn new(settings: AnimationSettings) -> Self {
        Self {
            settings,
            active: None,
        }
    }

    /// Animation tuning.
    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    /// Replace the tuning. Takes effect for the next animation.
    pub fn set_settings(&mut self, settings: AnimationSettings) {
        self.settings = settings;
    }

    /// Current phase.
    pub fn phase(&self) -> AnimationPhase {
        if self.active.is_some() {
            AnimationPhase::Animating
        } else {
            AnimationPhase::Idle
        }
    }

    /// Is an animation running?
    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    /// Progress of the next tick, while animating.
    pub fn t(&self) -> Option<f64> {
        self.active
            .as_ref()
            .map(|active| active.ticks as f64 * self.settings.step)
    }

    /// The viewport being animated from.
    pub fn start_viewport(&self) -> Option<&ViewportState> {
        self.active.as_ref().map(|active| &active.start)
    }

    /// The viewport being animated to.
    pub fn end_viewport(&self) -> Option<&ViewportState> {
        self.active.as_ref().map(|active| &active.end)
    }

    /// The most recently produced frame, while animating.
    pub fn live_viewport(&self) -> Option<&ViewportState> {
        self.active.as_ref().map(|active| &active.current)
    }

    /// Begin animating from `start` to `end`, replacing any running animation.
    ///
    /// Returns `false` and stays idle if the viewports agree on every animatable field.
    pub fn start(&mut self, start: ViewportState, end: ViewportState) -> bool {
        if !animatable_fields_differ(&start, &end) {
            return false;
        }
        if self.cancel() {
            debug!("Preempting viewport animation");
        }
        debug!(
            "Animating viewport: pitch {} -> {}, bearing {} -> {}",
            start.pitch, end.pitch, start.bearing, end.bearing
        );
        self.active = Some(ActiveAnimation {
            ticks: 0,
            start,
            end,
            current: interpolate(&start, &end, 0.0),
            timer: Timer::new(self.settings.interval, TimerMode::Repeating),
        });
        true
    }

    /// Replace the end viewport of the running animation without restarting it. The start
    /// viewport keeps its animatable fields and takes every other field from `end`.
    ///
    /// Returns `false` when idle.
    pub fn retarget(&mut self, end: ViewportState) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let mut start = end;
        for field in AnimatableField::ALL {
            field.set(&mut start, field.get(&active.start));
        }
        let mut current = end;
        for field in AnimatableField::ALL {
            field.set(&mut current, field.get(&active.current));
        }
        active.start = start;
        active.end = end;
        active.current = current;
        true
    }

    /// Run a single tick.
    pub fn step(&mut self) -> Option<AnimationStep> {
        let active = self.active.as_mut()?;
        let t = active.ticks as f64 * self.settings.step;
        if t > 1.0 + T_EPSILON {
            self.active = None;
            debug!("Viewport animation finished");
            return Some(AnimationStep::Finished);
        }
        let eased = self.settings.easing.ease(t.min(1.0));
        active.current = interpolate(&active.start, &active.end, eased);
        active.ticks += 1;
        Some(AnimationStep::Frame(active.current))
    }

    /// Advance the tick timer by `delta`, running one [`Self::step`] per elapsed interval.
    pub fn tick(&mut self, delta: Duration) -> Vec<AnimationStep> {
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };
        active.timer.tick(delta);
        // Stops at `Finished`, so a huge tick count only runs the ticks that are left.
        let ticks = active.timer.times_finished_this_tick();
        let mut steps = Vec::new();
        for _ in 0..ticks {
            match self.step() {
                Some(step @ AnimationStep::Frame(_)) => steps.push(step),
                Some(AnimationStep::Finished) => {
                    steps.push(AnimationStep::Finished);
                    break;
                }
                None => break,
            }
        }
        steps
    }

    /// Stop any running animation and release its timer. Safe to call any number of times.
    /// Returns `true` if an animation was running.
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }
}
