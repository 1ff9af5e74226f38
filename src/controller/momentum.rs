//! Pan momentum after a drag is released.

use std::{collections::VecDeque, time::Duration};

use bevy_math::{prelude::*, DVec2};
use bevy_reflect::prelude::*;

/// Only pointer samples this recent contribute to the release velocity.
const VELOCITY_WINDOW: Duration = Duration::from_millis(100);

/// Maximum number of samples kept for velocity estimation.
const VELOCITY_HISTORY_SIZE: usize = 8;

/// Settings for the momentum the map keeps after a pan is released.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Momentum {
    /// Should a fast pan keep moving after release?
    pub enabled: bool,
    /// Multiplier applied to the release velocity.
    pub init_pan: f32,
    /// Exponential decay rate of the velocity, per second. Higher values stop sooner.
    pub pan_damping: f32,
    /// Speed in pixels per second below which the map stops.
    pub min_speed: f32,
}

impl Default for Momentum {
    fn default() -> Self {
        Self {
            enabled: true,
            init_pan: 1.0,
            pan_damping: 6.0,
            min_speed: 20.0,
        }
    }
}

impl Momentum {
    /// Momentum turned off, the map stops the moment the pointer is released.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Recent pointer positions of a drag, used to estimate the velocity at release.
#[derive(Debug, Clone, Default)]
pub(crate) struct VelocityTracker {
    samples: VecDeque<(Duration, Vec2)>,
}

impl VelocityTracker {
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn record(&mut self, timestamp: Duration, position: Vec2) {
        self.samples.push_back((timestamp, position));
        if self.samples.len() > VELOCITY_HISTORY_SIZE {
            self.samples.pop_front();
        }
    }

    /// Velocity in pixels per second at `release`. A pointer that rested before release has
    /// no velocity.
    pub fn velocity_at(&self, release: Duration) -> Vec2 {
        let recent: Vec<_> = self
            .samples
            .iter()
            .filter(|(t, _)| release.saturating_sub(*t) <= VELOCITY_WINDOW)
            .collect();
        let (Some((t0, p0)), Some((t1, p1))) = (recent.first(), recent.last()) else {
            return Vec2::ZERO;
        };
        let dt = t1.saturating_sub(*t0).as_secs_f32();
        if dt <= f32::EPSILON {
            return Vec2::ZERO;
        }
        (*p1 - *p0) / dt
    }
}

/// Pan velocity left over from a released drag, decaying every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Inertia {
    /// Screen-space velocity in pixels per second.
    velocity: DVec2,
}

impl Inertia {
    /// Start inertia from a release velocity, or `None` if it is too slow to matter.
    pub fn from_release(momentum: &Momentum, velocity: Vec2) -> Option<Self> {
        let velocity = velocity.as_dvec2() * momentum.init_pan as f64;
        (momentum.enabled && velocity.is_finite() && velocity.length() > momentum.min_speed as f64)
            .then_some(Self { velocity })
    }

    /// Advance by `delta_time`, returning the screen-space pan to apply, or `None` once the
    /// map has come to rest.
    pub fn advance(&mut self, momentum: &Momentum, delta_time: Duration) -> Option<DVec2> {
        let dt = delta_time.as_secs_f64();
        let pan = self.velocity * dt;
        self.velocity *= (-(momentum.pan_damping as f64) * dt).exp();
        (self.velocity.length() >= momentum.min_speed as f64).then_some(pan)
    }
}
