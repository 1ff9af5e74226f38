//! Errors surfaced to callers when a controller or input listener is set up incorrectly.
//!
//! Out-of-range zoom and pitch are not errors. They are clamped at the translator boundary.

use bevy_ecs::entity::Entity;

/// A controller or input listener was given a configuration it cannot work with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// A required viewport field was NaN or infinite.
    #[error("viewport field `{field}` must be finite")]
    NonFinite {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The viewport has no drawable area.
    #[error("viewport size must be positive, got {width}x{height}")]
    InvalidSize {
        /// Width in logical pixels.
        width: f64,
        /// Height in logical pixels.
        height: f64,
    },
    /// Latitude outside of `[-90, 90]` degrees.
    #[error("latitude {0} is outside of [-90, 90]")]
    LatitudeOutOfRange(f64),
    /// A minimum bound is larger than its maximum.
    #[error("`min_{field}` ({min}) is greater than `max_{field}` ({max})")]
    InvertedLimits {
        /// Either `zoom` or `pitch`.
        field: &'static str,
        /// The lower bound.
        min: f64,
        /// The upper bound.
        max: f64,
    },
    /// Animation progress per tick must be a positive number.
    #[error("animation step must be positive and finite, got {0}")]
    InvalidAnimationStep(f64),
    /// Animation ticks need a non-zero interval between them.
    #[error("animation interval must be longer than zero")]
    InvalidAnimationInterval,
    /// The entity passed to [`InputNormalizer::attach`](super::inputs::InputNormalizer::attach)
    /// is not an interactive surface.
    #[error("entity {0} is not an interactive surface")]
    InvalidSurface(Entity),
    /// The entity does not carry a [`MapController`](super::component::MapController).
    #[error("entity {0} has no map controller")]
    UnknownController(Entity),
}
