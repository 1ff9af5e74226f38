//! Provides [`ViewportLimits`] settings.

use bevy_reflect::Reflect;

use super::error::ConfigurationError;

/// Bound zoom and pitch, the two viewport fields the controller enforces.
///
/// Longitude and latitude are not clamped here. Latitude stays inside the valid Web-Mercator
/// range as a side effect of projecting and unprojecting positions, and longitude is allowed
/// to wrap freely.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportLimits {
    /// The smallest zoom level the camera can reach. At zoom 0 the whole world fits in 512
    /// pixels.
    pub min_zoom: f64,
    /// The largest zoom level the camera can reach. Each zoom level doubles the scale.
    pub max_zoom: f64,
    /// Smallest pitch in degrees, where 0 is looking straight down.
    pub min_pitch: f64,
    /// Largest pitch in degrees.
    pub max_pitch: f64,
}

impl Default for ViewportLimits {
    fn default() -> Self {
        Self {
            min_zoom: 0.0,
            max_zoom: 20.0,
            min_pitch: 0.0,
            max_pitch: 60.0,
        }
    }
}

impl ViewportLimits {
    /// Create limits, rejecting bounds that cannot be satisfied.
    pub fn new(
        min_zoom: f64,
        max_zoom: f64,
        min_pitch: f64,
        max_pitch: f64,
    ) -> Result<Self, ConfigurationError> {
        let limits = Self {
            min_zoom,
            max_zoom,
            min_pitch,
            max_pitch,
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Check that every bound is finite and each range is ordered.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
            ("min_pitch", self.min_pitch),
            ("max_pitch", self.max_pitch),
        ] {
            if !value.is_finite() {
                return Err(ConfigurationError::NonFinite { field });
            }
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigurationError::InvertedLimits {
                field: "zoom",
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        if self.min_pitch > self.max_pitch {
            return Err(ConfigurationError::InvertedLimits {
                field: "pitch",
                min: self.min_pitch,
                max: self.max_pitch,
            });
        }
        Ok(())
    }

    /// Clamp a zoom level into `[min_zoom, max_zoom]`.
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Clamp a pitch into `[min_pitch, max_pitch]`.
    pub fn clamp_pitch(&self, pitch: f64) -> f64 {
        pitch.clamp(self.min_pitch, self.max_pitch)
    }

    /// Returns `true` if both the zoom and the pitch are inside the limits.
    pub fn contains(&self, zoom: f64, pitch: f64) -> bool {
        (self.min_zoom..=self.max_zoom).contains(&zoom)
            && (self.min_pitch..=self.max_pitch).contains(&pitch)
    }
}
