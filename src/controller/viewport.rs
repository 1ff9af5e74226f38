//! The camera state of a map, [`ViewportState`], and the Web-Mercator math used to move it.

use bevy_math::DVec2;
use bevy_reflect::prelude::*;

use super::{error::ConfigurationError, limits::ViewportLimits};

/// Size in pixels of the whole world at zoom level 0.
pub const TILE_SIZE: f64 = 512.0;

/// Latitude at which the Web-Mercator projection becomes square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Default camera altitude, in screen heights.
pub const DEFAULT_ALTITUDE: f64 = 1.5;

/// Describes which portion of the map is visible.
///
/// Only [`MapController`](super::component::MapController) commits new values, using
/// proposals from the gesture translator or the animator. Rendering code reads snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportState {
    /// Width of the viewport in logical pixels.
    pub width: f64,
    /// Height of the viewport in logical pixels.
    pub height: f64,
    /// Longitude of the map center, in degrees.
    pub longitude: f64,
    /// Latitude of the map center, in degrees.
    pub latitude: f64,
    /// Tile zoom level. The map scale is `2^zoom`.
    pub zoom: f64,
    /// Rotation of the map in degrees, clockwise from north.
    pub bearing: f64,
    /// Tilt of the camera in degrees, where 0 looks straight down.
    pub pitch: f64,
    /// Height of the camera above the map in screen heights, when set.
    pub altitude: Option<f64>,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            longitude: 0.0,
            latitude: 0.0,
            zoom: 0.0,
            bearing: 0.0,
            pitch: 0.0,
            altitude: None,
        }
    }
}

impl ViewportState {
    /// Create a north-up, top-down viewport.
    pub fn new(width: f64, height: f64, longitude: f64, latitude: f64, zoom: f64) -> Self {
        Self {
            width,
            height,
            longitude,
            latitude,
            zoom,
            ..Default::default()
        }
    }

    /// Set the bearing in degrees.
    #[must_use = "with_bearing returns a modified ViewportState"]
    pub fn with_bearing(self, bearing: f64) -> Self {
        Self { bearing, ..self }
    }

    /// Set the pitch in degrees.
    #[must_use = "with_pitch returns a modified ViewportState"]
    pub fn with_pitch(self, pitch: f64) -> Self {
        Self { pitch, ..self }
    }

    /// Set the camera altitude.
    #[must_use = "with_altitude returns a modified ViewportState"]
    pub fn with_altitude(self, altitude: f64) -> Self {
        Self {
            altitude: Some(altitude),
            ..self
        }
    }

    /// Camera altitude, falling back to [`DEFAULT_ALTITUDE`].
    pub fn altitude_or_default(&self) -> f64 {
        self.altitude.unwrap_or(DEFAULT_ALTITUDE)
    }

    /// Check that the viewport can be displayed at all.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("width", self.width),
            ("height", self.height),
            ("longitude", self.longitude),
            ("latitude", self.latitude),
            ("zoom", self.zoom),
            ("bearing", self.bearing),
            ("pitch", self.pitch),
            ("altitude", self.altitude_or_default()),
        ] {
            if !value.is_finite() {
                return Err(ConfigurationError::NonFinite { field });
            }
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ConfigurationError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ConfigurationError::LatitudeOutOfRange(self.latitude));
        }
        Ok(())
    }

    /// Returns a copy with zoom and pitch forced into `limits`.
    #[must_use]
    pub fn clamped(self, limits: &ViewportLimits) -> Self {
        Self {
            zoom: limits.clamp_zoom(self.zoom),
            pitch: limits.clamp_pitch(self.pitch),
            ..self
        }
    }

    /// The map scale, `2^zoom`.
    pub fn scale(&self) -> f64 {
        self.zoom.exp2()
    }

    /// Size of the viewport as a vector.
    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }

    /// The map center in zoom-0 world pixels.
    pub fn center_world(&self) -> DVec2 {
        project(self.longitude, self.latitude)
    }

    /// Convert an offset in screen pixels into an offset in zoom-0 world pixels, accounting
    /// for the current bearing and scale. Pitch foreshortening is ignored.
    pub fn screen_offset_to_world(&self, offset: DVec2) -> DVec2 {
        DVec2::from_angle(self.bearing.to_radians()).rotate(offset) / self.scale()
    }

    /// The world position under a screen position.
    pub fn screen_to_world(&self, screen: DVec2) -> DVec2 {
        self.center_world() + self.screen_offset_to_world(screen - self.size() / 2.0)
    }

    /// Returns a copy whose center is moved to `world`.
    #[must_use]
    pub fn centered_on_world(self, world: DVec2) -> Self {
        let (longitude, latitude) = unproject(world);
        Self {
            longitude,
            latitude,
            ..self
        }
    }

    /// Move the map so that content follows the pointer by `screen_delta` pixels.
    #[must_use]
    pub fn panned_by(self, screen_delta: DVec2) -> Self {
        let world = self.center_world() - self.screen_offset_to_world(screen_delta);
        self.centered_on_world(world)
    }

    /// Move the center so that the world position `world` appears at the screen position
    /// `screen`, keeping the current zoom and bearing.
    #[must_use]
    pub fn with_world_at_screen(self, world: DVec2, screen: DVec2) -> Self {
        let offset = self.screen_offset_to_world(screen - self.size() / 2.0);
        self.centered_on_world(world - offset)
    }

    /// Change the zoom level while keeping the map position under `anchor` fixed on screen.
    #[must_use]
    pub fn zoomed_around(self, zoom: f64, anchor: DVec2) -> Self {
        let anchor_world = self.screen_to_world(anchor);
        Self { zoom, ..self }.with_world_at_screen(anchor_world, anchor)
    }
}

/// Wrap a bearing into `[-180, 180)` degrees.
pub fn wrap_bearing(bearing: f64) -> f64 {
    (bearing + 180.0).rem_euclid(360.0) - 180.0
}

/// Project longitude and latitude in degrees to zoom-0 Web-Mercator world pixels, with the
/// origin at the north-west corner and y pointing south.
pub fn project(longitude: f64, latitude: f64) -> DVec2 {
    let latitude = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (longitude + 180.0) / 360.0;
    let y = (std::f64::consts::PI
        - (std::f64::consts::FRAC_PI_4 + latitude / 2.0).tan().ln())
        / (2.0 * std::f64::consts::PI);
    DVec2::new(x, y) * TILE_SIZE
}

/// Inverse of [`project`], returning `(longitude, latitude)` in degrees.
pub fn unproject(world: DVec2) -> (f64, f64) {
    let normalized = world / TILE_SIZE;
    let longitude = normalized.x * 360.0 - 180.0;
    let phi = std::f64::consts::PI - normalized.y * 2.0 * std::f64::consts::PI;
    let latitude = (2.0 * phi.exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (longitude, latitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn projection_round_trips_inside_mercator_range() {
        for (lng, lat) in [(0.0, 0.0), (-122.4, 37.8), (151.2, -33.9), (179.0, 80.0)] {
            let (lng2, lat2) = unproject(project(lng, lat));
            assert!((lng - lng2).abs() < EPSILON, "{lng} != {lng2}");
            assert!((lat - lat2).abs() < EPSILON, "{lat} != {lat2}");
        }
    }

    #[test]
    fn null_island_is_world_center() {
        let center = project(0.0, 0.0);
        assert!(center.distance(DVec2::splat(TILE_SIZE / 2.0)) < EPSILON);
    }

    #[test]
    fn zooming_around_center_keeps_center() {
        let viewport = ViewportState::new(800.0, 600.0, -122.4, 37.8, 10.0);
        let zoomed = viewport.zoomed_around(12.0, viewport.size() / 2.0);
        assert!((zoomed.longitude - viewport.longitude).abs() < EPSILON);
        assert!((zoomed.latitude - viewport.latitude).abs() < EPSILON);
        assert_eq!(zoomed.zoom, 12.0);
    }

    #[test]
    fn zooming_keeps_anchor_fixed() {
        let viewport = ViewportState::new(800.0, 600.0, 10.0, 45.0, 8.0).with_bearing(30.0);
        let anchor = DVec2::new(100.0, 500.0);
        let before = viewport.screen_to_world(anchor);
        let after = viewport.zoomed_around(9.5, anchor).screen_to_world(anchor);
        assert!(before.distance(after) < 1e-9);
    }

    #[test]
    fn panning_right_moves_center_west() {
        let viewport = ViewportState::new(800.0, 600.0, 0.0, 0.0, 3.0);
        let panned = viewport.panned_by(DVec2::new(50.0, 0.0));
        assert!(panned.longitude < viewport.longitude);
        assert!(panned.latitude.abs() < EPSILON);
    }

    #[test]
    fn validation_rejects_bad_fields() {
        let viewport = ViewportState::new(800.0, 600.0, 0.0, 0.0, 3.0);
        assert!(viewport.validate().is_ok());
        assert_eq!(
            ViewportState { width: 0.0, ..viewport }.validate(),
            Err(ConfigurationError::InvalidSize {
                width: 0.0,
                height: 600.0
            })
        );
        assert_eq!(
            ViewportState { latitude: 95.0, ..viewport }.validate(),
            Err(ConfigurationError::LatitudeOutOfRange(95.0))
        );
        assert_eq!(
            ViewportState { zoom: f64::NAN, ..viewport }.validate(),
            Err(ConfigurationError::NonFinite { field: "zoom" })
        );
    }
}
