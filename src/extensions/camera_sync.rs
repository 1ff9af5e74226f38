//! A `bevy_map_controller` extension that places a 3D camera to look at the map the way the live
//! viewport describes it.
//!
//! The map lies on the XY plane, centered on the origin, with +X east and +Y north. One world
//! unit is one Web-Mercator pixel at zoom 0, times [`MapCameraSync::units_per_pixel`].

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_math::{prelude::*, DVec2};
use bevy_reflect::prelude::*;
use bevy_transform::{prelude::*, TransformSystem};

use crate::controller::viewport::{project, TILE_SIZE};
use crate::prelude::*;

/// See the [module](self) docs.
pub struct CameraSyncPlugin;

impl Plugin for CameraSyncPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            PostUpdate,
            MapCameraSync::sync_transforms.before(TransformSystem::TransformPropagate),
        )
        .register_type::<MapCameraSync>();
    }
}

/// Add to a camera entity that is subscribed to a [`MapController`] to keep its [`Transform`]
/// following the [`LiveViewport`].
///
/// ```
/// # use bevy_ecs::prelude::*;
/// # use bevy_map_controller::{prelude::*, extensions::camera_sync::MapCameraSync};
/// # let mut world = World::new();
/// let props = ViewportProps::new(ViewportState::new(800.0, 600.0, 0.0, 0.0, 2.0));
/// let mut controller = MapController::new(props).unwrap();
/// let camera = world.spawn(MapCameraSync::default()).id();
/// controller.subscribe(camera);
/// world.spawn(controller);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Component, Reflect)]
pub struct MapCameraSync {
    /// World units per Web-Mercator pixel at zoom 0.
    pub units_per_pixel: f32,
}

impl Default for MapCameraSync {
    fn default() -> Self {
        Self {
            units_per_pixel: 1.0,
        }
    }
}

impl MapCameraSync {
    /// Where the `(longitude, latitude)` point lies on the map plane.
    pub fn map_point(&self, longitude: f64, latitude: f64) -> Vec3 {
        let world = project(longitude, latitude) - DVec2::splat(TILE_SIZE / 2.0);
        Vec3::new(world.x as f32, -world.y as f32, 0.0) * self.units_per_pixel
    }

    /// The camera transform for `viewport`. The camera sits `altitude` screen heights away from
    /// the center, tilted south by the pitch and turned by the bearing.
    pub fn transform(&self, viewport: &ViewportState) -> Transform {
        let center = self.map_point(viewport.longitude, viewport.latitude);
        let distance = (viewport.altitude_or_default() * viewport.height / viewport.scale()) as f32
            * self.units_per_pixel;
        let rotation = Quat::from_rotation_z(-(viewport.bearing as f32).to_radians())
            * Quat::from_rotation_x((viewport.pitch as f32).to_radians());
        Transform {
            translation: center + rotation * Vec3::Z * distance,
            rotation,
            ..Default::default()
        }
    }

    fn sync_transforms(
        mut cameras: Query<(&Self, &LiveViewport, &mut Transform), Changed<LiveViewport>>,
    ) {
        for (sync, live, mut transform) in &mut cameras {
            *transform = sync.transform(live);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-3;

    #[test]
    fn top_down_camera_above_center() {
        let sync = MapCameraSync::default();
        let viewport = ViewportState::new(800.0, 600.0, 0.0, 0.0, 0.0).with_altitude(1.0);
        let transform = sync.transform(&viewport);
        assert!(transform.translation.distance(Vec3::new(0.0, 0.0, 600.0)) < EPSILON);
        assert!(transform.forward().dot(Vec3::NEG_Z) > 1.0 - EPSILON);
        assert!(transform.up().dot(Vec3::Y) > 1.0 - EPSILON);
    }

    #[test]
    fn pitch_moves_camera_south() {
        let sync = MapCameraSync::default();
        let viewport = ViewportState::new(800.0, 600.0, 0.0, 0.0, 1.0).with_pitch(45.0);
        let transform = sync.transform(&viewport);
        assert!(transform.translation.y < 0.0);
        assert!(transform.translation.z > 0.0);
        // Still looking at the center.
        let to_center = (Vec3::ZERO - transform.translation).normalize();
        assert!(transform.forward().dot(to_center) > 1.0 - EPSILON);
    }

    #[test]
    fn bearing_turns_screen_up_direction() {
        let sync = MapCameraSync::default();
        let viewport = ViewportState::new(800.0, 600.0, 0.0, 0.0, 1.0).with_bearing(90.0);
        // Facing east: east is up on screen.
        assert!(sync.transform(&viewport).up().dot(Vec3::X) > 1.0 - EPSILON);
    }

    #[test]
    fn higher_zoom_is_closer() {
        let sync = MapCameraSync::default();
        let far = sync.transform(&ViewportState::new(800.0, 600.0, 0.0, 0.0, 2.0));
        let near = sync.transform(&ViewportState::new(800.0, 600.0, 0.0, 0.0, 3.0));
        assert!((far.translation.z / near.translation.z - 2.0).abs() < EPSILON);
    }
}
