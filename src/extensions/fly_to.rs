//! A `bevy_map_controller` extension that moves a map to a new position on request, animating
//! pitch and bearing even for controllers that do not animate external updates.

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_log::prelude::*;
use bevy_window::RequestRedraw;

use crate::prelude::*;

/// See the [module](self) docs.
pub struct FlyToPlugin;

impl Plugin for FlyToPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<FlyToTrigger>()
            // In PostUpdate so triggers sent in Update are not missed. The controller ticks the
            // animation next frame.
            .add_systems(PostUpdate, FlyToTrigger::receive);
    }
}

/// Send this event to move a map. Fields left as `None` keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Event)]
pub struct FlyToTrigger {
    /// The entity holding the [`MapController`] to move.
    pub controller: Entity,
    /// The new `(longitude, latitude)` at the center of the screen.
    pub center: Option<(f64, f64)>,
    /// The new zoom level.
    pub zoom: Option<f64>,
    /// The new bearing, animated.
    pub bearing: Option<f64>,
    /// The new pitch, animated.
    pub pitch: Option<f64>,
}

impl FlyToTrigger {
    /// A trigger that keeps every field as it is.
    pub fn new(controller: Entity) -> Self {
        Self {
            controller,
            center: None,
            zoom: None,
            bearing: None,
            pitch: None,
        }
    }

    /// Fly to a bearing and pitch without moving the center.
    pub fn orient(controller: Entity, bearing: f64, pitch: f64) -> Self {
        Self {
            bearing: Some(bearing),
            pitch: Some(pitch),
            ..Self::new(controller)
        }
    }

    /// The viewport this trigger asks for, starting from `current`.
    pub fn target(&self, current: &ViewportState) -> ViewportState {
        let (longitude, latitude) = self
            .center
            .unwrap_or((current.longitude, current.latitude));
        ViewportState {
            longitude,
            latitude,
            zoom: self.zoom.unwrap_or(current.zoom),
            bearing: self.bearing.unwrap_or(current.bearing),
            pitch: self.pitch.unwrap_or(current.pitch),
            ..*current
        }
    }

    fn receive(
        mut events: EventReader<Self>,
        mut controllers: Query<&mut MapController>,
        mut changed: EventWriter<ViewportChanged>,
        mut redraw: EventWriter<RequestRedraw>,
    ) {
        for event in events.read() {
            let Ok(mut controller) = controllers.get_mut(event.controller) else {
                continue;
            };
            let target = event.target(&controller.current_viewport());
            match controller.animate_to(target) {
                Ok(_) => {
                    // Owners adopt the destination, the animation frames follow.
                    changed.send(ViewportChanged {
                        controller: event.controller,
                        viewport: controller.current_viewport(),
                        cause: ChangeCause::Interaction,
                    });
                    redraw.send(RequestRedraw);
                }
                Err(error) => warn!("Rejected fly-to for {}: {error}", event.controller),
            }
        }
    }
}
