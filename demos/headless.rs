//! Drives a map controller without a window: scripted gestures, an animated external update,
//! and a fly-to, with every viewport change logged.

use std::time::Duration;

use bevy_app::{prelude::*, AppExit, ScheduleRunnerPlugin};
use bevy_ecs::prelude::*;
use bevy_log::{prelude::*, LogPlugin};
use bevy_map_controller::{extensions::fly_to::FlyToTrigger, prelude::*};
use bevy_math::prelude::*;
use bevy_time::TimePlugin;

fn main() {
    App::new()
        .add_plugins((
            ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(1.0 / 60.0)),
            TimePlugin,
            LogPlugin::default(),
            DefaultMapControllerPlugins,
        ))
        .add_systems(Startup, setup)
        .add_systems(Update, (script, log_changes))
        .run();
}

#[derive(Resource)]
struct Map(Entity);

fn setup(mut commands: Commands) {
    let viewport = ViewportState::new(1280.0, 720.0, -122.4194, 37.7749, 11.0);
    let props = ViewportProps::new(viewport)
        .with_animation(true)
        .on_interaction_state_change(|state| info!("Dragging: {}", state.is_dragging));
    match MapController::new(props) {
        Ok(controller) => {
            let map = commands.spawn(controller).id();
            commands.insert_resource(Map(map));
        }
        Err(error) => error!("Invalid map configuration: {error}"),
    }
}

fn script(
    mut frame: Local<u32>,
    map: Option<Res<Map>>,
    mut controllers: Query<&mut MapController>,
    mut gestures: EventWriter<MapGesture>,
    mut fly_to: EventWriter<FlyToTrigger>,
    mut exit: EventWriter<AppExit>,
) {
    let Some(map) = map else {
        exit.send(AppExit::error());
        return;
    };
    *frame += 1;
    let mut send = |gesture| {
        gestures.send(MapGesture {
            controller: map.0,
            gesture,
        });
    };
    match *frame {
        1 => send(GestureEvent::pointer_down(Vec2::new(640.0, 360.0))),
        2..=20 => send(GestureEvent::pointer_move(Vec2::new(
            640.0 + 10.0 * *frame as f32,
            360.0,
        ))),
        21 => send(GestureEvent::pointer_up(Vec2::new(840.0, 360.0))),
        30 => send(GestureEvent::wheel(Vec2::new(200.0, 200.0), 240.0)),
        40 => {
            let Ok(mut controller) = controllers.get_mut(map.0) else {
                return;
            };
            let tilted = controller.current_viewport().with_pitch(50.0).with_bearing(-30.0);
            let props = ViewportProps::new(tilted).with_animation(true);
            if let Err(error) = controller.set_props(props) {
                warn!("Rejected props: {error}");
            }
        }
        250 => {
            fly_to.send(FlyToTrigger::orient(map.0, 0.0, 0.0));
        }
        450 => {
            exit.send(AppExit::Success);
        }
        _ => {}
    }
}

fn log_changes(mut changes: EventReader<ViewportChanged>, mut finished: EventReader<AnimationFinished>) {
    for change in changes.read() {
        let viewport = change.viewport;
        info!(
            "{:?}: lng {:.5} lat {:.5} zoom {:.2} bearing {:.1} pitch {:.1}",
            change.cause,
            viewport.longitude,
            viewport.latitude,
            viewport.zoom,
            viewport.bearing,
            viewport.pitch
        );
    }
    for _ in finished.read() {
        info!("Animation finished");
    }
}
