use std::time::Duration;

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_input::{
    mouse::{MouseButton, MouseButtonInput},
    ButtonState,
};
use bevy_map_controller::prelude::*;
use bevy_math::prelude::*;
use bevy_time::{TimePlugin, TimeUpdateStrategy};
use bevy_window::{CursorMoved, Window, WindowDestroyed, WindowEvent};

const FRAME: Duration = Duration::from_millis(50);

#[derive(Resource, Default)]
struct Recorded {
    changes: Vec<ViewportChanged>,
    interaction: Vec<InteractionStateChanged>,
    finished: Vec<AnimationFinished>,
}

fn record(
    mut recorded: ResMut<Recorded>,
    mut changes: EventReader<ViewportChanged>,
    mut interaction: EventReader<InteractionStateChanged>,
    mut finished: EventReader<AnimationFinished>,
) {
    recorded.changes.extend(changes.read().copied());
    recorded.interaction.extend(interaction.read().copied());
    recorded.finished.extend(finished.read().copied());
}

fn app() -> App {
    let mut app = App::new();
    app.add_plugins((TimePlugin, MapControllerPlugin))
        .insert_resource(TimeUpdateStrategy::ManualDuration(FRAME))
        .init_resource::<Recorded>()
        .add_systems(Update, record);
    // The first update has no time delta.
    app.update();
    app
}

fn initial() -> ViewportState {
    ViewportState::new(800.0, 600.0, -122.4, 37.8, 10.0)
}

fn props(viewport: ViewportState) -> ViewportProps {
    ViewportProps::new(viewport)
        .with_animation(true)
        .with_momentum(Momentum::disabled())
}

fn spawn_controller(app: &mut App, subscriber: Option<Entity>) -> Entity {
    let mut controller = MapController::new(props(initial())).unwrap();
    if let Some(subscriber) = subscriber {
        controller.subscribe(subscriber);
    }
    app.world_mut().spawn(controller).id()
}

fn controller(app: &mut App, entity: Entity) -> Mut<MapController> {
    app.world_mut().get_mut::<MapController>(entity).unwrap()
}

fn recorded(app: &App) -> &Recorded {
    app.world().resource::<Recorded>()
}

fn gesture(app: &mut App, controller: Entity, gesture: GestureEvent) {
    app.world_mut().send_event(MapGesture {
        controller,
        gesture,
    });
}

#[test]
fn external_pitch_and_bearing_change_is_animated() {
    let mut app = app();
    let subscriber = app.world_mut().spawn_empty().id();
    let entity = spawn_controller(&mut app, Some(subscriber));
    app.update();
    assert_eq!(
        app.world().get::<LiveViewport>(subscriber).map(|live| live.0),
        Some(initial())
    );

    let end = initial().with_pitch(60.0).with_bearing(90.0);
    assert!(controller(&mut app, entity).set_props(props(end)).unwrap());

    let mut live_pitches = Vec::new();
    for _ in 0..60 {
        app.update();
        if let Some(live) = app.world().get::<LiveViewport>(subscriber) {
            live_pitches.push(live.pitch);
        }
    }

    let frames: Vec<_> = recorded(&app)
        .changes
        .iter()
        .filter(|change| change.cause == ChangeCause::Animation)
        .map(|change| change.viewport)
        .collect();
    assert!((45..=55).contains(&frames.len()), "{} frames", frames.len());
    assert_eq!(frames[0].pitch, 0.0);
    assert!(frames.windows(2).all(|w| w[0].pitch <= w[1].pitch));
    assert!(frames.windows(2).all(|w| w[0].bearing <= w[1].bearing));
    assert_eq!(*frames.last().unwrap(), end);
    assert_eq!(recorded(&app).finished.len(), 1);

    assert!(live_pitches.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(live_pitches.last(), Some(&60.0));
    assert!(!controller(&mut app, entity).is_animating());
    assert_eq!(
        app.world().get::<LiveViewport>(subscriber).map(|live| live.0),
        Some(end)
    );
}

#[test]
fn dragging_is_reported_on_edges_only() {
    let mut app = app();
    let entity = spawn_controller(&mut app, None);

    gesture(&mut app, entity, GestureEvent::pointer_down(Vec2::new(100.0, 100.0)));
    for x in 1..=5 {
        gesture(
            &mut app,
            entity,
            GestureEvent::pointer_move(Vec2::new(100.0 + 10.0 * x as f32, 100.0)),
        );
    }
    gesture(&mut app, entity, GestureEvent::pointer_up(Vec2::new(150.0, 100.0)));
    app.update();

    let recorded = recorded(&app);
    let edges: Vec<_> = recorded
        .interaction
        .iter()
        .map(|change| change.state.is_dragging)
        .collect();
    assert_eq!(edges, vec![true, false]);
    assert_eq!(recorded.changes.len(), 5);
    assert!(recorded
        .changes
        .iter()
        .all(|change| change.cause == ChangeCause::Interaction));
    assert!(recorded.changes.windows(2).all(|w| w[0].viewport.longitude > w[1].viewport.longitude));
}

#[test]
fn wheel_zoom_stops_at_the_limit() {
    let mut app = app();
    let entity = app
        .world_mut()
        .spawn(MapController::new(props(ViewportState { zoom: 19.5, ..initial() })).unwrap())
        .id();
    gesture(&mut app, entity, GestureEvent::wheel(Vec2::new(400.0, 300.0), 1_000.0));
    app.update();
    assert_eq!(controller(&mut app, entity).current_viewport().zoom, 20.0);
    assert_eq!(recorded(&app).changes[0].viewport.zoom, 20.0);
}

fn cursor(window: Entity, position: Vec2) -> WindowEvent {
    WindowEvent::CursorMoved(CursorMoved {
        window,
        position,
        delta: None,
    })
}

fn left_button(window: Entity, state: ButtonState) -> WindowEvent {
    WindowEvent::MouseButtonInput(MouseButtonInput {
        button: MouseButton::Left,
        state,
        window,
    })
}

fn start_window_drag(app: &mut App) -> (Entity, Entity, ListenerHandle) {
    let window = app.world_mut().spawn(Window::default()).id();
    let entity = spawn_controller(app, None);
    let handle = app
        .world_mut()
        .attach_map_input(window, entity, InputOptions::default())
        .unwrap();

    app.world_mut().send_event(cursor(window, Vec2::new(400.0, 300.0)));
    app.world_mut()
        .send_event(left_button(window, ButtonState::Pressed));
    app.world_mut().send_event(cursor(window, Vec2::new(450.0, 300.0)));
    app.update();
    assert!(controller(app, entity).interaction().is_dragging);
    assert_eq!(recorded(app).changes.len(), 1);
    (window, entity, handle)
}

#[test]
fn detaching_during_a_drag_ends_it() {
    let mut app = app();
    let (window, entity, handle) = start_window_drag(&mut app);
    let dragged = controller(&mut app, entity).current_viewport();

    assert!(app.world_mut().detach_map_input(handle));
    assert!(!app.world_mut().detach_map_input(handle));
    assert!(!controller(&mut app, entity).interaction().is_dragging);

    app.world_mut().send_event(cursor(window, Vec2::new(600.0, 300.0)));
    app.update();
    assert_eq!(controller(&mut app, entity).current_viewport(), dragged);
    let recorded = recorded(&app);
    assert_eq!(recorded.changes.len(), 1);
    assert_eq!(
        recorded.interaction.last().map(|change| change.state.is_dragging),
        Some(false)
    );
}

#[test]
fn destroyed_window_releases_its_drag() {
    let mut app = app();
    let (window, entity, handle) = start_window_drag(&mut app);

    app.world_mut()
        .send_event(WindowEvent::WindowDestroyed(WindowDestroyed { window }));
    app.update();
    assert!(!controller(&mut app, entity).interaction().is_dragging);
    assert!(!app.world().resource::<InputNormalizer>().is_attached(handle));
}

#[test]
fn removing_the_controller_detaches_its_input() {
    let mut app = app();
    let (_, entity, handle) = start_window_drag(&mut app);
    app.world_mut().entity_mut(entity).remove::<MapController>();
    assert!(!app.world().resource::<InputNormalizer>().is_attached(handle));
    app.update();
}

#[test]
fn attach_validates_its_arguments() {
    let mut app = app();
    let entity = spawn_controller(&mut app, None);
    let not_a_window = app.world_mut().spawn_empty().id();
    assert_eq!(
        app.world_mut()
            .attach_map_input(not_a_window, entity, InputOptions::default()),
        Err(ConfigurationError::InvalidSurface(not_a_window))
    );

    let window = app.world_mut().spawn(Window::default()).id();
    assert_eq!(
        app.world_mut()
            .attach_map_input(window, not_a_window, InputOptions::default()),
        Err(ConfigurationError::UnknownController(not_a_window))
    );
}

#[test]
fn gesture_during_animation_wins() {
    let mut app = app();
    let entity = spawn_controller(&mut app, None);
    controller(&mut app, entity)
        .set_props(props(initial().with_pitch(60.0)))
        .unwrap();
    for _ in 0..5 {
        app.update();
    }
    assert!(controller(&mut app, entity).is_animating());

    gesture(&mut app, entity, GestureEvent::wheel(Vec2::new(400.0, 300.0), 120.0));
    app.update();
    let controller = controller(&mut app, entity);
    assert!(!controller.is_animating());
    assert_eq!(controller.displayed_viewport().pitch, 60.0);
    assert!((controller.displayed_viewport().zoom - 10.5).abs() < 1e-9);
}
