//! The map controller: input normalization, gesture translation, viewport animation, and the
//! [`MapController`](component::MapController) component tying them together.

pub mod animation;
pub mod component;
pub mod error;
pub mod gestures;
pub mod inputs;
pub mod limits;
pub mod momentum;
pub mod props;
pub mod translator;
pub mod viewport;

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_input::InputSystem;
use bevy_window::{RequestRedraw, WindowEvent};

use component::{AnimationFinished, InteractionStateChanged, MapController, ViewportChanged};
use gestures::MapGesture;
use inputs::InputNormalizer;

/// Adds [`MapController`] functionality to an app.
///
/// Window input reaches a controller once a listener is attached with
/// [`MapInputWorldExt::attach_map_input`](inputs::MapInputWorldExt::attach_map_input).
/// [`MapGesture`] events can also be sent directly.
pub struct MapControllerPlugin;

impl Plugin for MapControllerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<WindowEvent>()
            .add_event::<RequestRedraw>()
            .add_event::<MapGesture>()
            .add_event::<ViewportChanged>()
            .add_event::<InteractionStateChanged>()
            .add_event::<AnimationFinished>()
            .init_resource::<InputNormalizer>()
            .add_systems(
                PreUpdate,
                (
                    InputNormalizer::dispatch,
                    MapController::apply_gestures,
                    MapController::update_controllers,
                    MapController::propagate_live_viewport,
                )
                    .chain()
                    .after(InputSystem),
            )
            .add_observer(MapController::on_remove)
            .register_type::<viewport::ViewportState>()
            .register_type::<limits::ViewportLimits>()
            .register_type::<component::LiveViewport>()
            .register_type::<component::ChangeCause>()
            .register_type::<translator::InteractionState>()
            .register_type::<translator::EnabledGestures>()
            .register_type::<translator::Sensitivity>()
            .register_type::<momentum::Momentum>()
            .register_type::<gestures::GestureEvent>()
            .register_type::<animation::PreemptionStart>();
    }
}
