//! A map viewport controller for Bevy.
//!
//! Turns mouse, touch, trackpad, and keyboard input into pans, zooms, rotations, and pitch
//! changes of a Web-Mercator map viewport, and animates externally requested changes of pitch
//! and bearing.
//!
//! ## Overview
//!
//! - Attach window input to a controller with
//!   [`MapInputWorldExt::attach_map_input`](controller::inputs::MapInputWorldExt). The
//!   [`InputNormalizer`](controller::inputs::InputNormalizer) converts raw events into
//!   [`GestureEvent`](controller::gestures::GestureEvent)s.
//! - The [`MapController`](controller::component::MapController) component owns the canonical
//!   [`ViewportState`](controller::viewport::ViewportState). It commits gestures, clamped to
//!   the [`ViewportLimits`](controller::limits::ViewportLimits), and reports every change with
//!   a [`ViewportChanged`](controller::component::ViewportChanged) event and the
//!   `on_viewport_change` callback.
//! - External updates go through [`MapController::set_props`](controller::component::MapController::set_props),
//!   as in a controlled component. Pitch and bearing changes can be animated on a fixed 50 ms
//!   tick.
//! - Entities subscribed to a controller receive the displayed viewport, including every
//!   animation frame, in their [`LiveViewport`](controller::component::LiveViewport) component.
//!
//! ## Controlled usage
//!
//! Feed back viewports from [`ChangeCause::Interaction`](controller::component::ChangeCause)
//! events only. Animation frames describe what is on screen, the canonical state already holds
//! the animation's destination.

pub mod controller;
pub mod extensions;

/// Common imports.
pub mod prelude {
    pub use crate::{
        controller::{
            animation::{AnimationSettings, Easing, PreemptionStart},
            component::{
                AnimationFinished, ChangeCause, InteractionStateChanged, LiveViewport,
                MapController, ViewportChanged,
            },
            error::ConfigurationError,
            gestures::{GestureEvent, GestureKind, MapGesture, Modifiers, PointerButton},
            inputs::{InputNormalizer, InputOptions, ListenerHandle, MapInputWorldExt},
            limits::ViewportLimits,
            momentum::Momentum,
            props::ViewportProps,
            translator::{ActiveGesture, EnabledGestures, InteractionState, Sensitivity},
            viewport::ViewportState,
            MapControllerPlugin,
        },
        DefaultMapControllerPlugins,
    };
}

/// Adds the map controller and all enabled extensions.
pub struct DefaultMapControllerPlugins;

impl bevy_app::PluginGroup for DefaultMapControllerPlugins {
    fn build(self) -> bevy_app::PluginGroupBuilder {
        #[allow(unused_mut)]
        let mut group = bevy_app::PluginGroupBuilder::start::<Self>()
            .add(crate::controller::MapControllerPlugin);

        #[cfg(feature = "extension_camera_sync")]
        {
            group = group.add(crate::extensions::camera_sync::CameraSyncPlugin);
        }

        #[cfg(feature = "extension_fly_to")]
        {
            group = group.add(crate::extensions::fly_to::FlyToPlugin);
        }

        group
    }
}
