//! [`ViewportProps`], everything a [`MapController`](super::component::MapController) is
//! configured with.

use std::sync::Arc;

use bevy_window::SystemCursorIcon;

use super::{
    animation::AnimationSettings,
    error::ConfigurationError,
    limits::ViewportLimits,
    momentum::Momentum,
    translator::{EnabledGestures, InteractionState, Sensitivity},
    viewport::ViewportState,
};

/// Called with every committed viewport.
pub type ViewportCallback = Arc<dyn Fn(&ViewportState) + Send + Sync>;

/// Called when a drag starts or ends.
pub type InteractionCallback = Arc<dyn Fn(&InteractionState) + Send + Sync>;

/// Picks the cursor to show for an interaction state.
pub type CursorAccessor = Arc<dyn Fn(&InteractionState) -> SystemCursorIcon + Send + Sync>;

/// The default cursor: an open hand, closed while dragging.
pub fn default_cursor(state: &InteractionState) -> SystemCursorIcon {
    if state.is_dragging {
        SystemCursorIcon::Grabbing
    } else {
        SystemCursorIcon::Grab
    }
}

/// Configuration of a map controller, supplied when it is created and again on every external
/// update.
///
/// # Example
///
/// ```
/// # use bevy_map_controller::prelude::*;
/// let props = ViewportProps::new(ViewportState::new(800.0, 600.0, -122.4, 37.8, 11.0))
///     .with_limits(ViewportLimits { max_zoom: 16.0, ..Default::default() })
///     .with_animation(true)
///     .on_viewport_change(|viewport| println!("zoom {}", viewport.zoom));
/// assert!(props.validate().is_ok());
/// ```
#[derive(Clone, Default)]
pub struct ViewportProps {
    /// The requested camera state.
    pub viewport: ViewportState,
    /// Zoom and pitch bounds.
    pub limits: ViewportLimits,
    /// Which gestures are honored.
    pub gestures: EnabledGestures,
    /// Input sensitivity.
    pub sensitivity: Sensitivity,
    /// Pan momentum after release.
    pub momentum: Momentum,
    /// Should changes to pitch or bearing in later props be animated?
    pub animate_viewport: bool,
    /// Animation tuning.
    pub animation: AnimationSettings,
    /// Called after every committed change, from gestures or animation frames.
    pub on_viewport_change: Option<ViewportCallback>,
    /// Called when dragging starts or stops.
    pub on_interaction_state_change: Option<InteractionCallback>,
    /// Cursor for an interaction state. Falls back to [`default_cursor`].
    pub get_cursor: Option<CursorAccessor>,
}

impl ViewportProps {
    /// Props for `viewport` with every other setting at its default.
    pub fn new(viewport: ViewportState) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }

    /// Replace the viewport, keeping every other setting.
    #[must_use = "with_viewport returns modified ViewportProps"]
    pub fn with_viewport(self, viewport: ViewportState) -> Self {
        Self { viewport, ..self }
    }

    /// Set zoom and pitch bounds.
    #[must_use = "with_limits returns modified ViewportProps"]
    pub fn with_limits(self, limits: ViewportLimits) -> Self {
        Self { limits, ..self }
    }

    /// Set which gestures are honored.
    #[must_use = "with_gestures returns modified ViewportProps"]
    pub fn with_gestures(self, gestures: EnabledGestures) -> Self {
        Self { gestures, ..self }
    }

    /// Set input sensitivity.
    #[must_use = "with_sensitivity returns modified ViewportProps"]
    pub fn with_sensitivity(self, sensitivity: Sensitivity) -> Self {
        Self {
            sensitivity,
            ..self
        }
    }

    /// Set pan momentum.
    #[must_use = "with_momentum returns modified ViewportProps"]
    pub fn with_momentum(self, momentum: Momentum) -> Self {
        Self { momentum, ..self }
    }

    /// Enable or disable animation of pitch and bearing changes.
    #[must_use = "with_animation returns modified ViewportProps"]
    pub fn with_animation(self, animate_viewport: bool) -> Self {
        Self {
            animate_viewport,
            ..self
        }
    }

    /// Set animation tuning.
    #[must_use = "with_animation_settings returns modified ViewportProps"]
    pub fn with_animation_settings(self, animation: AnimationSettings) -> Self {
        Self { animation, ..self }
    }

    /// Set the viewport change callback.
    #[must_use = "on_viewport_change returns modified ViewportProps"]
    pub fn on_viewport_change<F>(self, f: F) -> Self
    where
        F: Fn(&ViewportState) + Send + Sync + 'static,
    {
        Self {
            on_viewport_change: Some(Arc::new(f)),
            ..self
        }
    }

    /// Set the interaction state callback.
    #[must_use = "on_interaction_state_change returns modified ViewportProps"]
    pub fn on_interaction_state_change<F>(self, f: F) -> Self
    where
        F: Fn(&InteractionState) + Send + Sync + 'static,
    {
        Self {
            on_interaction_state_change: Some(Arc::new(f)),
            ..self
        }
    }

    /// Set the cursor accessor.
    #[must_use = "with_cursor returns modified ViewportProps"]
    pub fn with_cursor<F>(self, f: F) -> Self
    where
        F: Fn(&InteractionState) -> SystemCursorIcon + Send + Sync + 'static,
    {
        Self {
            get_cursor: Some(Arc::new(f)),
            ..self
        }
    }

    /// Check the viewport, limits, and animation timing.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.viewport.validate()?;
        self.limits.validate()?;
        if !(self.animation.step.is_finite() && self.animation.step > 0.0) {
            return Err(ConfigurationError::InvalidAnimationStep(
                self.animation.step,
            ));
        }
        if self.animation.interval.is_zero() {
            return Err(ConfigurationError::InvalidAnimationInterval);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ViewportProps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let callback = |present: bool| if present { "Some(<function>)" } else { "None" };
        f.debug_struct("ViewportProps")
            .field("viewport", &self.viewport)
            .field("limits", &self.limits)
            .field("gestures", &self.gestures)
            .field("sensitivity", &self.sensitivity)
            .field("momentum", &self.momentum)
            .field("animate_viewport", &self.animate_viewport)
            .field("animation", &self.animation)
            .field(
                "on_viewport_change",
                &callback(self.on_viewport_change.is_some()),
            )
            .field(
                "on_interaction_state_change",
                &callback(self.on_interaction_state_change.is_some()),
            )
            .field("get_cursor", &callback(self.get_cursor.is_some()))
            .finish()
    }
}
