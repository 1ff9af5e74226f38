//! Optional extensions to the base map controller.

#[cfg(feature = "extension_camera_sync")]
pub mod camera_sync;
#[cfg(feature = "extension_fly_to")]
pub mod fly_to;
