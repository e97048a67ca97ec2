//! Live desktop wallpaper engine.
//!
//! Plays an image, video, animated image or network stream behind the
//! desktop icons and restores a regular wallpaper when it stops.

pub const APP_NAME: &str = "LiveWallpaper";
pub const DEBUG_NAME: &str = "LIVEWALL";

pub mod logging;

pub mod bootstrap;
pub mod classifier;
pub mod data_loaders;
pub mod error;
pub mod events;
pub mod media;
pub mod pages;
pub mod paths;
pub mod platform;
pub mod playback;
pub mod reconnect;
pub mod restore;
pub mod session;
pub mod shell_locator;
pub mod surface;
pub mod utility;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{EngineError, EngineResult};
pub use media::{MediaKind, MediaReference, PlaybackOptions, Quality};
pub use session::{EngineSettings, StaticImageMode, WallpaperSession};
