//! OS seam for the engine.
//!
//! The engine logic lives in platform-neutral modules; everything that
//! touches the window manager, the wallpaper setting or timers goes through
//! these traits. `win32` is the real backend. Platform methods report
//! failures as plain strings and the engine folds them into
//! [`crate::error::EngineError`] kinds.

use std::{path::Path, time::Duration};

use crate::{events::PageCommand, media::MediaKind};

#[cfg(windows)]
pub mod win32;

/// Opaque OS window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub isize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub usize);

/// Bounding rectangle of the virtual screen (all monitors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// Rendering element installed into a surface window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    Image,
    VideoFrame,
    Web,
}

impl RendererKind {
    pub fn for_media(kind: MediaKind) -> Self {
        match kind {
            MediaKind::StaticImage | MediaKind::AnimatedImage => Self::Image,
            MediaKind::Video => Self::VideoFrame,
            MediaKind::Stream => Self::Web,
        }
    }
}

/// What a renderer should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub kind: MediaKind,
    pub source: String,
    pub muted: bool,
    /// Looping handled inside the page instead of by the driver. Only
    /// streams use this.
    pub loop_in_page: bool,
}

pub trait Renderer {
    fn load(&mut self, request: &RenderRequest) -> Result<(), String>;
    fn command(&mut self, command: PageCommand) -> Result<(), String>;
}

/// Window-tree queries used to find the desktop layer.
pub trait ShellWindows {
    /// `Ok(None)` means no such window; `Err` is reserved for fatal
    /// conditions (access denied, handle exhaustion).
    fn find_top_level(&mut self, class: &str) -> Result<Option<WindowHandle>, String>;
    fn top_level_windows(&mut self) -> Result<Vec<WindowHandle>, String>;
    /// `parent == None` searches top-level windows; `after` starts the
    /// search after that window in Z-order.
    fn find_window_after(
        &mut self,
        parent: Option<WindowHandle>,
        after: Option<WindowHandle>,
        class: &str,
    ) -> Result<Option<WindowHandle>, String>;
    /// Sends the private "spawn background layer" message to the shell.
    fn request_layer(&mut self, progman: WindowHandle, timeout: Duration) -> Result<(), String>;
    /// Waits without starving the UI thread's message queue.
    fn settle(&mut self, delay: Duration);
}

pub trait SurfacePlatform {
    fn virtual_screen(&self) -> ScreenRect;
    fn create_surface_window(&mut self, bounds: ScreenRect) -> Result<WindowHandle, String>;
    fn create_renderer(
        &mut self,
        window: WindowHandle,
        kind: RendererKind,
        generation: u64,
    ) -> Result<Box<dyn Renderer>, String>;
    fn reparent(&mut self, window: WindowHandle, parent: WindowHandle) -> Result<(), String>;
    /// Child style, mouse transparency, hidden from the task switcher.
    fn apply_embedded_style(&mut self, window: WindowHandle) -> Result<(), String>;
    fn send_to_bottom(&mut self, window: WindowHandle) -> Result<(), String>;
    /// Layered + mouse transparent + tool window, for top-level fallback.
    fn apply_degraded_style(&mut self, window: WindowHandle) -> Result<(), String>;
    fn show(&mut self, window: WindowHandle) -> Result<(), String>;
    fn is_window_alive(&self, window: WindowHandle) -> bool;
    fn destroy_window(&mut self, window: WindowHandle) -> Result<(), String>;
    fn wait(&mut self, delay: Duration);
}

/// The system desktop wallpaper setting and its registry companions.
pub trait WallpaperStore {
    fn current_wallpaper(&self) -> Result<Option<String>, String>;
    fn registry_wallpaper(&self) -> Result<Option<String>, String>;
    /// Writes `WallpaperStyle=10` (fill) and `TileWallpaper=0`.
    fn set_fill_style(&mut self) -> Result<(), String>;
    /// An empty path clears the wallpaper.
    fn set_wallpaper(&mut self, path: &str) -> Result<(), String>;
    fn path_exists(&self, path: &Path) -> bool;
}

/// Periodic UI-thread timers. Ticks arrive as
/// [`crate::events::EngineEvent::TimerTick`].
pub trait TimerScheduler {
    /// Ids are never reused within a process, so a tick that was already
    /// queued when its timer was disarmed matches nothing afterwards.
    fn arm_timer(&mut self, interval: Duration) -> Result<TimerId, String>;
    fn disarm_timer(&mut self, id: TimerId);
}

pub trait Platform: ShellWindows + SurfacePlatform + WallpaperStore + TimerScheduler {}

impl<T> Platform for T where T: ShellWindows + SurfacePlatform + WallpaperStore + TimerScheduler {}
