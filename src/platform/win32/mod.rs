//! Win32 + WebView2 backend.

use std::{ffi::c_void, path::Path, time::Duration};

use webview2_com::Microsoft::Web::WebView2::Win32::ICoreWebView2Environment;
use windows::Win32::{
    Foundation::HWND,
    System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED},
};

use super::{
    Renderer, RendererKind, ScreenRect, ShellWindows, SurfacePlatform, TimerId, TimerScheduler,
    WallpaperStore, WindowHandle,
};
use crate::{info, DEBUG_NAME};

pub mod host;
mod shell;
mod timer;
mod wallpaper;
mod webview;

pub use host::{enable_per_monitor_dpi_awareness, pump_pending, Pump};

pub(crate) fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

pub(crate) fn handle(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}

/// Owns the apartment, the watch window and the shared WebView2
/// environment. Must live on the UI thread.
pub struct WinPlatform {
    /// Receives `TaskbarCreated` and owns the reconnect timers.
    watch_window: WindowHandle,
    environment: Option<ICoreWebView2Environment>,
    com_initialized: bool,
}

impl WinPlatform {
    pub fn new() -> Result<Self, String> {
        let com_initialized = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.is_ok();
        host::ensure_host_class()?;

        let watch_window = host::create_watch_window()?;

        Ok(Self {
            watch_window,
            environment: None,
            com_initialized,
        })
    }

    fn environment(&mut self) -> Result<ICoreWebView2Environment, String> {
        if let Some(environment) = &self.environment {
            return Ok(environment.clone());
        }
        let environment = webview::create_environment()?;
        info!("[{DEBUG_NAME}][WEBVIEW] environment ready");
        self.environment = Some(environment.clone());
        Ok(environment)
    }
}

impl Drop for WinPlatform {
    fn drop(&mut self) {
        self.environment = None;
        host::destroy_watch_window(self.watch_window);
        if self.com_initialized {
            unsafe { CoUninitialize() };
        }
    }
}

impl ShellWindows for WinPlatform {
    fn find_top_level(&mut self, class: &str) -> Result<Option<WindowHandle>, String> {
        shell::find_top_level(class)
    }

    fn top_level_windows(&mut self) -> Result<Vec<WindowHandle>, String> {
        shell::top_level_windows()
    }

    fn find_window_after(
        &mut self,
        parent: Option<WindowHandle>,
        after: Option<WindowHandle>,
        class: &str,
    ) -> Result<Option<WindowHandle>, String> {
        shell::find_window_after(parent, after, class)
    }

    fn request_layer(&mut self, progman: WindowHandle, timeout: Duration) -> Result<(), String> {
        shell::request_layer(progman, timeout)
    }

    fn settle(&mut self, delay: Duration) {
        host::pump_for(delay);
    }
}

impl SurfacePlatform for WinPlatform {
    fn virtual_screen(&self) -> ScreenRect {
        host::virtual_screen()
    }

    fn create_surface_window(&mut self, bounds: ScreenRect) -> Result<WindowHandle, String> {
        host::create_surface_window(bounds)
    }

    fn create_renderer(
        &mut self,
        window: WindowHandle,
        kind: RendererKind,
        generation: u64,
    ) -> Result<Box<dyn Renderer>, String> {
        let environment = self.environment()?;
        let renderer = webview::WebViewRenderer::create(&environment, window, kind, generation)?;
        Ok(Box::new(renderer))
    }

    fn reparent(&mut self, window: WindowHandle, parent: WindowHandle) -> Result<(), String> {
        host::reparent(window, parent)
    }

    fn apply_embedded_style(&mut self, window: WindowHandle) -> Result<(), String> {
        host::apply_embedded_style(window)
    }

    fn send_to_bottom(&mut self, window: WindowHandle) -> Result<(), String> {
        host::send_to_bottom(window)
    }

    fn apply_degraded_style(&mut self, window: WindowHandle) -> Result<(), String> {
        host::apply_degraded_style(window)
    }

    fn show(&mut self, window: WindowHandle) -> Result<(), String> {
        host::show(window);
        Ok(())
    }

    fn is_window_alive(&self, window: WindowHandle) -> bool {
        host::is_alive(window)
    }

    fn destroy_window(&mut self, window: WindowHandle) -> Result<(), String> {
        host::destroy(window)
    }

    fn wait(&mut self, delay: Duration) {
        host::pump_for(delay);
    }
}

impl WallpaperStore for WinPlatform {
    fn current_wallpaper(&self) -> Result<Option<String>, String> {
        wallpaper::current_wallpaper()
    }

    fn registry_wallpaper(&self) -> Result<Option<String>, String> {
        wallpaper::registry_wallpaper()
    }

    fn set_fill_style(&mut self) -> Result<(), String> {
        wallpaper::set_fill_style()
    }

    fn set_wallpaper(&mut self, path: &str) -> Result<(), String> {
        wallpaper::set_wallpaper(path)
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

impl TimerScheduler for WinPlatform {
    fn arm_timer(&mut self, interval: Duration) -> Result<TimerId, String> {
        timer::arm(self.watch_window, interval)
    }

    fn disarm_timer(&mut self, id: TimerId) {
        timer::disarm(self.watch_window, id);
    }
}
