//! The full-virtual-screen window that displays the wallpaper.

use std::time::Duration;

use crate::{
    error::{EngineError, EngineResult},
    info,
    media::MediaReference,
    platform::{Renderer, RendererKind, ScreenRect, ShellWindows, SurfacePlatform, WindowHandle},
    shell_locator::{DesktopLayer, ShellLocator},
    warn,
    DEBUG_NAME,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// Hidden window, no renderer.
    Created,
    Ready,
    Embedded(WindowHandle),
    Degraded,
    Closed,
}

/// Where the surface ended up after integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    Embedded(WindowHandle),
    /// Bottom-most top-level window; it may flicker over the icons.
    Degraded,
}

/// Top-level fallback used when the surface cannot live in the desktop layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            interval: Duration::from_millis(50),
        }
    }
}

pub struct SurfaceHost {
    window: WindowHandle,
    bounds: ScreenRect,
    state: SurfaceState,
    renderer: Option<Box<dyn Renderer>>,
}

impl SurfaceHost {
    /// Creates the hidden host window at the virtual-screen origin.
    pub fn create<P>(platform: &mut P) -> EngineResult<Self>
    where
        P: SurfacePlatform + ?Sized,
    {
        let bounds = platform.virtual_screen();
        let window = platform
            .create_surface_window(bounds)
            .map_err(|e| EngineError::IntegrationFailed(format!("create surface window: {e}")))?;

        info!(
            "[{DEBUG_NAME}][SURFACE] Created surface {:?} at ({}, {}) {}x{}",
            window, bounds.left, bounds.top, bounds.width, bounds.height
        );

        Ok(Self {
            window,
            bounds,
            state: SurfaceState::Created,
            renderer: None,
        })
    }

    pub fn attach_renderer<P>(
        &mut self,
        platform: &mut P,
        media: &MediaReference,
        generation: u64,
    ) -> EngineResult<()>
    where
        P: SurfacePlatform + ?Sized,
    {
        if self.state != SurfaceState::Created {
            return Err(EngineError::IntegrationFailed(format!(
                "renderer attach in state {:?}",
                self.state
            )));
        }

        let renderer_kind = RendererKind::for_media(media.kind());
        let renderer = platform
            .create_renderer(self.window, renderer_kind, generation)
            .map_err(|e| EngineError::render_open(media.source(), e))?;

        self.renderer = Some(renderer);
        self.state = SurfaceState::Ready;
        info!("[{DEBUG_NAME}][SURFACE] Attached {:?} renderer", renderer_kind);
        Ok(())
    }

    pub fn renderer_mut(&mut self) -> Option<&mut dyn Renderer> {
        match self.renderer.as_mut() {
            Some(renderer) => Some(renderer.as_mut()),
            None => None,
        }
    }

    /// Embeds into the desktop layer, or falls back to a bottom-most
    /// top-level window. Degrading is a warning, not an error.
    pub fn integrate_with_desktop<P>(
        &mut self,
        platform: &mut P,
        locator: &ShellLocator,
        fallback: &FallbackPolicy,
    ) -> EngineResult<Integration>
    where
        P: ShellWindows + SurfacePlatform + ?Sized,
    {
        if self.state != SurfaceState::Ready {
            return Err(EngineError::IntegrationFailed(format!(
                "integration in state {:?}",
                self.state
            )));
        }

        let layer = locator.acquire_desktop_layer(platform)?;
        if let DesktopLayer::Found(layer) = layer {
            match self.embed(platform, layer) {
                Ok(()) => {
                    self.state = SurfaceState::Embedded(layer);
                    info!("[{DEBUG_NAME}][SURFACE] Embedded into desktop layer {:?}", layer);
                    return Ok(Integration::Embedded(layer));
                }
                Err(e) => warn!("[{DEBUG_NAME}][SURFACE] Reparent into {:?} failed: {e}", layer),
            }
        }

        self.degrade(platform, fallback, layer)?;
        self.state = SurfaceState::Degraded;
        warn!("[{DEBUG_NAME}][SURFACE] Running degraded as a bottom-most window");
        Ok(Integration::Degraded)
    }

    fn embed<P>(&mut self, platform: &mut P, layer: WindowHandle) -> Result<(), String>
    where
        P: SurfacePlatform + ?Sized,
    {
        platform.reparent(self.window, layer)?;
        if let Err(e) = platform.apply_embedded_style(self.window) {
            warn!("[{DEBUG_NAME}][SURFACE] Embedded style not fully applied: {e}");
        }
        platform.show(self.window)
    }

    fn degrade<P>(
        &mut self,
        platform: &mut P,
        fallback: &FallbackPolicy,
        layer: DesktopLayer,
    ) -> EngineResult<()>
    where
        P: SurfacePlatform + ?Sized,
    {
        if let Err(e) = platform.show(self.window) {
            warn!("[{DEBUG_NAME}][SURFACE] Show failed: {e}");
        }

        let mut applied = 0;
        let mut last_error = String::new();
        for attempt in 0..fallback.attempts.max(1) {
            if attempt > 0 {
                platform.wait(fallback.interval);
            }

            let result = platform
                .send_to_bottom(self.window)
                .and_then(|_| platform.apply_degraded_style(self.window));
            match result {
                Ok(()) => applied += 1,
                Err(e) => {
                    warn!("[{DEBUG_NAME}][SURFACE] Fallback attempt {} failed: {e}", attempt + 1);
                    last_error = e;
                }
            }
        }

        if applied > 0 {
            return Ok(());
        }

        match layer {
            DesktopLayer::NotFound => Err(EngineError::LayerNotFound),
            DesktopLayer::Found(_) => Err(EngineError::IntegrationFailed(last_error)),
        }
    }

    /// Idempotent. The renderer is dropped before the window goes away.
    pub fn destroy<P>(&mut self, platform: &mut P) -> EngineResult<()>
    where
        P: SurfacePlatform + ?Sized,
    {
        if self.state == SurfaceState::Closed {
            return Ok(());
        }

        self.renderer = None;
        self.state = SurfaceState::Closed;

        if !platform.is_window_alive(self.window) {
            info!("[{DEBUG_NAME}][SURFACE] Surface {:?} already gone", self.window);
            return Ok(());
        }

        platform
            .destroy_window(self.window)
            .map_err(|e| EngineError::IntegrationFailed(format!("destroy surface: {e}")))?;
        info!("[{DEBUG_NAME}][SURFACE] Destroyed surface {:?}", self.window);
        Ok(())
    }

    pub fn is_alive<P>(&self, platform: &P) -> bool
    where
        P: SurfacePlatform + ?Sized,
    {
        self.state != SurfaceState::Closed && platform.is_window_alive(self.window)
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn window(&self) -> WindowHandle {
        self.window
    }

    pub fn bounds(&self) -> ScreenRect {
        self.bounds
    }
}
