//! The wallpaper session orchestrator.
//!
//! Owns at most one live session. `start` tears the previous one down
//! first, `stop` runs driver, surface and restore as separate failure
//! domains, and every renderer event is checked against the generation of
//! the session that produced it.

use std::{fs, path::PathBuf, time::Instant};

use image::ImageReader;

use crate::{
    error,
    error::{EngineError, EngineResult},
    events::{EngineEvent, PlaybackEvent},
    info,
    media::{MediaConverter, MediaKind, MediaReference, PassthroughConverter, PlaybackOptions},
    paths::default_wallpaper_candidates,
    platform::{Platform, TimerId},
    playback::{DriverState, PlaybackDriver},
    restore::restore_default_wallpaper,
    shell_locator::ShellLocator,
    surface::{FallbackPolicy, Integration, SurfaceHost},
    warn,
    DEBUG_NAME,
};

/// How static images are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaticImageMode {
    /// Hand the file to the OS wallpaper setting; no window is created.
    #[default]
    System,
    Surface,
}

impl StaticImageMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "system" | "os" => Some(Self::System),
            "surface" | "window" => Some(Self::Surface),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub locator: ShellLocator,
    pub fallback: FallbackPolicy,
    pub static_images: StaticImageMode,
    pub default_wallpapers: Vec<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            locator: ShellLocator::default(),
            fallback: FallbackPolicy::default(),
            static_images: StaticImageMode::default(),
            default_wallpapers: default_wallpaper_candidates(),
        }
    }
}

struct ActiveSession {
    media: MediaReference,
    options: PlaybackOptions,
    generation: u64,
    surface: Option<SurfaceHost>,
    driver: Option<PlaybackDriver>,
    integration: Option<Integration>,
    previous_wallpaper: Option<String>,
    /// File handed to the OS wallpaper setting, if any.
    applied_wallpaper: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub source: String,
    pub kind: MediaKind,
    pub generation: u64,
    pub integration: Option<Integration>,
    pub driver_state: Option<DriverState>,
}

pub struct WallpaperSession<P: Platform> {
    platform: P,
    settings: EngineSettings,
    converter: Box<dyn MediaConverter>,
    active: Option<ActiveSession>,
    next_generation: u64,
}

impl<P: Platform> WallpaperSession<P> {
    pub fn new(platform: P, settings: EngineSettings) -> Self {
        Self {
            platform,
            settings,
            converter: Box::new(PassthroughConverter),
            active: None,
            next_generation: 0,
        }
    }

    pub fn with_converter(mut self, converter: Box<dyn MediaConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// Takes effect on the next `start`.
    pub fn update_settings(&mut self, settings: EngineSettings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn start(&mut self, source: &str, options: PlaybackOptions) -> EngineResult<()> {
        let media = MediaReference::classify(source).map_err(|e| {
            warn!("[{DEBUG_NAME}][SESSION] Rejected '{source}': {e}");
            e
        })?;

        if self.active.is_some() {
            if let Err(e) = self.stop() {
                warn!("[{DEBUG_NAME}][SESSION] Previous session did not stop cleanly: {e}");
            }
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let previous_wallpaper = match self.platform.current_wallpaper() {
            Ok(value) => value,
            Err(e) => {
                warn!("[{DEBUG_NAME}][SESSION] Could not read current wallpaper: {e}");
                None
            }
        };

        info!(
            "[{DEBUG_NAME}][SESSION] Starting #{generation}: {} ({})",
            media.source(),
            media.kind()
        );

        let use_system = media.kind() == MediaKind::StaticImage
            && self.settings.static_images == StaticImageMode::System;
        let mut active = if use_system {
            self.start_system_wallpaper(media, options, generation)?
        } else {
            self.start_surface(media, options, generation)?
        };
        active.previous_wallpaper = previous_wallpaper;
        self.active = Some(active);
        Ok(())
    }

    fn start_system_wallpaper(
        &mut self,
        media: MediaReference,
        options: PlaybackOptions,
        generation: u64,
    ) -> EngineResult<ActiveSession> {
        validate_image(media.source())?;

        if let Err(e) = self.platform.set_fill_style() {
            warn!("[{DEBUG_NAME}][SESSION] Could not set fill style: {e}");
        }
        self.platform
            .set_wallpaper(media.source())
            .map_err(|e| EngineError::render_open(media.source(), e))?;

        info!("[{DEBUG_NAME}][SESSION] Applied {} as system wallpaper", media.source());
        let applied = media.source().to_string();
        Ok(ActiveSession {
            media,
            options,
            generation,
            surface: None,
            driver: None,
            integration: None,
            previous_wallpaper: None,
            applied_wallpaper: Some(applied),
        })
    }

    fn start_surface(
        &mut self,
        media: MediaReference,
        options: PlaybackOptions,
        generation: u64,
    ) -> EngineResult<ActiveSession> {
        let playing = self.prepare_media(&media, options)?;

        let mut surface = SurfaceHost::create(&mut self.platform)?;
        let mut driver = PlaybackDriver::for_media(&playing, options);

        match self.bring_up(&mut surface, &mut driver, &playing, generation) {
            Ok(integration) => Ok(ActiveSession {
                media,
                options,
                generation,
                surface: Some(surface),
                driver: Some(driver),
                integration: Some(integration),
                previous_wallpaper: None,
                applied_wallpaper: None,
            }),
            Err(e) => {
                error!("[{DEBUG_NAME}][SESSION] Start of #{generation} failed, rolling back: {e}");
                driver.stop(surface.renderer_mut(), &mut self.platform);
                if let Err(teardown) = surface.destroy(&mut self.platform) {
                    warn!("[{DEBUG_NAME}][SESSION] Rollback teardown failed: {teardown}");
                }
                Err(e)
            }
        }
    }

    /// Validates, converts and checks the file the renderer will open.
    fn prepare_media(
        &self,
        media: &MediaReference,
        options: PlaybackOptions,
    ) -> EngineResult<MediaReference> {
        if matches!(media.kind(), MediaKind::StaticImage | MediaKind::AnimatedImage) {
            validate_image(media.source())?;
        }

        let playing = match media.kind() {
            MediaKind::Video | MediaKind::AnimatedImage => {
                let mute = options.mute || media.kind() == MediaKind::AnimatedImage;
                let output = self
                    .converter
                    .process(media.source(), options.quality, mute)
                    .map_err(EngineError::Conversion)?;
                media.with_source(output.to_string_lossy())
            }
            MediaKind::StaticImage | MediaKind::Stream => media.clone(),
        };

        if playing.kind().is_file_backed() {
            validate_readable(playing.source())?;
        }
        Ok(playing)
    }

    fn bring_up(
        &mut self,
        surface: &mut SurfaceHost,
        driver: &mut PlaybackDriver,
        playing: &MediaReference,
        generation: u64,
    ) -> EngineResult<Integration> {
        surface.attach_renderer(&mut self.platform, playing, generation)?;

        let renderer = surface
            .renderer_mut()
            .ok_or_else(|| EngineError::IntegrationFailed("renderer missing".to_string()))?;
        driver.start(renderer, &mut self.platform)?;

        surface.integrate_with_desktop(
            &mut self.platform,
            &self.settings.locator,
            &self.settings.fallback,
        )
    }

    /// No-op when idle. The surface is always torn down and restoration is
    /// always attempted; the first failure is returned.
    pub fn stop(&mut self) -> EngineResult<()> {
        let Some(mut active) = self.active.take() else {
            return Ok(());
        };
        info!("[{DEBUG_NAME}][SESSION] Stopping #{}", active.generation);

        if let Some(driver) = active.driver.as_mut() {
            let renderer = active.surface.as_mut().and_then(|s| s.renderer_mut());
            driver.stop(renderer, &mut self.platform);
        }

        let mut first_error = None;
        if let Some(surface) = active.surface.as_mut() {
            if let Err(e) = surface.destroy(&mut self.platform) {
                error!("[{DEBUG_NAME}][SESSION] Surface teardown failed: {e}");
                first_error = Some(e);
            }
        }

        if let Err(e) = restore_default_wallpaper(
            &mut self.platform,
            &self.settings.default_wallpapers,
            active.previous_wallpaper.as_deref(),
            active.applied_wallpaper.as_deref(),
        ) {
            error!("[{DEBUG_NAME}][SESSION] {e}");
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Re-runs `start` with the live session's media and options.
    pub fn restart(&mut self) -> EngineResult<()> {
        let Some(active) = self.active.as_ref() else {
            return Ok(());
        };
        let source = active.media.source().to_string();
        let options = active.options;
        info!("[{DEBUG_NAME}][SESSION] Restarting {source}");
        self.start(&source, options)
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Playback { generation, event } => self.on_playback(generation, event),
            EngineEvent::TimerTick(id) => self.on_timer(id),
            EngineEvent::ShellRestarted => self.on_shell_restarted(),
        }
    }

    fn on_playback(&mut self, generation: u64, event: PlaybackEvent) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.generation != generation {
            info!(
                "[{DEBUG_NAME}][SESSION] Dropped {:?} from stale renderer #{generation}",
                event
            );
            return;
        }

        let (Some(driver), Some(surface)) = (active.driver.as_mut(), active.surface.as_mut())
        else {
            return;
        };
        if let Some(renderer) = surface.renderer_mut() {
            driver.on_playback(event, renderer, &mut self.platform);
        }
    }

    fn on_timer(&mut self, id: TimerId) {
        let handled = match self.active.as_mut() {
            Some(ActiveSession {
                driver: Some(driver),
                surface: Some(surface),
                ..
            }) => match surface.renderer_mut() {
                Some(renderer) => driver.on_timer(id, renderer, Instant::now()),
                None => false,
            },
            _ => false,
        };

        if !handled {
            info!("[{DEBUG_NAME}][SESSION] Ignored tick from timer {:?}", id);
        }
    }

    fn on_shell_restarted(&mut self) {
        let has_surface = self.active.as_ref().is_some_and(|a| a.surface.is_some());
        if !has_surface {
            return;
        }

        warn!("[{DEBUG_NAME}][SESSION] Shell restarted, rebuilding the surface");
        if let Err(e) = self.restart() {
            error!("[{DEBUG_NAME}][SESSION] Restart after shell restart failed: {e}");
        }
    }

    /// True when a surface session exists but its window is gone.
    pub fn surface_lost(&self) -> bool {
        self.active
            .as_ref()
            .and_then(|a| a.surface.as_ref())
            .is_some_and(|s| !s.is_alive(&self.platform))
    }

    pub fn status(&self) -> Option<SessionStatus> {
        let active = self.active.as_ref()?;
        Some(SessionStatus {
            source: active.media.source().to_string(),
            kind: active.media.kind(),
            generation: active.generation,
            integration: active.integration,
            driver_state: active.driver.as_ref().map(|d| d.state().clone()),
        })
    }
}

impl<P: Platform> Drop for WallpaperSession<P> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("[{DEBUG_NAME}][SESSION] Stop on drop failed: {e}");
        }
    }
}

/// Sniffs the content as well as the extension so `.apng` and mislabelled
/// files still decode.
fn validate_image(path: &str) -> EngineResult<()> {
    let open_failed = |e: &dyn std::fmt::Display| EngineError::render_open(path, e.to_string());
    let (width, height) = ImageReader::open(path)
        .map_err(|e| open_failed(&e))?
        .with_guessed_format()
        .map_err(|e| open_failed(&e))?
        .into_dimensions()
        .map_err(|e| open_failed(&e))?;
    if width == 0 || height == 0 {
        return Err(EngineError::render_open(path, "image has no pixels"));
    }
    Ok(())
}

fn validate_readable(path: &str) -> EngineResult<()> {
    let metadata = fs::metadata(path).map_err(|e| EngineError::render_open(path, e.to_string()))?;
    if !metadata.is_file() {
        return Err(EngineError::render_open(path, "not a file"));
    }
    fs::File::open(path).map_err(|e| EngineError::render_open(path, e.to_string()))?;
    Ok(())
}
