//! Per-kind playback control.
//!
//! Each media kind has its own handler; the driver is a closed enum so a new
//! kind cannot be added without deciding its loop, mute and failure rules.

use std::time::{Duration, Instant};

use crate::{
    error,
    error::{EngineError, EngineResult},
    events::{PageCommand, PlaybackEvent},
    info,
    media::{MediaKind, MediaReference, PlaybackOptions},
    platform::{RenderRequest, Renderer, TimerId, TimerScheduler},
    reconnect::{ReconnectState, ReconnectWatcher, RECONNECT_INTERVAL},
    warn,
    DEBUG_NAME,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Opening,
    Playing,
    /// Showing the last frame after a non-looping end of media.
    Holding,
    Reconnecting,
    Stopped,
    Failed(String),
}

pub enum PlaybackDriver {
    StaticImage(StillImage),
    AnimatedImage(LoopingMedia),
    Video(LoopingMedia),
    Stream(LiveStream),
}

impl PlaybackDriver {
    pub fn for_media(media: &MediaReference, options: PlaybackOptions) -> Self {
        match media.kind() {
            MediaKind::StaticImage => Self::StaticImage(StillImage::new(media.clone())),
            MediaKind::AnimatedImage => {
                Self::AnimatedImage(LoopingMedia::new(media.clone(), options))
            }
            MediaKind::Video => Self::Video(LoopingMedia::new(media.clone(), options)),
            MediaKind::Stream => Self::Stream(LiveStream::new(media.clone(), options)),
        }
    }

    pub fn start<T>(&mut self, renderer: &mut dyn Renderer, timers: &mut T) -> EngineResult<()>
    where
        T: TimerScheduler + ?Sized,
    {
        match self {
            Self::StaticImage(driver) => driver.start(renderer),
            Self::AnimatedImage(driver) | Self::Video(driver) => driver.start(renderer),
            Self::Stream(driver) => {
                driver.start(renderer, timers);
                Ok(())
            }
        }
    }

    /// Best effort: disarms timers and clears the renderer. Safe to repeat.
    pub fn stop<T>(&mut self, renderer: Option<&mut dyn Renderer>, timers: &mut T)
    where
        T: TimerScheduler + ?Sized,
    {
        if let Self::Stream(driver) = self {
            if let Some(state) = driver.watcher.disarm(timers) {
                info!(
                    "[{DEBUG_NAME}][PLAYBACK] Reconnect timer disarmed after {} attempt(s)",
                    state.attempt_count
                );
            }
        }

        let state = self.state_mut();
        if *state == DriverState::Stopped {
            return;
        }
        *state = DriverState::Stopped;

        if let Some(renderer) = renderer {
            if let Err(e) = renderer.command(PageCommand::Clear) {
                warn!("[{DEBUG_NAME}][PLAYBACK] Renderer clear failed: {e}");
            }
        }
    }

    pub fn on_playback<T>(
        &mut self,
        event: PlaybackEvent,
        renderer: &mut dyn Renderer,
        timers: &mut T,
    ) where
        T: TimerScheduler + ?Sized,
    {
        if *self.state() == DriverState::Stopped {
            return;
        }

        match self {
            Self::StaticImage(driver) => driver.on_event(event),
            Self::AnimatedImage(driver) | Self::Video(driver) => driver.on_event(event, renderer),
            Self::Stream(driver) => driver.on_event(event, timers),
        }
    }

    /// Returns `true` when the tick belonged to this driver.
    pub fn on_timer(&mut self, id: TimerId, renderer: &mut dyn Renderer, now: Instant) -> bool {
        match self {
            Self::Stream(driver) => driver.on_tick(id, renderer, now),
            _ => false,
        }
    }

    pub fn state(&self) -> &DriverState {
        match self {
            Self::StaticImage(driver) => &driver.state,
            Self::AnimatedImage(driver) | Self::Video(driver) => &driver.state,
            Self::Stream(driver) => &driver.state,
        }
    }

    fn state_mut(&mut self) -> &mut DriverState {
        match self {
            Self::StaticImage(driver) => &mut driver.state,
            Self::AnimatedImage(driver) | Self::Video(driver) => &mut driver.state,
            Self::Stream(driver) => &mut driver.state,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Self::StaticImage(_) => MediaKind::StaticImage,
            Self::AnimatedImage(_) => MediaKind::AnimatedImage,
            Self::Video(_) => MediaKind::Video,
            Self::Stream(_) => MediaKind::Stream,
        }
    }

    pub fn reconnect_state(&self) -> Option<&ReconnectState> {
        match self {
            Self::Stream(driver) => driver.watcher.state(),
            _ => None,
        }
    }
}

pub struct StillImage {
    media: MediaReference,
    state: DriverState,
}

impl StillImage {
    fn new(media: MediaReference) -> Self {
        Self {
            media,
            state: DriverState::Idle,
        }
    }

    fn start(&mut self, renderer: &mut dyn Renderer) -> EngineResult<()> {
        let request = RenderRequest {
            kind: MediaKind::StaticImage,
            source: self.media.source().to_string(),
            muted: true,
            loop_in_page: false,
        };
        renderer
            .load(&request)
            .map_err(|e| EngineError::render_open(self.media.source(), e))?;
        self.state = DriverState::Opening;
        Ok(())
    }

    fn on_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Opened => self.state = DriverState::Playing,
            PlaybackEvent::Failed(reason) => {
                error!(
                    "[{DEBUG_NAME}][PLAYBACK] Image {} failed to display: {reason}",
                    self.media.source()
                );
                self.state = DriverState::Failed(reason);
            }
            PlaybackEvent::Ended => {}
        }
    }
}

/// Video and animated images: the driver owns looping so every end of
/// media is observed.
pub struct LoopingMedia {
    media: MediaReference,
    options: PlaybackOptions,
    state: DriverState,
    loops_completed: u32,
}

impl LoopingMedia {
    fn new(media: MediaReference, options: PlaybackOptions) -> Self {
        Self {
            media,
            options,
            state: DriverState::Idle,
            loops_completed: 0,
        }
    }

    /// Animated images are always silent.
    fn muted(&self) -> bool {
        self.media.kind() == MediaKind::AnimatedImage || self.options.mute
    }

    fn start(&mut self, renderer: &mut dyn Renderer) -> EngineResult<()> {
        let request = RenderRequest {
            kind: self.media.kind(),
            source: self.media.source().to_string(),
            muted: self.muted(),
            loop_in_page: false,
        };
        renderer
            .load(&request)
            .map_err(|e| EngineError::render_open(self.media.source(), e))?;
        self.state = DriverState::Opening;
        Ok(())
    }

    fn on_event(&mut self, event: PlaybackEvent, renderer: &mut dyn Renderer) {
        match event {
            PlaybackEvent::Opened => {
                if matches!(self.state, DriverState::Opening | DriverState::Idle) {
                    info!("[{DEBUG_NAME}][PLAYBACK] Playing {}", self.media.source());
                }
                self.state = DriverState::Playing;
            }
            PlaybackEvent::Ended if self.options.loop_playback => {
                self.loops_completed += 1;
                if let Err(e) = renderer.command(PageCommand::Restart) {
                    warn!("[{DEBUG_NAME}][PLAYBACK] Loop restart failed: {e}");
                }
                self.state = DriverState::Playing;
            }
            PlaybackEvent::Ended => {
                if let Err(e) = renderer.command(PageCommand::Hold) {
                    warn!("[{DEBUG_NAME}][PLAYBACK] Hold on last frame failed: {e}");
                }
                self.state = DriverState::Holding;
            }
            PlaybackEvent::Failed(reason) => {
                error!(
                    "[{DEBUG_NAME}][PLAYBACK] {} failed: {reason}",
                    self.media.source()
                );
                self.state = DriverState::Failed(reason);
            }
        }
    }

    pub fn loops_completed(&self) -> u32 {
        self.loops_completed
    }
}

pub struct LiveStream {
    media: MediaReference,
    options: PlaybackOptions,
    state: DriverState,
    watcher: ReconnectWatcher,
    interval: Duration,
    /// Whether the renderer holds a stream page that can reload itself.
    page_loaded: bool,
}

impl LiveStream {
    fn new(media: MediaReference, options: PlaybackOptions) -> Self {
        Self {
            media,
            options,
            state: DriverState::Idle,
            watcher: ReconnectWatcher::Disarmed,
            interval: RECONNECT_INTERVAL,
            page_loaded: false,
        }
    }

    fn request(&self) -> RenderRequest {
        RenderRequest {
            kind: MediaKind::Stream,
            source: self.media.source().to_string(),
            muted: self.options.mute,
            loop_in_page: self.options.loop_playback,
        }
    }

    /// Stream open failures are never fatal; they go straight to the
    /// reconnect path.
    fn start<T>(&mut self, renderer: &mut dyn Renderer, timers: &mut T)
    where
        T: TimerScheduler + ?Sized,
    {
        match renderer.load(&self.request()) {
            Ok(()) => {
                self.page_loaded = true;
                self.state = DriverState::Opening;
            }
            Err(e) => {
                warn!("[{DEBUG_NAME}][STREAM] Initial open of {} failed: {e}", self.media.source());
                self.begin_reconnect(timers);
            }
        }
    }

    fn on_event<T>(&mut self, event: PlaybackEvent, timers: &mut T)
    where
        T: TimerScheduler + ?Sized,
    {
        match event {
            PlaybackEvent::Opened => {
                if let Some(state) = self.watcher.disarm(timers) {
                    info!(
                        "[{DEBUG_NAME}][STREAM] Reconnected to {} after {} attempt(s)",
                        self.media.source(),
                        state.attempt_count
                    );
                }
                self.state = DriverState::Playing;
            }
            PlaybackEvent::Failed(reason) => {
                warn!("[{DEBUG_NAME}][STREAM] {} failed: {reason}", self.media.source());
                self.begin_reconnect(timers);
            }
            PlaybackEvent::Ended => {
                if !self.options.loop_playback {
                    self.state = DriverState::Holding;
                }
            }
        }
    }

    fn begin_reconnect<T>(&mut self, timers: &mut T)
    where
        T: TimerScheduler + ?Sized,
    {
        match self.watcher.arm(timers, self.interval) {
            Ok(true) => {
                info!(
                    "[{DEBUG_NAME}][STREAM] Reconnecting every {}s",
                    self.interval.as_secs()
                );
                self.state = DriverState::Reconnecting;
            }
            Ok(false) => self.state = DriverState::Reconnecting,
            Err(e) => {
                error!("[{DEBUG_NAME}][STREAM] Could not arm reconnect timer: {e}");
                self.state = DriverState::Failed(e);
            }
        }
    }

    fn on_tick(&mut self, id: TimerId, renderer: &mut dyn Renderer, now: Instant) -> bool {
        if !self.watcher.on_tick(id, now) {
            return false;
        }

        let attempt = self.watcher.state().map_or(0, |s| s.attempt_count);
        info!(
            "[{DEBUG_NAME}][STREAM] Reconnect attempt {attempt} to {}",
            self.media.source()
        );
        let result = if self.page_loaded {
            renderer.command(PageCommand::Reload)
        } else {
            renderer.load(&self.request())
        };
        match result {
            Ok(()) => self.page_loaded = true,
            Err(e) => warn!("[{DEBUG_NAME}][STREAM] Reconnect attempt {attempt} failed: {e}"),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePlatform, RendererCall, ShellLayout};

    fn driver_for(source: &str, options: PlaybackOptions) -> PlaybackDriver {
        PlaybackDriver::for_media(&MediaReference::classify(source).unwrap(), options)
    }

    fn options(loop_playback: bool, mute: bool) -> PlaybackOptions {
        PlaybackOptions {
            loop_playback,
            mute,
            ..PlaybackOptions::default()
        }
    }

    #[test]
    fn video_loops_on_every_end_of_media() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        let mut renderer = fake.renderer(1);
        let mut driver = driver_for("clip.mp4", options(true, true));

        driver.start(renderer.as_mut(), &mut fake).unwrap();
        driver.on_playback(PlaybackEvent::Opened, renderer.as_mut(), &mut fake);
        for _ in 0..5 {
            driver.on_playback(PlaybackEvent::Ended, renderer.as_mut(), &mut fake);
        }

        assert_eq!(*driver.state(), DriverState::Playing);
        assert_eq!(fake.state().commands(1, PageCommand::Restart), 5);
        match &driver {
            PlaybackDriver::Video(video) => assert_eq!(video.loops_completed(), 5),
            _ => panic!("expected video driver"),
        }
    }

    #[test]
    fn non_looping_video_holds_last_frame() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        let mut renderer = fake.renderer(1);
        let mut driver = driver_for("clip.mp4", options(false, true));

        driver.start(renderer.as_mut(), &mut fake).unwrap();
        driver.on_playback(PlaybackEvent::Ended, renderer.as_mut(), &mut fake);

        assert_eq!(*driver.state(), DriverState::Holding);
        assert_eq!(fake.state().commands(1, PageCommand::Hold), 1);
        assert_eq!(fake.state().commands(1, PageCommand::Restart), 0);
    }

    #[test]
    fn mute_applies_to_video_only() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        let mut renderer = fake.renderer(1);
        driver_for("clip.mp4", options(true, false))
            .start(renderer.as_mut(), &mut fake)
            .unwrap();
        driver_for("loop.gif", options(true, false))
            .start(renderer.as_mut(), &mut fake)
            .unwrap();

        let loads = fake.state().loads(1);
        assert!(!loads[0].muted);
        assert!(loads[1].muted);
        assert!(!loads[0].loop_in_page);
    }

    #[test]
    fn file_backed_open_failure_is_fatal() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        fake.state_mut().fail_renderer_load = true;
        let mut renderer = fake.renderer(1);
        let err = driver_for("clip.mp4", options(true, true))
            .start(renderer.as_mut(), &mut fake)
            .unwrap_err();
        assert!(matches!(err, EngineError::RenderOpenFailed { .. }));
    }

    #[test]
    fn late_failure_marks_driver_failed() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        let mut renderer = fake.renderer(1);
        let mut driver = driver_for("photo.png", PlaybackOptions::default());
        driver.start(renderer.as_mut(), &mut fake).unwrap();
        driver.on_playback(
            PlaybackEvent::Failed("decode".to_string()),
            renderer.as_mut(),
            &mut fake,
        );
        assert_eq!(*driver.state(), DriverState::Failed("decode".to_string()));
    }

    #[test]
    fn stream_open_failure_arms_reconnect_instead_of_failing() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        fake.state_mut().fail_renderer_load = true;
        let mut renderer = fake.renderer(1);
        let mut driver = driver_for("https://cdn.example/live.m3u8", options(true, true));

        driver.start(renderer.as_mut(), &mut fake).unwrap();
        assert_eq!(*driver.state(), DriverState::Reconnecting);
        assert_eq!(fake.state().armed_timers.len(), 1);
    }

    #[test]
    fn stream_reconnects_once_per_tick_until_opened() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        let mut renderer = fake.renderer(1);
        let mut driver = driver_for("https://cdn.example/live.m3u8", options(true, true));
        driver.start(renderer.as_mut(), &mut fake).unwrap();

        for _ in 0..3 {
            driver.on_playback(
                PlaybackEvent::Failed("network".to_string()),
                renderer.as_mut(),
                &mut fake,
            );
        }
        assert_eq!(fake.state().armed_timers.len(), 1);
        assert_eq!(fake.state().timer_intervals, vec![RECONNECT_INTERVAL]);

        let timer = fake.state().armed_timers[0];
        for _ in 0..4 {
            assert!(driver.on_timer(timer, renderer.as_mut(), Instant::now()));
        }
        assert_eq!(driver.reconnect_state().unwrap().attempt_count, 4);
        assert_eq!(fake.state().loads(1).len(), 1);
        assert_eq!(fake.state().commands(1, PageCommand::Reload), 4);

        driver.on_playback(PlaybackEvent::Opened, renderer.as_mut(), &mut fake);
        assert_eq!(*driver.state(), DriverState::Playing);
        assert!(fake.state().armed_timers.is_empty());
        assert!(driver.reconnect_state().is_none());
        assert!(!driver.on_timer(timer, renderer.as_mut(), Instant::now()));
    }

    #[test]
    fn stream_without_a_page_navigates_again_on_tick() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        fake.state_mut().fail_renderer_load = true;
        let mut renderer = fake.renderer(1);
        let mut driver = driver_for("https://cdn.example/live.m3u8", options(true, true));
        driver.start(renderer.as_mut(), &mut fake).unwrap();
        let timer = fake.state().armed_timers[0];

        assert!(driver.on_timer(timer, renderer.as_mut(), Instant::now()));
        assert_eq!(fake.state().loads(1).len(), 2);
        assert_eq!(fake.state().commands(1, PageCommand::Reload), 0);

        fake.state_mut().fail_renderer_load = false;
        assert!(driver.on_timer(timer, renderer.as_mut(), Instant::now()));
        assert!(driver.on_timer(timer, renderer.as_mut(), Instant::now()));
        assert_eq!(fake.state().loads(1).len(), 3);
        assert_eq!(fake.state().commands(1, PageCommand::Reload), 1);
        assert!(fake
            .state()
            .loads(1)
            .iter()
            .all(|r| r.source == "https://cdn.example/live.m3u8"));
    }

    #[test]
    fn stop_disarms_and_clears_once() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        let mut renderer = fake.renderer(1);
        let mut driver = driver_for("rtsp://cam/1", options(true, true));
        driver.start(renderer.as_mut(), &mut fake).unwrap();
        driver.on_playback(
            PlaybackEvent::Failed("gone".to_string()),
            renderer.as_mut(),
            &mut fake,
        );

        driver.stop(Some(renderer.as_mut()), &mut fake);
        driver.stop(Some(renderer.as_mut()), &mut fake);

        assert_eq!(*driver.state(), DriverState::Stopped);
        assert!(fake.state().armed_timers.is_empty());
        assert_eq!(fake.state().commands(1, PageCommand::Clear), 1);

        driver.on_playback(PlaybackEvent::Ended, renderer.as_mut(), &mut fake);
        assert_eq!(*driver.state(), DriverState::Stopped);
    }

    #[test]
    fn stream_options_travel_to_the_page() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        let mut renderer = fake.renderer(1);
        driver_for("http://h/live", options(false, false))
            .start(renderer.as_mut(), &mut fake)
            .unwrap();
        let load = fake.state().loads(1)[0].clone();
        assert!(!load.muted);
        assert!(!load.loop_in_page);
        assert!(matches!(
            fake.state().renderer_calls[0].1,
            RendererCall::Load(_)
        ));
    }
}
