use std::{path::Path, path::PathBuf, time::Duration};

use serde_yaml::{Mapping, Value};

use super::yaml::load_yaml;
use crate::{
    classifier::normalize_stream_url,
    media::{PlaybackOptions, Quality},
    paths::default_wallpaper_candidates,
    session::{EngineSettings, StaticImageMode},
    shell_locator::ShellLocator,
    surface::FallbackPolicy,
};

#[derive(Debug, Clone)]
pub struct LiveWallConfig {
    pub debug: bool,
    pub log_level: String,
    pub media: MediaSettings,
    pub playback: PlaybackOptions,
    pub static_images: StaticImageMode,
    pub desktop: DesktopSettings,
    pub restore: RestoreSettings,
    pub runtime: RuntimeSettings,
    pub watcher: WatcherSettings,
}

#[derive(Debug, Clone, Default)]
pub struct MediaSettings {
    pub source: Option<String>,
    /// Treat `source` as a stream address and add a missing `http://`.
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopSettings {
    pub settle_ms: u64,
    pub message_timeout_ms: u64,
    pub fallback_attempts: u32,
    pub fallback_interval_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RestoreSettings {
    pub default_wallpapers: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub tick_sleep_ms: u64,
    pub surface_check_interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct WatcherSettings {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for LiveWallConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "warn".to_string(),
            media: MediaSettings::default(),
            playback: PlaybackOptions::default(),
            static_images: StaticImageMode::default(),
            desktop: DesktopSettings::default(),
            restore: RestoreSettings::default(),
            runtime: RuntimeSettings::default(),
            watcher: WatcherSettings::default(),
        }
    }
}

impl Default for DesktopSettings {
    fn default() -> Self {
        Self {
            settle_ms: 40,
            message_timeout_ms: 1000,
            fallback_attempts: 3,
            fallback_interval_ms: 50,
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_sleep_ms: 8,
            surface_check_interval_ms: 2000,
        }
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 600,
        }
    }
}

impl LiveWallConfig {
    pub fn load(path: &Path) -> Option<Self> {
        let value = load_yaml(path)?;
        Self::from_yaml(&value)
    }

    pub fn from_yaml(root: &Value) -> Option<Self> {
        let map = root.as_mapping()?;
        let mut config = Self::default();

        config.debug = bool_at(map, "debug").unwrap_or(config.debug);
        config.log_level = str_at(map, "log_level")
            .unwrap_or(&config.log_level)
            .to_lowercase();

        if let Some(media) = mapping_at(map, "media") {
            config.media.source = str_any(media, &["source", "path", "url"])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            config.media.stream = bool_any(media, &["stream", "is_stream"]).unwrap_or(false);
        }

        if let Some(playback) = mapping_at(map, "playback") {
            let options = &mut config.playback;
            options.loop_playback = bool_any(playback, &["loop", "loop_playback", "repeat"])
                .unwrap_or(options.loop_playback);
            options.mute = bool_any(playback, &["mute", "muted"]).unwrap_or(options.mute);
            options.quality = str_at(playback, "quality")
                .and_then(Quality::parse)
                .unwrap_or(options.quality);
        }

        if let Some(statics) = mapping_at(map, "static_images") {
            config.static_images = str_at(statics, "mode")
                .and_then(StaticImageMode::parse)
                .unwrap_or(config.static_images);
        }

        if let Some(desktop) = mapping_at(map, "desktop") {
            let d = &mut config.desktop;
            d.settle_ms = u64_any(desktop, &["settle_ms", "settle_delay_ms"])
                .unwrap_or(d.settle_ms)
                .clamp(1, 2000);
            d.message_timeout_ms = u64_at(desktop, "message_timeout_ms")
                .unwrap_or(d.message_timeout_ms)
                .clamp(50, 10_000);
            d.fallback_attempts = u64_at(desktop, "fallback_attempts")
                .map(|v| v as u32)
                .unwrap_or(d.fallback_attempts)
                .clamp(1, 10);
            d.fallback_interval_ms = u64_at(desktop, "fallback_interval_ms")
                .unwrap_or(d.fallback_interval_ms)
                .min(1000);
        }

        if let Some(restore) = mapping_at(map, "restore") {
            config.restore.default_wallpapers = string_list_at(restore, "default_wallpapers")
                .unwrap_or_default()
                .into_iter()
                .map(PathBuf::from)
                .collect();
        }

        if let Some(runtime) = mapping_at(map, "runtime") {
            config.runtime.tick_sleep_ms = u64_at(runtime, "tick_sleep_ms")
                .unwrap_or(config.runtime.tick_sleep_ms)
                .max(1);
            config.runtime.surface_check_interval_ms =
                u64_any(runtime, &["surface_check_interval_ms", "health_check_ms"])
                    .unwrap_or(config.runtime.surface_check_interval_ms)
                    .max(250);
        }

        if let Some(watcher) = mapping_at(map, "watcher") {
            config.watcher.enabled = bool_any(watcher, &["enabled", "auto_reload", "live_reload"])
                .unwrap_or(config.watcher.enabled);
            config.watcher.interval_ms = u64_any(watcher, &["interval_ms", "check_interval_ms"])
                .unwrap_or(config.watcher.interval_ms)
                .max(100);
        }

        Some(config)
    }

    /// Source to play, with stream addresses normalized.
    pub fn media_source(&self) -> Option<String> {
        let source = self.media.source.as_deref()?;
        if self.media.stream {
            Some(normalize_stream_url(source))
        } else {
            Some(source.to_string())
        }
    }

    /// Whether moving from `self` to `next` changes what is on screen or
    /// how it is attached. Logging, restore and runtime settings apply in
    /// place.
    pub fn requires_restart(&self, next: &Self) -> bool {
        self.media_source() != next.media_source()
            || self.playback != next.playback
            || self.static_images != next.static_images
            || self.desktop != next.desktop
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let default_wallpapers = if self.restore.default_wallpapers.is_empty() {
            default_wallpaper_candidates()
        } else {
            self.restore.default_wallpapers.clone()
        };

        EngineSettings {
            locator: ShellLocator {
                settle_delay: Duration::from_millis(self.desktop.settle_ms),
                message_timeout: Duration::from_millis(self.desktop.message_timeout_ms),
            },
            fallback: FallbackPolicy {
                attempts: self.desktop.fallback_attempts,
                interval: Duration::from_millis(self.desktop.fallback_interval_ms),
            },
            static_images: self.static_images,
            default_wallpapers,
        }
    }
}

fn bool_at(map: &Mapping, key: &str) -> Option<bool> {
    map.get(Value::String(key.to_string()))?.as_bool()
}

fn bool_any(map: &Mapping, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| bool_at(map, k))
}

fn str_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    map.get(Value::String(key.to_string()))?.as_str()
}

fn str_any<'a>(map: &'a Mapping, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| str_at(map, k))
}

fn mapping_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a Mapping> {
    map.get(Value::String(key.to_string()))?.as_mapping()
}

fn u64_at(map: &Mapping, key: &str) -> Option<u64> {
    map.get(Value::String(key.to_string()))?
        .as_i64()
        .and_then(|v| if v >= 0 { Some(v as u64) } else { None })
}

fn u64_any(map: &Mapping, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| u64_at(map, k))
}

fn string_list_at(map: &Mapping, key: &str) -> Option<Vec<String>> {
    match map.get(Value::String(key.to_string()))? {
        Value::Sequence(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Value::String(single) => Some(vec![single.trim().to_string()]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> LiveWallConfig {
        let value: Value = serde_yaml::from_str(text).unwrap();
        LiveWallConfig::from_yaml(&value).unwrap()
    }

    #[test]
    fn empty_mapping_yields_defaults() {
        let config = parse("{}");
        assert!(!config.debug);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.media_source(), None);
        assert_eq!(config.playback, PlaybackOptions::default());
        assert_eq!(config.static_images, StaticImageMode::System);
        assert_eq!(config.desktop.settle_ms, 40);
        assert_eq!(config.desktop.fallback_attempts, 3);
    }

    #[test]
    fn reads_every_section() {
        let config = parse(
            r#"
debug: true
log_level: INFO
media:
  source: '  D:\Clips\ocean.mp4 '
playback:
  loop: false
  mute: false
  quality: high
static_images:
  mode: surface
desktop:
  settle_ms: 80
  message_timeout_ms: 500
  fallback_attempts: 5
  fallback_interval_ms: 20
restore:
  default_wallpapers:
    - C:\Walls\a.jpg
    - C:\Walls\b.jpg
runtime:
  tick_sleep_ms: 16
  surface_check_interval_ms: 1000
watcher:
  enabled: false
  interval_ms: 50
"#,
        );

        assert!(config.debug);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.media_source().as_deref(), Some("D:\\Clips\\ocean.mp4"));
        assert!(!config.playback.loop_playback);
        assert!(!config.playback.mute);
        assert_eq!(config.playback.quality, Quality::High);
        assert_eq!(config.static_images, StaticImageMode::Surface);
        assert_eq!(config.runtime.tick_sleep_ms, 16);
        assert!(!config.watcher.enabled);
        assert_eq!(config.watcher.interval_ms, 100);

        let settings = config.engine_settings();
        assert_eq!(settings.locator.settle_delay, Duration::from_millis(80));
        assert_eq!(settings.locator.message_timeout, Duration::from_millis(500));
        assert_eq!(settings.fallback.attempts, 5);
        assert_eq!(settings.fallback.interval, Duration::from_millis(20));
        assert_eq!(
            settings.default_wallpapers,
            vec![PathBuf::from("C:\\Walls\\a.jpg"), PathBuf::from("C:\\Walls\\b.jpg")]
        );
    }

    #[test]
    fn stream_sources_are_normalized() {
        let config = parse("media:\n  source: example.com/live.m3u8\n  stream: true\n");
        assert_eq!(
            config.media_source().as_deref(),
            Some("http://example.com/live.m3u8")
        );
    }

    #[test]
    fn bad_values_fall_back() {
        let config = parse("playback:\n  quality: ultra\nstatic_images:\n  mode: hologram\n");
        assert_eq!(config.playback.quality, Quality::Medium);
        assert_eq!(config.static_images, StaticImageMode::System);
    }

    #[test]
    fn logging_and_runtime_edits_keep_playback_running() {
        let before = parse("media:\n  source: D:\\Clips\\ocean.mp4\n");
        let after = parse(
            "debug: true\nlog_level: info\nmedia:\n  source: D:\\Clips\\ocean.mp4\nrestore:\n  default_wallpapers: C:\\Walls\\a.jpg\n",
        );
        assert!(!before.requires_restart(&after));
        assert_ne!(before.log_level, after.log_level);
    }

    #[test]
    fn media_playback_and_desktop_edits_restart() {
        let before = parse("media:\n  source: D:\\Clips\\ocean.mp4\n");
        for edited in [
            "media:\n  source: D:\\Clips\\forest.mp4\n",
            "media:\n  source: D:\\Clips\\ocean.mp4\nplayback:\n  mute: false\n",
            "media:\n  source: D:\\Clips\\ocean.mp4\ndesktop:\n  settle_ms: 90\n",
            "media:\n  source: D:\\Clips\\ocean.mp4\nstatic_images:\n  mode: surface\n",
        ] {
            assert!(before.requires_restart(&parse(edited)), "{edited}");
        }
    }

    #[test]
    fn non_mapping_root_is_rejected() {
        let value: Value = serde_yaml::from_str("- just\n- a list\n").unwrap();
        assert!(LiveWallConfig::from_yaml(&value).is_none());
    }
}
