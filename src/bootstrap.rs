use std::{
    fs,
    path::Path,
    time::{Duration, SystemTime},
};

use crate::{info, paths, warn, DEBUG_NAME};

/// Generated pages older than this are removed at startup.
pub const PAGE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const DEFAULT_CONFIG: &str = r#"# Live wallpaper settings. Changes are picked up while running.
debug: false
log_level: warn

media:
  # Image, video, animated image or stream URL.
  source: ""
  # Set for bare stream addresses such as example.com/live.m3u8
  stream: false

playback:
  loop: true
  mute: true
  quality: medium

static_images:
  # system: hand still images to the Windows wallpaper setting
  # surface: draw them in the live wallpaper window
  mode: system

desktop:
  settle_ms: 40
  message_timeout_ms: 1000
  fallback_attempts: 3
  fallback_interval_ms: 50

restore:
  # Empty uses the stock Windows wallpapers.
  default_wallpapers: []

runtime:
  tick_sleep_ms: 8
  surface_check_interval_ms: 2000

watcher:
  enabled: true
  interval_ms: 600
"#;

/// Creates the app directories, scaffolds a default config and sweeps
/// stale generated pages.
pub fn bootstrap(config_path: &Path) {
    info!("[{DEBUG_NAME}][BOOT] === Bootstrap starting ===");

    let data_dir = paths::app_data_dir();
    if let Err(e) = fs::create_dir_all(&data_dir) {
        warn!("[{DEBUG_NAME}][BOOT] Failed to create {}: {e}", data_dir.display());
    }

    scaffold_config_yaml(config_path);

    let removed = cleanup_stale_pages(&paths::page_dir(), PAGE_MAX_AGE, SystemTime::now());
    if removed > 0 {
        info!("[{DEBUG_NAME}][BOOT] Removed {removed} stale page file(s)");
    }
}

pub fn scaffold_config_yaml(path: &Path) {
    if path.exists() {
        return;
    }

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    match fs::write(path, DEFAULT_CONFIG) {
        Ok(_) => info!("[{DEBUG_NAME}][BOOT] Created {}", path.display()),
        Err(e) => warn!("[{DEBUG_NAME}][BOOT] Failed to create {}: {e}", path.display()),
    }
}

/// Deletes `.html` files in `dir` last modified before `now - max_age`.
pub fn cleanup_stale_pages(dir: &Path, max_age: Duration, now: SystemTime) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > max_age) {
            match fs::remove_file(&path) {
                Ok(_) => removed += 1,
                Err(e) => warn!("[{DEBUG_NAME}][BOOT] Could not remove {}: {e}", path.display()),
            }
        }
    }
    removed
}
