use std::{
    env,
    path::{Path, PathBuf},
};

use crate::APP_NAME;

pub const CONFIG_FILE: &str = "config.yaml";
pub const LOG_FILE: &str = "livewall.log";

pub fn user_home_dir() -> Option<PathBuf> {
    if let Ok(profile) = env::var("USERPROFILE") {
        return Some(PathBuf::from(profile));
    }

    let drive = env::var("HOMEDRIVE").ok();
    let path = env::var("HOMEPATH").ok();
    match (drive, path) {
        (Some(d), Some(p)) => Some(PathBuf::from(format!("{d}{p}"))),
        _ => env::var("HOME").map(PathBuf::from).ok(),
    }
}

/// Directory of the running executable, skipping a trailing `bin/`.
pub fn install_dir() -> Option<PathBuf> {
    let exe_path = env::current_exe().ok()?;
    let exe_dir = exe_path.parent()?;

    if exe_dir.file_name().and_then(|n| n.to_str()) == Some("bin") {
        return exe_dir.parent().map(Path::to_path_buf);
    }

    Some(exe_dir.to_path_buf())
}

/// `%LOCALAPPDATA%\LiveWallpaper`, falling back to the home directory.
pub fn app_data_dir() -> PathBuf {
    if let Ok(local) = env::var("LOCALAPPDATA") {
        return PathBuf::from(local).join(APP_NAME);
    }

    match user_home_dir() {
        Some(home) => home.join(format!(".{APP_NAME}")),
        None => env::temp_dir().join(APP_NAME),
    }
}

/// A `config.yaml` next to the executable wins over the per-user one.
pub fn config_path() -> PathBuf {
    if let Some(portable) = install_dir().map(|d| d.join(CONFIG_FILE)) {
        if portable.exists() {
            return portable;
        }
    }
    app_data_dir().join(CONFIG_FILE)
}

pub fn log_path() -> PathBuf {
    app_data_dir().join(LOG_FILE)
}

/// Generated HTML pages for the rendering surface.
pub fn page_dir() -> PathBuf {
    env::temp_dir().join(APP_NAME)
}

pub fn windows_dir() -> PathBuf {
    env::var("SystemRoot")
        .or_else(|_| env::var("windir"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("C:\\Windows"))
}

/// Stock wallpapers shipped with Windows, most preferred first.
pub fn default_wallpaper_candidates() -> Vec<PathBuf> {
    let stock = windows_dir().join("Web").join("Wallpaper").join("Windows");
    let four_k = windows_dir().join("Web").join("4K").join("Wallpaper").join("Windows");
    vec![
        stock.join("img0.jpg"),
        stock.join("img19.jpg"),
        four_k.join("img0_3840x2160.jpg"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_candidates_live_under_the_windows_dir() {
        let candidates = default_wallpaper_candidates();
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.starts_with(windows_dir())));
        assert!(candidates[0].ends_with("img0.jpg"));
    }

    #[test]
    fn pages_go_to_the_temp_dir() {
        assert!(page_dir().starts_with(env::temp_dir()));
        assert!(page_dir().ends_with(APP_NAME));
    }
}
