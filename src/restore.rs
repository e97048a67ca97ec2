//! Puts a sensible system wallpaper back once the live wallpaper is gone.

use std::path::PathBuf;

use crate::{
    error::{EngineError, EngineResult},
    info,
    platform::WallpaperStore,
    utility::same_path,
    warn,
    DEBUG_NAME,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    DefaultImage(String),
    PreviousWallpaper(String),
    RegistryWallpaper(String),
    Cleared,
}

impl RestoreOutcome {
    pub fn path(&self) -> &str {
        match self {
            Self::DefaultImage(p) | Self::PreviousWallpaper(p) | Self::RegistryWallpaper(p) => p,
            Self::Cleared => "",
        }
    }
}

/// Lookup order: first existing default image, the wallpaper observed before
/// the session, the registry's current value, then an empty wallpaper.
/// `removed_asset` is never chosen.
pub fn restore_default_wallpaper<S>(
    store: &mut S,
    candidates: &[PathBuf],
    previous: Option<&str>,
    removed_asset: Option<&str>,
) -> EngineResult<RestoreOutcome>
where
    S: WallpaperStore + ?Sized,
{
    let outcome = choose(store, candidates, previous, removed_asset);

    store
        .set_wallpaper(outcome.path())
        .map_err(|e| EngineError::RestoreFailed(format!("{}: {e}", describe(&outcome))))?;

    info!("[{DEBUG_NAME}][RESTORE] Restored {}", describe(&outcome));
    Ok(outcome)
}

fn choose<S>(
    store: &S,
    candidates: &[PathBuf],
    previous: Option<&str>,
    removed_asset: Option<&str>,
) -> RestoreOutcome
where
    S: WallpaperStore + ?Sized,
{
    let usable = |path: &str| {
        !path.trim().is_empty() && removed_asset.map_or(true, |asset| !same_path(path, asset))
    };

    for candidate in candidates {
        if store.path_exists(candidate) {
            return RestoreOutcome::DefaultImage(candidate.to_string_lossy().into_owned());
        }
    }

    if let Some(previous) = previous.filter(|p| usable(p)) {
        return RestoreOutcome::PreviousWallpaper(previous.to_string());
    }

    match store.registry_wallpaper() {
        Ok(Some(value)) if usable(&value) => return RestoreOutcome::RegistryWallpaper(value),
        Ok(_) => {}
        Err(e) => warn!("[{DEBUG_NAME}][RESTORE] Registry wallpaper lookup failed: {e}"),
    }

    RestoreOutcome::Cleared
}

fn describe(outcome: &RestoreOutcome) -> String {
    match outcome {
        RestoreOutcome::DefaultImage(p) => format!("default image {p}"),
        RestoreOutcome::PreviousWallpaper(p) => format!("previous wallpaper {p}"),
        RestoreOutcome::RegistryWallpaper(p) => format!("registry wallpaper {p}"),
        RestoreOutcome::Cleared => "empty wallpaper".to_string(),
    }
}
