use std::ffi::c_void;

use windows::Win32::UI::WindowsAndMessaging::{
    SystemParametersInfoW, SPIF_SENDCHANGE, SPIF_UPDATEINIFILE, SPI_GETDESKWALLPAPER,
    SPI_SETDESKWALLPAPER, SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS,
};
use winreg::{enums::*, RegKey};

use crate::utility::{from_wide, to_wstring};

const DESKTOP_KEY: &str = "Control Panel\\Desktop";

/// Fill: `WallpaperStyle=10`, `TileWallpaper=0`.
const FILL_STYLE: (&str, &str) = ("10", "0");

pub fn current_wallpaper() -> Result<Option<String>, String> {
    let mut buf = [0u16; 4096];
    unsafe {
        SystemParametersInfoW(
            SPI_GETDESKWALLPAPER,
            buf.len() as u32,
            Some(buf.as_mut_ptr() as *mut c_void),
            SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
        )
    }
    .map_err(|e| format!("SPI_GETDESKWALLPAPER failed: {e:?}"))?;

    let path = from_wide(&buf).trim().to_string();
    Ok(if path.is_empty() { None } else { Some(path) })
}

pub fn registry_wallpaper() -> Result<Option<String>, String> {
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let desktop_key = hkcu
        .open_subkey(DESKTOP_KEY)
        .map_err(|e| format!("cannot open HKCU\\{DESKTOP_KEY}: {e}"))?;

    match desktop_key.get_value::<String, _>("Wallpaper") {
        Ok(path) if !path.trim().is_empty() => Ok(Some(path.trim().to_string())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(format!("cannot read Wallpaper value: {e}")),
    }
}

pub fn set_fill_style() -> Result<(), String> {
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let desktop_key = hkcu
        .open_subkey_with_flags(DESKTOP_KEY, KEY_WRITE)
        .map_err(|e| format!("cannot open HKCU\\{DESKTOP_KEY}: {e}"))?;

    let (style, tile) = FILL_STYLE;
    desktop_key
        .set_value("WallpaperStyle", &style)
        .map_err(|e| format!("cannot set WallpaperStyle: {e}"))?;
    desktop_key
        .set_value("TileWallpaper", &tile)
        .map_err(|e| format!("cannot set TileWallpaper: {e}"))?;
    Ok(())
}

/// Persists and broadcasts the new wallpaper. An empty path clears it.
pub fn set_wallpaper(path: &str) -> Result<(), String> {
    let mut wide = to_wstring(path);
    unsafe {
        SystemParametersInfoW(
            SPI_SETDESKWALLPAPER,
            0,
            Some(wide.as_mut_ptr() as *mut c_void),
            SPIF_UPDATEINIFILE | SPIF_SENDCHANGE,
        )
    }
    .map_err(|e| format!("SPI_SETDESKWALLPAPER('{path}') failed: {e:?}"))
}
