use std::path::Path;

#[cfg(windows)]
pub fn to_wstring(s: &str) -> Vec<u16> {
    use std::{ffi::OsStr, os::windows::ffi::OsStrExt};

    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

#[cfg(windows)]
pub fn from_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

pub fn path_to_file_url(path: impl AsRef<Path>) -> String {
    let normalized = path.as_ref().to_string_lossy().replace('\\', "/");
    let normalized = normalized
        .trim_start_matches('/')
        .replace('%', "%25")
        .replace(' ', "%20")
        .replace('#', "%23");
    format!("file:///{normalized}")
}

/// Case-insensitive path comparison, the way the Windows shell compares
/// wallpaper paths.
pub fn same_path(a: &str, b: &str) -> bool {
    let a = a.trim().replace('/', "\\");
    let b = b.trim().replace('/', "\\");
    a.eq_ignore_ascii_case(&b)
}
