use std::time::Duration;

use windows::{
    core::{BOOL, HRESULT, PCWSTR},
    Win32::{
        Foundation::{
            ERROR_ACCESS_DENIED, ERROR_NOT_ENOUGH_MEMORY, ERROR_NO_SYSTEM_RESOURCES, HWND, LPARAM,
            WPARAM,
        },
        UI::WindowsAndMessaging::{
            EnumWindows, FindWindowExW, FindWindowW, SendMessageTimeoutW, SMTO_NORMAL,
        },
    },
};

use super::{handle, hwnd};
use crate::{
    platform::WindowHandle,
    shell_locator::{SPAWN_LAYER_MESSAGE, SPAWN_LAYER_WPARAM},
    utility::to_wstring,
};

pub fn find_top_level(class: &str) -> Result<Option<WindowHandle>, String> {
    let class_wide = to_wstring(class);
    let found = unsafe { FindWindowW(PCWSTR(class_wide.as_ptr()), PCWSTR::null()) };
    lookup_result(found, class)
}

pub fn find_window_after(
    parent: Option<WindowHandle>,
    after: Option<WindowHandle>,
    class: &str,
) -> Result<Option<WindowHandle>, String> {
    let class_wide = to_wstring(class);
    let found = unsafe {
        FindWindowExW(
            parent.map(hwnd),
            after.map(hwnd),
            PCWSTR(class_wide.as_ptr()),
            PCWSTR::null(),
        )
    };
    lookup_result(found, class)
}

pub fn top_level_windows() -> Result<Vec<WindowHandle>, String> {
    unsafe extern "system" fn enum_proc(hwnd: HWND, lparam: LPARAM) -> BOOL {
        if let Some(out) = (lparam.0 as *mut Vec<WindowHandle>).as_mut() {
            out.push(handle(hwnd));
        }
        BOOL(1)
    }

    let mut windows = Vec::<WindowHandle>::new();
    unsafe {
        EnumWindows(
            Some(enum_proc),
            LPARAM((&mut windows) as *mut Vec<WindowHandle> as isize),
        )
    }
    .map_err(|e| format!("EnumWindows failed: {e:?}"))?;
    Ok(windows)
}

/// Asks Progman to create the background `WorkerW`. A zero return means
/// the call timed out or failed.
pub fn request_layer(progman: WindowHandle, timeout: Duration) -> Result<(), String> {
    let mut result = 0usize;
    let timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;
    let sent = unsafe {
        SendMessageTimeoutW(
            hwnd(progman),
            SPAWN_LAYER_MESSAGE,
            WPARAM(SPAWN_LAYER_WPARAM),
            LPARAM(0),
            SMTO_NORMAL,
            timeout_ms,
            Some(&mut result as *mut usize),
        )
    };
    if sent.0 == 0 {
        return Err(format!(
            "SendMessageTimeoutW(0x{SPAWN_LAYER_MESSAGE:X}) failed: {:?}",
            windows::core::Error::from_win32()
        ));
    }
    Ok(())
}

/// Not-found lookups are `Ok(None)`; resource and permission failures are
/// fatal.
fn lookup_result(found: windows::core::Result<HWND>, class: &str) -> Result<Option<WindowHandle>, String> {
    match found {
        Ok(found) if !found.0.is_null() => Ok(Some(handle(found))),
        Ok(_) => Ok(None),
        Err(e) if is_fatal(e.code()) => Err(format!("lookup of {class} failed: {e:?}")),
        Err(_) => Ok(None),
    }
}

fn is_fatal(code: HRESULT) -> bool {
    [ERROR_ACCESS_DENIED, ERROR_NOT_ENOUGH_MEMORY, ERROR_NO_SYSTEM_RESOURCES]
        .iter()
        .any(|err| code == HRESULT::from_win32(err.0))
}
