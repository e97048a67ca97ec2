use std::{
    ptr,
    sync::{
        atomic::{AtomicIsize, AtomicU32, Ordering},
        OnceLock,
    },
    thread,
    time::{Duration, Instant},
};

use windows::{
    core::{w, PCWSTR},
    Win32::{
        Foundation::{COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM},
        System::LibraryLoader::GetModuleHandleW,
        UI::{
            HiDpi::{SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2},
            WindowsAndMessaging::{
                CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetSystemMetrics,
                GetWindowLongW, GetWindowRect, IsWindow, PeekMessageW, PostQuitMessage,
                RegisterClassW, RegisterWindowMessageW, SetLayeredWindowAttributes, SetParent,
                SetWindowLongW, SetWindowPos, ShowWindow, TranslateMessage, GWL_EXSTYLE,
                GWL_STYLE, HWND_BOTTOM, LWA_ALPHA, MSG, PM_REMOVE, SM_CXVIRTUALSCREEN,
                SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN, SWP_FRAMECHANGED,
                SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE, SWP_NOZORDER, SW_SHOWNOACTIVATE,
                WINDOW_EX_STYLE, WINDOW_STYLE, WM_QUIT, WNDCLASSW, WS_CAPTION, WS_CHILD,
                WS_CLIPCHILDREN, WS_CLIPSIBLINGS, WS_EX_APPWINDOW, WS_EX_LAYERED,
                WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TRANSPARENT, WS_EX_WINDOWEDGE,
                WS_MAXIMIZEBOX, WS_MINIMIZEBOX, WS_POPUP, WS_SYSMENU, WS_THICKFRAME,
            },
        },
    },
};

use super::{handle, hwnd};
use crate::{
    events::{self, EngineEvent},
    info,
    platform::{ScreenRect, WindowHandle},
    warn, DEBUG_NAME,
};

const HOST_CLASS_NAME: PCWSTR = w!("LiveWallpaperSurface");

/// Slice used when waiting while keeping the queue serviced.
const PUMP_SLICE: Duration = Duration::from_millis(5);

static TASKBAR_CREATED: AtomicU32 = AtomicU32::new(0);
static WATCH_HWND: AtomicIsize = AtomicIsize::new(0);

pub enum Pump {
    Continue,
    Quit(i32),
}

pub fn ensure_host_class() -> Result<(), String> {
    static CLASS_ONCE: OnceLock<bool> = OnceLock::new();
    if CLASS_ONCE.get().is_some() {
        return Ok(());
    }

    let hinstance = module_instance()?;
    let wc = WNDCLASSW {
        lpfnWndProc: Some(host_window_proc),
        hInstance: hinstance,
        lpszClassName: HOST_CLASS_NAME,
        ..Default::default()
    };

    if unsafe { RegisterClassW(&wc) } == 0 {
        return Err(format!(
            "RegisterClassW failed: {:?}",
            windows::core::Error::from_win32()
        ));
    }

    TASKBAR_CREATED.store(
        unsafe { RegisterWindowMessageW(w!("TaskbarCreated")) },
        Ordering::Relaxed,
    );

    let _ = CLASS_ONCE.set(true);
    Ok(())
}

unsafe extern "system" fn host_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let taskbar_created = TASKBAR_CREATED.load(Ordering::Relaxed);
    if taskbar_created != 0
        && msg == taskbar_created
        && hwnd.0 as isize == WATCH_HWND.load(Ordering::Relaxed)
    {
        events::post(EngineEvent::ShellRestarted);
        return LRESULT(0);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

fn module_instance() -> Result<HINSTANCE, String> {
    unsafe {
        GetModuleHandleW(None)
            .map(|h| HINSTANCE(h.0))
            .map_err(|e| format!("GetModuleHandleW failed: {e:?}"))
    }
}

fn create_popup(bounds: ScreenRect, ex_style: WINDOW_EX_STYLE) -> Result<HWND, String> {
    let style = WINDOW_STYLE((WS_POPUP | WS_CLIPSIBLINGS | WS_CLIPCHILDREN).0);
    let hinstance = module_instance()?;

    unsafe {
        CreateWindowExW(
            ex_style,
            HOST_CLASS_NAME,
            PCWSTR::null(),
            style,
            bounds.left,
            bounds.top,
            bounds.width,
            bounds.height,
            None,
            None,
            Some(hinstance),
            Some(ptr::null()),
        )
    }
    .map_err(|e| format!("CreateWindowExW failed: {e:?}"))
}

/// Hidden, chromeless window covering `bounds`. Never activated and kept
/// out of the taskbar.
pub fn create_surface_window(bounds: ScreenRect) -> Result<WindowHandle, String> {
    let ex_style = WINDOW_EX_STYLE((WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE).0);
    let window = create_popup(bounds, ex_style)?;
    info!(
        "[{DEBUG_NAME}][HOST] surface window {:?} at ({}, {}) {}x{}",
        window, bounds.left, bounds.top, bounds.width, bounds.height
    );
    Ok(handle(window))
}

/// Top-level window that receives the `TaskbarCreated` broadcast.
pub fn create_watch_window() -> Result<WindowHandle, String> {
    let ex_style = WINDOW_EX_STYLE((WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE).0);
    let window = create_popup(ScreenRect::default(), ex_style)?;
    WATCH_HWND.store(window.0 as isize, Ordering::Relaxed);
    Ok(handle(window))
}

pub fn destroy_watch_window(window: WindowHandle) {
    let _ = WATCH_HWND.compare_exchange(window.0, 0, Ordering::Relaxed, Ordering::Relaxed);
    let _ = destroy(window);
}

pub fn virtual_screen() -> ScreenRect {
    unsafe {
        ScreenRect {
            left: GetSystemMetrics(SM_XVIRTUALSCREEN),
            top: GetSystemMetrics(SM_YVIRTUALSCREEN),
            width: GetSystemMetrics(SM_CXVIRTUALSCREEN).max(1),
            height: GetSystemMetrics(SM_CYVIRTUALSCREEN).max(1),
        }
    }
}

fn window_rect(window: HWND) -> Option<RECT> {
    unsafe {
        let mut rect = RECT::default();
        if GetWindowRect(window, &mut rect).is_ok() {
            Some(rect)
        } else {
            None
        }
    }
}

/// Parents `window` under `parent`, keeping its screen position.
pub fn reparent(window: WindowHandle, parent: WindowHandle) -> Result<(), String> {
    let child = hwnd(window);
    let parent = hwnd(parent);
    let screen = window_rect(child);

    unsafe { SetParent(child, Some(parent)) }
        .map_err(|e| format!("SetParent({parent:?}) failed: {e:?}"))?;

    // Child coordinates are relative to the parent's origin.
    if let (Some(screen), Some(parent_rect)) = (screen, window_rect(parent)) {
        unsafe {
            SetWindowPos(
                child,
                None,
                screen.left - parent_rect.left,
                screen.top - parent_rect.top,
                screen.right - screen.left,
                screen.bottom - screen.top,
                SWP_NOZORDER | SWP_NOACTIVATE,
            )
        }
        .map_err(|e| format!("SetWindowPos after reparent failed: {e:?}"))?;
    }
    Ok(())
}

pub fn apply_embedded_style(window: WindowHandle) -> Result<(), String> {
    let hwnd = hwnd(window);
    unsafe {
        let style = GetWindowLongW(hwnd, GWL_STYLE) as u32;
        let mut new_style = style
            & !(WS_POPUP.0
                | WS_CAPTION.0
                | WS_THICKFRAME.0
                | WS_MINIMIZEBOX.0
                | WS_MAXIMIZEBOX.0
                | WS_SYSMENU.0);
        new_style |= WS_CHILD.0;
        let _ = SetWindowLongW(hwnd, GWL_STYLE, new_style as i32);

        let ex_style = GetWindowLongW(hwnd, GWL_EXSTYLE) as u32;
        let mut new_ex = ex_style & !(WS_EX_APPWINDOW.0 | WS_EX_WINDOWEDGE.0);
        new_ex |= WS_EX_TOOLWINDOW.0 | WS_EX_NOACTIVATE.0 | WS_EX_TRANSPARENT.0;
        let _ = SetWindowLongW(hwnd, GWL_EXSTYLE, new_ex as i32);

        info!(
            "[{DEBUG_NAME}][STYLE] embedded hwnd={:?} style=0x{:X}->0x{:X} ex=0x{:X}->0x{:X}",
            hwnd, style, new_style, ex_style, new_ex
        );

        SetWindowPos(
            hwnd,
            None,
            0,
            0,
            0,
            0,
            SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE | SWP_FRAMECHANGED,
        )
        .map_err(|e| format!("SetWindowPos failed for embedded style: {e:?}"))
    }
}

pub fn send_to_bottom(window: WindowHandle) -> Result<(), String> {
    unsafe {
        SetWindowPos(
            hwnd(window),
            Some(HWND_BOTTOM),
            0,
            0,
            0,
            0,
            SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
        )
    }
    .map_err(|e| format!("SetWindowPos(HWND_BOTTOM) failed: {e:?}"))
}

pub fn apply_degraded_style(window: WindowHandle) -> Result<(), String> {
    let hwnd = hwnd(window);
    unsafe {
        let ex_style = GetWindowLongW(hwnd, GWL_EXSTYLE) as u32;
        let new_ex = (ex_style & !WS_EX_APPWINDOW.0)
            | WS_EX_LAYERED.0
            | WS_EX_TRANSPARENT.0
            | WS_EX_TOOLWINDOW.0
            | WS_EX_NOACTIVATE.0;
        let _ = SetWindowLongW(hwnd, GWL_EXSTYLE, new_ex as i32);

        // Layered windows stay invisible until an alpha is set.
        SetLayeredWindowAttributes(hwnd, COLORREF(0), 255, LWA_ALPHA)
            .map_err(|e| format!("SetLayeredWindowAttributes failed: {e:?}"))
    }
}

pub fn show(window: WindowHandle) {
    unsafe {
        let _ = ShowWindow(hwnd(window), SW_SHOWNOACTIVATE);
    }
}

pub fn is_alive(window: WindowHandle) -> bool {
    unsafe { IsWindow(Some(hwnd(window))).as_bool() }
}

pub fn destroy(window: WindowHandle) -> Result<(), String> {
    unsafe { DestroyWindow(hwnd(window)) }
        .map_err(|e| format!("DestroyWindow({:?}) failed: {e:?}", window))
}

/// Dispatches everything currently queued for this thread.
pub fn pump_pending() -> Pump {
    let mut msg = MSG::default();
    unsafe {
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            if msg.message == WM_QUIT {
                return Pump::Quit(msg.wParam.0 as i32);
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    Pump::Continue
}

/// Waits `duration` while dispatching messages. A `WM_QUIT` seen here is
/// re-posted so the outer loop still observes it.
pub fn pump_for(duration: Duration) {
    let deadline = Instant::now() + duration;
    loop {
        if let Pump::Quit(code) = pump_pending() {
            unsafe { PostQuitMessage(code) };
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep(PUMP_SLICE.min(deadline - now));
    }
}

pub fn enable_per_monitor_dpi_awareness() {
    if let Err(e) = unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) } {
        warn!("[{DEBUG_NAME}][HOST] per-monitor DPI awareness unavailable: {e:?}");
    }
}
