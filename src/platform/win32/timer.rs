use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use windows::Win32::{
    Foundation::HWND,
    UI::WindowsAndMessaging::{KillTimer, SetTimer},
};

use super::hwnd;
use crate::{
    events::{self, EngineEvent},
    platform::{TimerId, WindowHandle},
};

/// Thread timers get ids recycled by the system; window timers take ours.
static NEXT_TIMER_ID: AtomicUsize = AtomicUsize::new(1);

fn next_timer_id() -> usize {
    NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed)
}

unsafe extern "system" fn timer_proc(_hwnd: HWND, _msg: u32, id: usize, _time: u32) {
    events::post(EngineEvent::TimerTick(TimerId(id)));
}

/// Ticks are dispatched by the UI thread's message loop through `owner`.
pub fn arm(owner: WindowHandle, interval: Duration) -> Result<TimerId, String> {
    let ms = interval.as_millis().clamp(10, u32::MAX as u128) as u32;
    let id = next_timer_id();
    let armed = unsafe { SetTimer(Some(hwnd(owner)), id, ms, Some(timer_proc)) };
    if armed == 0 {
        return Err(format!(
            "SetTimer({ms} ms) failed: {:?}",
            windows::core::Error::from_win32()
        ));
    }
    Ok(TimerId(id))
}

pub fn disarm(owner: WindowHandle, id: TimerId) {
    unsafe {
        let _ = KillTimer(Some(hwnd(owner)), id.0);
    }
}
