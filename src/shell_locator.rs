//! Finds the window layer that sits between the desktop background and the
//! desktop icons.
//!
//! Explorer only creates that layer when `Progman` receives the private
//! `0x052C` message. On classic shells the layer is the `WorkerW` sibling
//! that follows the window hosting `SHELLDLL_DefView`; on newer shells it is
//! a `WorkerW` child of `Progman` itself.

use std::time::Duration;

use crate::{
    error::{EngineError, EngineResult},
    info,
    platform::{ShellWindows, WindowHandle},
    warn,
    DEBUG_NAME,
};

pub const PROGMAN_CLASS: &str = "Progman";
pub const ICON_VIEW_CLASS: &str = "SHELLDLL_DefView";
pub const LAYER_CLASS: &str = "WorkerW";

/// Private message that asks `Progman` to spawn the background layer.
pub const SPAWN_LAYER_MESSAGE: u32 = 0x052C;
pub const SPAWN_LAYER_WPARAM: usize = 0xD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopLayer {
    Found(WindowHandle),
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellLocator {
    pub settle_delay: Duration,
    pub message_timeout: Duration,
}

impl Default for ShellLocator {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(40),
            message_timeout: Duration::from_millis(1000),
        }
    }
}

impl ShellLocator {
    /// One attempt, no internal retries. A miss is `Ok(NotFound)`; only
    /// fatal shell conditions are errors.
    pub fn acquire_desktop_layer<S>(&self, shell: &mut S) -> EngineResult<DesktopLayer>
    where
        S: ShellWindows + ?Sized,
    {
        let Some(progman) = shell.find_top_level(PROGMAN_CLASS).map_err(fatal)? else {
            warn!("[{DEBUG_NAME}][SHELL] Progman window not found");
            return Ok(DesktopLayer::NotFound);
        };

        // A timed-out send is not fatal: the layer may already exist.
        if let Err(e) = shell.request_layer(progman, self.message_timeout) {
            warn!("[{DEBUG_NAME}][SHELL] Layer spawn request failed: {e}");
        }
        shell.settle(self.settle_delay);

        if let Some(host) = find_icon_view_host(shell)? {
            if let Some(layer) = shell
                .find_window_after(None, Some(host), LAYER_CLASS)
                .map_err(fatal)?
            {
                info!("[{DEBUG_NAME}][SHELL] Desktop layer found behind icon host: {:?}", layer);
                return Ok(DesktopLayer::Found(layer));
            }
        }

        if let Some(layer) = shell
            .find_window_after(Some(progman), None, LAYER_CLASS)
            .map_err(fatal)?
        {
            info!("[{DEBUG_NAME}][SHELL] Desktop layer found under Progman: {:?}", layer);
            return Ok(DesktopLayer::Found(layer));
        }

        warn!("[{DEBUG_NAME}][SHELL] No desktop layer available");
        Ok(DesktopLayer::NotFound)
    }
}

fn find_icon_view_host<S>(shell: &mut S) -> EngineResult<Option<WindowHandle>>
where
    S: ShellWindows + ?Sized,
{
    for window in shell.top_level_windows().map_err(fatal)? {
        if shell
            .find_window_after(Some(window), None, ICON_VIEW_CLASS)
            .map_err(fatal)?
            .is_some()
        {
            return Ok(Some(window));
        }
    }
    Ok(None)
}

fn fatal(reason: String) -> EngineError {
    EngineError::IntegrationFailed(format!("shell query failed: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePlatform, ShellLayout};

    #[test]
    fn classic_layout_uses_sibling_after_icon_host() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        let layer = ShellLocator::default().acquire_desktop_layer(&mut fake).unwrap();
        assert_eq!(layer, DesktopLayer::Found(ShellLayout::CLASSIC_LAYER));

        let state = fake.state();
        assert_eq!(state.layer_requests, 1);
        assert_eq!(state.settle_calls, vec![Duration::from_millis(40)]);
    }

    #[test]
    fn newer_layout_uses_progman_child() {
        let mut fake = FakePlatform::with_layout(ShellLayout::ProgmanChild);
        let layer = ShellLocator::default().acquire_desktop_layer(&mut fake).unwrap();
        assert_eq!(layer, DesktopLayer::Found(ShellLayout::CHILD_LAYER));
    }

    #[test]
    fn missing_layer_is_not_an_error() {
        let mut fake = FakePlatform::with_layout(ShellLayout::NoLayer);
        let layer = ShellLocator::default().acquire_desktop_layer(&mut fake).unwrap();
        assert_eq!(layer, DesktopLayer::NotFound);

        let mut fake = FakePlatform::with_layout(ShellLayout::NoProgman);
        let layer = ShellLocator::default().acquire_desktop_layer(&mut fake).unwrap();
        assert_eq!(layer, DesktopLayer::NotFound);
        assert_eq!(fake.state().layer_requests, 0);
    }

    #[test]
    fn access_denied_is_fatal() {
        let mut fake = FakePlatform::with_layout(ShellLayout::AccessDenied);
        let err = ShellLocator::default().acquire_desktop_layer(&mut fake).unwrap_err();
        assert!(matches!(err, EngineError::IntegrationFailed(_)));
    }

    #[test]
    fn timed_out_spawn_request_still_searches() {
        let mut fake = FakePlatform::with_layout(ShellLayout::Classic);
        fake.state_mut().fail_layer_request = true;
        let layer = ShellLocator::default().acquire_desktop_layer(&mut fake).unwrap();
        assert_eq!(layer, DesktopLayer::Found(ShellLayout::CLASSIC_LAYER));
    }
}
