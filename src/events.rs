//! Events delivered to the UI thread.
//!
//! Renderer callbacks and timer ticks never touch session state directly:
//! they are queued here and drained by the message loop, which hands each
//! one to [`crate::session::WallpaperSession::handle_event`].

use std::sync::{
    mpsc::{self, Receiver, Sender},
    OnceLock,
};

use serde::{Deserialize, Serialize};

use crate::platform::TimerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Opened,
    Ended,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Renderer notification stamped with the session generation that
    /// created the renderer.
    Playback { generation: u64, event: PlaybackEvent },
    TimerTick(TimerId),
    /// The explorer shell came back after a restart; the old desktop layer
    /// and everything parented into it are gone.
    ShellRestarted,
}

/// Message posted by a rendering page through `chrome.webview.postMessage`.
#[derive(Debug, Deserialize)]
struct PageMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    detail: Option<String>,
}

pub fn decode_page_message(raw: &str) -> Option<PlaybackEvent> {
    let message: PageMessage = serde_json::from_str(raw).ok()?;
    match message.kind.as_str() {
        "opened" => Some(PlaybackEvent::Opened),
        "ended" => Some(PlaybackEvent::Ended),
        "error" => Some(PlaybackEvent::Failed(
            message.detail.unwrap_or_else(|| "media error".to_string()),
        )),
        _ => None,
    }
}

/// Command posted from the engine to a rendering page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PageCommand {
    Restart,
    Hold,
    Clear,
    Reload,
}

impl PageCommand {
    pub fn to_json(self) -> String {
        serde_json::to_string(&self).unwrap_or_else(|_| "{}".to_string())
    }
}

static EVENT_TX: OnceLock<Sender<EngineEvent>> = OnceLock::new();

/// Creates the process-wide queue. Only the first caller receives the
/// receiving end.
pub fn install_queue() -> Option<Receiver<EngineEvent>> {
    let (tx, rx) = mpsc::channel::<EngineEvent>();
    EVENT_TX.set(tx).ok()?;
    Some(rx)
}

/// Queues an event for the UI loop. Events posted before the queue exists
/// are dropped.
pub fn post(event: EngineEvent) {
    if let Some(tx) = EVENT_TX.get() {
        let _ = tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_page_messages() {
        assert_eq!(decode_page_message(r#"{"type":"opened"}"#), Some(PlaybackEvent::Opened));
        assert_eq!(decode_page_message(r#"{"type":"ended"}"#), Some(PlaybackEvent::Ended));
        assert_eq!(
            decode_page_message(r#"{"type":"error","detail":"MEDIA_ERR_NETWORK"}"#),
            Some(PlaybackEvent::Failed("MEDIA_ERR_NETWORK".to_string()))
        );
        assert_eq!(
            decode_page_message(r#"{"type":"error"}"#),
            Some(PlaybackEvent::Failed("media error".to_string()))
        );
    }

    #[test]
    fn ignores_unknown_or_malformed_messages() {
        assert_eq!(decode_page_message(r#"{"type":"progress"}"#), None);
        assert_eq!(decode_page_message("not json"), None);
    }

    #[test]
    fn commands_serialize_with_cmd_tag() {
        assert_eq!(PageCommand::Restart.to_json(), r#"{"cmd":"restart"}"#);
        assert_eq!(PageCommand::Hold.to_json(), r#"{"cmd":"hold"}"#);
    }
}
