//! HTML documents loaded by the web rendering surface.
//!
//! Every page reports back through `chrome.webview.postMessage` with
//! `{"type": "opened" | "ended" | "error", "detail": ...}` and accepts
//! [`crate::events::PageCommand`] messages in the other direction.

use std::{fs::File, io::BufReader, path::Path, time::Duration};

use image::{
    codecs::{gif::GifDecoder, png::PngDecoder},
    AnimationDecoder, Frames,
};

use crate::{
    classifier::{classify, mime_type},
    media::MediaKind,
    platform::RenderRequest,
    utility::path_to_file_url,
};

/// Milliseconds the stream page waits before reloading after a player error.
pub const STREAM_RELOAD_DELAY_MS: u64 = 5000;

/// Browsers play frames this short or shorter at [`SHORT_FRAME_DELAY`].
const MIN_FRAME_DELAY: Duration = Duration::from_millis(10);
const SHORT_FRAME_DELAY: Duration = Duration::from_millis(100);

/// 1x1 transparent GIF swapped in to rewind an animation.
const BLANK_IMAGE: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

const PAGE_STYLE: &str = "html,body{margin:0;padding:0;width:100%;height:100%;overflow:hidden;background:#000;}\
#media{position:fixed;inset:0;width:100%;height:100%;object-fit:cover;}";

const BRIDGE_SCRIPT: &str = r#"
const post = (type, detail) => {
  if (window.chrome && window.chrome.webview) {
    window.chrome.webview.postMessage(JSON.stringify({ type, detail }));
  }
};
"#;

pub fn build_page(request: &RenderRequest) -> String {
    match request.kind {
        MediaKind::StaticImage => image_page(&local_url(&request.source)),
        MediaKind::AnimatedImage if !is_converted_video(&request.source) => animated_image_page(
            &local_url(&request.source),
            animation_cycle(Path::new(&request.source)),
        ),
        MediaKind::AnimatedImage | MediaKind::Video => {
            video_page(&local_url(&request.source), mime_type(&request.source), request.muted)
        }
        MediaKind::Stream => stream_page(&request.source, request.muted, request.loop_in_page),
    }
}

/// Animated images may come back from the converter as a video file.
fn is_converted_video(source: &str) -> bool {
    classify(source) == Some(MediaKind::Video)
}

/// Length of one pass through an animated GIF or APNG, with short frame
/// delays counted the way the browser plays them.
pub fn animation_cycle(path: &Path) -> Option<Duration> {
    let reader = BufReader::new(File::open(path).ok()?);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let frames = match extension.as_deref() {
        Some("gif") => GifDecoder::new(reader).ok()?.into_frames(),
        Some("apng") | Some("png") => PngDecoder::new(reader).ok()?.apng().ok()?.into_frames(),
        _ => return None,
    };
    cycle_of(frames)
}

fn cycle_of(frames: Frames<'_>) -> Option<Duration> {
    let mut total = Duration::ZERO;
    let mut count = 0usize;
    for frame in frames {
        let frame = frame.ok()?;
        let (numer, denom) = frame.delay().numer_denom_ms();
        let delay = Duration::from_micros(u64::from(numer) * 1000 / u64::from(denom.max(1)));
        total += if delay <= MIN_FRAME_DELAY {
            SHORT_FRAME_DELAY
        } else {
            delay
        };
        count += 1;
    }
    (count > 0).then_some(total)
}

fn local_url(source: &str) -> String {
    if source.contains("://") {
        source.to_string()
    } else {
        path_to_file_url(source)
    }
}

fn image_page(url: &str) -> String {
    let src = escape_attr(url);
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><style>{PAGE_STYLE}</style></head>
<body>
<img id="media" alt="">
<script>{BRIDGE_SCRIPT}
const img = document.getElementById('media');
img.addEventListener('load', () => post('opened'));
img.addEventListener('error', () => post('error', 'image could not be decoded'));
img.src = "{src}";
window.chrome.webview.addEventListener('message', (e) => {{
  const msg = typeof e.data === 'string' ? JSON.parse(e.data) : e.data;
  if (msg.cmd === 'clear') {{ img.removeAttribute('src'); }}
}});
</script>
</body></html>"#
    )
}

/// The `<img>` plays the animation; a timer reports the end of each pass
/// so the driver can rewind it or freeze it on a canvas snapshot. Without
/// a known cycle no end is reported.
fn animated_image_page(url: &str, cycle: Option<Duration>) -> String {
    let src = escape_attr(url);
    let cycle_ms = cycle.map_or("null".to_string(), |c| c.as_millis().max(1).to_string());
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><style>{PAGE_STYLE}</style></head>
<body>
<img id="media" alt="">
<canvas id="held" hidden></canvas>
<script>{BRIDGE_SCRIPT}
const img = document.getElementById('media');
const held = document.getElementById('held');
held.style.cssText = 'position:fixed;inset:0;width:100%;height:100%;object-fit:cover;';
const url = "{src}";
const cycleMs = {cycle_ms};
let cycleTimer = null;
const schedule = () => {{
  clearTimeout(cycleTimer);
  if (cycleMs) cycleTimer = setTimeout(() => post('ended'), cycleMs);
}};
img.addEventListener('load', () => {{ post('opened'); schedule(); }}, {{ once: true }});
img.addEventListener('error', () => {{ if (img.src !== "{BLANK_IMAGE}") post('error', 'image could not be decoded'); }});
img.src = url;
window.chrome.webview.addEventListener('message', (e) => {{
  const msg = typeof e.data === 'string' ? JSON.parse(e.data) : e.data;
  switch (msg.cmd) {{
    case 'restart':
      held.hidden = true;
      img.hidden = false;
      img.src = "{BLANK_IMAGE}";
      img.src = url;
      schedule();
      break;
    case 'hold':
      clearTimeout(cycleTimer);
      held.width = img.naturalWidth;
      held.height = img.naturalHeight;
      held.getContext('2d').drawImage(img, 0, 0);
      held.hidden = false;
      img.hidden = true;
      img.src = "{BLANK_IMAGE}";
      break;
    case 'clear':
      clearTimeout(cycleTimer);
      held.hidden = true;
      img.removeAttribute('src');
      break;
  }}
}});
</script>
</body></html>"#
    )
}

/// No `loop` attribute: end-of-media is reported and the driver decides.
fn video_page(url: &str, mime: &str, muted: bool) -> String {
    let src = escape_attr(url);
    let muted_attr = if muted { " muted" } else { "" };
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><style>{PAGE_STYLE}</style></head>
<body>
<video id="media" autoplay playsinline preload="auto"{muted_attr} src="{src}" type="{mime}"></video>
<script>{BRIDGE_SCRIPT}
const video = document.getElementById('media');
video.muted = {muted};
video.addEventListener('playing', () => post('opened'));
video.addEventListener('ended', () => post('ended'));
video.addEventListener('error', () => post('error', video.error ? 'media error ' + video.error.code : 'media error'));
window.chrome.webview.addEventListener('message', (e) => {{
  const msg = typeof e.data === 'string' ? JSON.parse(e.data) : e.data;
  switch (msg.cmd) {{
    case 'restart': video.currentTime = 0; video.play(); break;
    case 'hold': video.pause(); break;
    case 'clear': video.pause(); video.removeAttribute('src'); video.load(); break;
  }}
}});
</script>
</body></html>"#
    )
}

fn stream_page(url: &str, muted: bool, looped: bool) -> String {
    let src = escape_attr(url);
    let muted_attr = if muted { " muted" } else { "" };
    let loop_attr = if looped { " loop" } else { "" };
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><style>{PAGE_STYLE}</style></head>
<body>
<video id="media" autoplay playsinline{muted_attr}{loop_attr}>
  <source src="{src}" type="video/mp4">
  <source src="{src}" type="application/x-mpegURL">
</video>
<script>{BRIDGE_SCRIPT}
const video = document.getElementById('media');
const sources = video.querySelectorAll('source');
let reloadPending = false;
const onError = () => {{
  post('error', video.error ? 'stream error ' + video.error.code : 'stream source failed');
  if (reloadPending) return;
  reloadPending = true;
  setTimeout(() => {{ reloadPending = false; video.load(); }}, {STREAM_RELOAD_DELAY_MS});
}};
video.addEventListener('error', onError);
if (sources.length) sources[sources.length - 1].addEventListener('error', onError);
video.addEventListener('playing', () => post('opened'));
window.chrome.webview.addEventListener('message', (e) => {{
  const msg = typeof e.data === 'string' ? JSON.parse(e.data) : e.data;
  switch (msg.cmd) {{
    case 'reload': video.load(); break;
    case 'hold': video.pause(); break;
    case 'clear': video.pause(); sources.forEach((s) => s.removeAttribute('src')); video.load(); break;
  }}
}});
</script>
</body></html>"#
    )
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
