//! Maps a path or URL to the kind of media it names.
//!
//! Classification is pure string inspection: nothing is opened and the
//! file does not need to exist.

use crate::media::MediaKind;

pub const STREAM_SCHEMES: &[&str] = &["http", "https", "rtmp", "rtsp", "mms", "mmsh"];

pub const ANIMATED_IMAGE_EXTENSIONS: &[&str] = &["gif", "apng"];

pub const STATIC_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "wmv", "mov", "flv", "webm", "m4v", "3gp", "ogv",
];

/// Returns `None` when the reference is neither a stream URL nor a known
/// media extension.
pub fn classify(reference: &str) -> Option<MediaKind> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    if let Some(scheme) = uri_scheme(reference) {
        if STREAM_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
            return Some(MediaKind::Stream);
        }
    }

    let ext = extension(reference)?.to_ascii_lowercase();
    let ext = ext.as_str();

    if ANIMATED_IMAGE_EXTENSIONS.contains(&ext) {
        return Some(MediaKind::AnimatedImage);
    }
    if STATIC_IMAGE_EXTENSIONS.contains(&ext) {
        return Some(MediaKind::StaticImage);
    }
    if VIDEO_EXTENSIONS.contains(&ext) {
        return Some(MediaKind::Video);
    }

    None
}

pub fn is_stream_url(reference: &str) -> bool {
    classify(reference) == Some(MediaKind::Stream)
}

/// Prefixes `http://` onto bare host references such as `example.com/live.m3u8`.
pub fn normalize_stream_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http") || lower.starts_with("rtmp") || lower.starts_with("rtsp") {
        return trimmed.to_string();
    }

    format!("http://{trimmed}")
}

pub fn supported_extensions() -> Vec<&'static str> {
    STATIC_IMAGE_EXTENSIONS
        .iter()
        .chain(VIDEO_EXTENSIONS)
        .chain(ANIMATED_IMAGE_EXTENSIONS)
        .copied()
        .collect()
}

/// MIME type used for the `<source type>` attribute of generated pages.
pub fn mime_type(reference: &str) -> &'static str {
    match extension(reference).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("apng") => "image/apng",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("wmv") => "video/x-ms-wmv",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("flv") => "video/x-flv",
        Some("3gp") => "video/3gpp",
        Some("ogv") => "video/ogg",
        Some("m3u8") => "application/x-mpegURL",
        _ => "application/octet-stream",
    }
}

/// Scheme of an absolute URI. Single-letter schemes are drive letters
/// (`C:\...`) and are not treated as URIs.
fn uri_scheme(reference: &str) -> Option<&str> {
    let (scheme, rest) = reference.split_once(':')?;
    if scheme.len() < 2 || rest.is_empty() {
        return None;
    }

    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
        return None;
    }

    Some(scheme)
}

fn extension(reference: &str) -> Option<&str> {
    let without_query = reference
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(reference);
    let file_name = without_query
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(without_query);
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}
