use std::fmt;
use std::path::PathBuf;

use crate::{classifier::classify, error::EngineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    StaticImage,
    AnimatedImage,
    Video,
    Stream,
}

impl MediaKind {
    pub fn description(self) -> &'static str {
        match self {
            Self::StaticImage => "static image",
            Self::AnimatedImage => "animated image",
            Self::Video => "video file",
            Self::Stream => "network stream",
        }
    }

    /// File-backed kinds fail `start()` on open errors; streams never do.
    pub fn is_file_backed(self) -> bool {
        !matches!(self, Self::Stream)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A classified path or URL. Immutable for the life of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    source: String,
    kind: MediaKind,
}

impl MediaReference {
    pub fn classify(source: &str) -> Result<Self, EngineError> {
        let kind = classify(source).ok_or_else(|| EngineError::UnsupportedMedia(source.to_string()))?;
        Ok(Self {
            source: source.trim().to_string(),
            kind,
        })
    }

    /// Same kind, different backing file. Used once conversion has produced
    /// a playback-friendly copy.
    pub fn with_source(&self, source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind: self.kind,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "normal" | "default" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOptions {
    pub loop_playback: bool,
    pub mute: bool,
    pub quality: Quality,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            loop_playback: true,
            mute: true,
            quality: Quality::Medium,
        }
    }
}

/// External transcoding step. The engine hands over the selected file and
/// plays whatever path comes back; failures are surfaced verbatim.
pub trait MediaConverter {
    fn process(&self, input: &str, quality: Quality, mute: bool) -> Result<PathBuf, String>;
}

/// Plays the selected file as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughConverter;

impl MediaConverter for PassthroughConverter {
    fn process(&self, input: &str, _quality: Quality, _mute: bool) -> Result<PathBuf, String> {
        Ok(PathBuf::from(input))
    }
}
