use thiserror::Error;

/// Engine-level failures surfaced to the front end.
///
/// Raw OS error codes are folded into the message text at the platform
/// boundary; callers only ever match on these kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unsupported media '{0}'")]
    UnsupportedMedia(String),

    #[error("desktop layer not found")]
    LayerNotFound,

    #[error("failed to open '{source_ref}': {reason}")]
    RenderOpenFailed { source_ref: String, reason: String },

    #[error("desktop integration failed: {0}")]
    IntegrationFailed(String),

    #[error("failed to restore the default wallpaper: {0}")]
    RestoreFailed(String),

    #[error("{0}")]
    Conversion(String),
}

impl EngineError {
    pub fn render_open(source_ref: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RenderOpenFailed {
            source_ref: source_ref.into(),
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
