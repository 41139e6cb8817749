// error.rs — 查看器错误分类

use std::path::PathBuf;

/// Errors surfaced by the viewer engine and the tour model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewerError {
    /// No GPU adapter, device or surface could be acquired for the window.
    #[error("rendering context unavailable: {0}")]
    RenderContextUnavailable(String),

    #[error("failed to load panorama texture from {url}: {reason}")]
    TextureLoadFailed { url: String, reason: String },

    #[error("maximum {max} hotspots per scene")]
    TooManyHotspots { max: usize },

    /// A hotspot points at a scene that is not part of the tour.
    #[error("hotspot target {0} does not match any scene")]
    DanglingHotspotTarget(String),

    #[error("scene not found: {0}")]
    SceneNotFound(String),

    #[error("hotspot not found: {0}")]
    HotspotNotFound(String),

    #[error("no hotspot placement is pending")]
    NoPendingPlacement,

    #[error("viewer has been disposed")]
    Disposed,

    #[error("I/O error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("invalid JSON: {0}")]
    Json(String),
}

impl ViewerError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Errors the host should show to the user rather than just log.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::TooManyHotspots { .. }
                | Self::DanglingHotspotTarget(_)
                | Self::TextureLoadFailed { .. }
                | Self::RenderContextUnavailable(_)
        )
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_hotspots_message() {
        let err = ViewerError::TooManyHotspots { max: 4 };
        assert_eq!(err.to_string(), "maximum 4 hotspots per scene");
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_internal_errors_not_user_facing() {
        assert!(!ViewerError::Disposed.is_user_facing());
        assert!(!ViewerError::NoPendingPlacement.is_user_facing());
    }
}
