/// Core error types for the Vantage renderer.
use std::path::PathBuf;

/// A specialized Result type for Vantage operations.
pub type VantageResult<T> = Result<T, VantageError>;

/// Top-level error type shared by every Vantage crate.
#[derive(Debug, thiserror::Error)]
pub enum VantageError {
    #[error("invalid lifecycle state: cannot {operation} ({reason})")]
    InvalidLifecycleState {
        operation: &'static str,
        reason: &'static str,
    },

    #[error("unsupported render target: {0}")]
    UnsupportedRenderTarget(String),

    #[error("failed to dispose render target: {0}")]
    Dispose(String),

    #[error("invalid bitmap: {0}")]
    InvalidBitmap(String),

    #[error("asset error: {message} ({path:?})")]
    Asset { message: String, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("render thread error: {0}")]
    Thread(String),

    #[error("{0}")]
    Other(String),
}

impl VantageError {
    /// Create a lifecycle error for the given operation.
    pub fn lifecycle(operation: &'static str, reason: &'static str) -> Self {
        VantageError::InvalidLifecycleState { operation, reason }
    }

    /// Create an asset error.
    pub fn asset(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        VantageError::Asset {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Whether this error came from calling a lifecycle operation out of order.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, VantageError::InvalidLifecycleState { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_error_display() {
        let err = VantageError::lifecycle("start", "render thread is already running");
        assert_eq!(
            err.to_string(),
            "invalid lifecycle state: cannot start (render thread is already running)"
        );
        assert!(err.is_lifecycle());
    }

    #[test]
    fn test_asset_error_display() {
        let err = VantageError::asset("file not found", "/assets/hero.png");
        assert!(err.to_string().contains("file not found"));
        assert!(!err.is_lifecycle());
    }

    #[test]
    fn test_config_error_from_toml() {
        let parse: Result<toml::Value, _> = toml::from_str("renderer = [");
        let err: VantageError = parse.unwrap_err().into();
        assert!(err.to_string().starts_with("config error"));
    }
}
