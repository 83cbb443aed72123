use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::VantageResult;

fn default_idle_backoff_ms() -> u64 {
    2
}

fn default_thread_name() -> String {
    "vantage-render".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RendererConfig {
    /// Initial requested detail level; 0 = best quality.
    #[serde(default)]
    pub quality_level: u32,
    /// Frames-per-second ceiling; 0 = unbounded.
    #[serde(default)]
    pub max_frames_per_second: u32,
    /// Upper bound on how long the render thread sleeps when it has nothing
    /// to do. 0 turns the loop into a pure spin.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
    /// OS-level name of the render thread.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            quality_level: 0,
            max_frames_per_second: 0,
            idle_backoff_ms: default_idle_backoff_ms(),
            thread_name: default_thread_name(),
        }
    }
}

impl RendererConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct VantageConfig {
    #[serde(default)]
    pub renderer: RendererConfig,
}

impl VantageConfig {
    pub fn from_toml_str(contents: &str) -> VantageResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load_from_file(path: &std::path::Path) -> VantageResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> VantageResult<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = VantageConfig::from_toml_str("").unwrap();
        assert_eq!(config, VantageConfig::default());
        assert_eq!(config.renderer.idle_backoff(), Duration::from_millis(2));
        assert_eq!(config.renderer.thread_name, "vantage-render");
    }

    #[test]
    fn test_partial_renderer_table() {
        let config = VantageConfig::from_toml_str(
            r#"
            [renderer]
            quality_level = 2
            max_frames_per_second = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.renderer.quality_level, 2);
        assert_eq!(config.renderer.max_frames_per_second, 30);
        assert_eq!(config.renderer.idle_backoff_ms, 2);
    }

    #[test]
    fn test_invalid_document_is_config_error() {
        let err = VantageConfig::from_toml_str("[renderer]\nquality_level = -1").unwrap_err();
        assert!(matches!(err, crate::VantageError::Config(_)));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("vantage-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("vantage.toml");

        let mut config = VantageConfig::default();
        config.renderer.thread_name = "preview".into();
        config.renderer.idle_backoff_ms = 0;
        config.save_to_file(&path).unwrap();

        let loaded = VantageConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = VantageConfig::load_from_file(std::path::Path::new("/nonexistent/vantage.toml"))
            .unwrap_err();
        assert!(matches!(err, crate::VantageError::Io(_)));
    }
}
