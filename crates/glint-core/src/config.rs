use serde::{Deserialize, Serialize};

use crate::error::GlintResult;

/// File name looked up in the working directory by the CLI and language server.
pub const CONFIG_FILE_NAME: &str = "glint.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// GLSL version assumed when a shader has no `#version` directive.
    pub default_version: u32,
    /// Upper bound on diagnostics reported per file.
    pub max_diagnostics: usize,
    /// Emit warnings (e.g. unused local variables) in addition to errors.
    pub warnings: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_version: 450,
            max_diagnostics: 200,
            warnings: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GlintConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub colors: ColorsConfig,
}

impl GlintConfig {
    pub fn load_from_file(path: &std::path::Path) -> GlintResult<Self> {
        let contents = crate::error::read_source(path)?;
        let config: GlintConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> GlintResult<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load `glint.toml` from `dir` if present, falling back to defaults.
    pub fn discover(dir: &std::path::Path) -> GlintResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GlintConfig = toml::from_str("[analysis]\ndefault_version = 330\nmax_diagnostics = 10\nwarnings = false\n").unwrap();
        assert_eq!(config.analysis.default_version, 330);
        assert!(!config.analysis.warnings);
        assert!(config.colors.enabled);
    }

    #[test]
    fn test_empty_config() {
        let config: GlintConfig = toml::from_str("").unwrap();
        assert_eq!(config.analysis.default_version, 450);
        assert_eq!(config.analysis.max_diagnostics, 200);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("glint-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut config = GlintConfig::default();
        config.colors.enabled = false;
        config.save_to_file(&dir.join(CONFIG_FILE_NAME)).unwrap();

        let loaded = GlintConfig::discover(&dir).unwrap();
        assert!(!loaded.colors.enabled);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
