use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::locale::LocaleMapping;
use crate::models::Platform;

pub const CONFIG_FILE_NAME: &str = "nluforge.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub project: ProjectPaths,
    pub locales: LocaleMapping,
    pub alexa: AlexaConfig,
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectPaths {
    pub models_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for ProjectPaths {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            output_dir: PathBuf::from("platforms"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlexaConfig {
    /// Version of the ask command-line tool the skill package targets.
    pub ask_cli_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub platforms: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            platforms: Platform::ALL.iter().map(|p| p.key().to_string()).collect(),
        }
    }
}

impl ProjectConfig {
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads the config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw, path)
    }

    pub fn platforms(&self) -> Result<Vec<Platform>, ConfigError> {
        let mut platforms = Vec::new();
        for raw in &self.build.platforms {
            let platform =
                Platform::parse(raw).ok_or_else(|| ConfigError::UnknownPlatform(raw.clone()))?;
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        Ok(platforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_locales_and_paths() {
        let raw = r#"
            [project]
            models_dir = "lang"

            [locales]
            en = ["en-US", "en-GB"]

            [alexa]
            ask_cli_version = "2.22.4"
        "#;

        let config = ProjectConfig::from_toml_str(raw, Path::new("nluforge.toml")).unwrap();
        assert_eq!(config.project.models_dir, PathBuf::from("lang"));
        assert_eq!(config.project.output_dir, PathBuf::from("platforms"));
        assert_eq!(config.locales["en"], vec!["en-US", "en-GB"]);
        assert_eq!(config.alexa.ask_cli_version.as_deref(), Some("2.22.4"));
        assert_eq!(
            config.platforms().unwrap(),
            vec![Platform::Alexa, Platform::Dialogflow]
        );
    }

    #[test]
    fn rejects_unknown_platform() {
        let raw = "[build]\nplatforms = [\"alexa\", \"cortana\"]\n";
        let config = ProjectConfig::from_toml_str(raw, Path::new("nluforge.toml")).unwrap();
        assert!(matches!(
            config.platforms(),
            Err(ConfigError::UnknownPlatform(name)) if name == "cortana"
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = ProjectConfig::load(Path::new("/definitely/not/here/nluforge.toml")).unwrap();
        assert!(config.locales.is_empty());
    }
}
