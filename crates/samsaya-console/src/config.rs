use std::path::{Path, PathBuf};

use samsaya_llm::{GeminiModels, GeminiProvider};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid proxy '{url}': {source}")]
    Proxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http_proxy: String,
    #[serde(default)]
    pub https_proxy: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub thinking_model: Option<String>,
    /// Where synthesized speech is written.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

const CONFIG_FILE_PATH: &str = "samsaya.toml";

fn samsaya_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".samsaya")
}

fn samsaya_config_json_path() -> PathBuf {
    samsaya_dir().join("config.json")
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Config {
    /// Load from the config files and the process environment.
    pub fn load() -> Self {
        let mut config = Self::from_files(&samsaya_config_json_path(), Path::new(CONFIG_FILE_PATH));
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// `json_path` wins over `toml_path`; unreadable or malformed files are skipped.
    pub fn from_files(json_path: &Path, toml_path: &Path) -> Self {
        if json_path.exists() {
            match std::fs::read_to_string(json_path) {
                Ok(content) => match serde_json::from_str::<Config>(&content) {
                    Ok(config) => {
                        log::debug!("Loaded config from {}", json_path.display());
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring malformed {}: {}", json_path.display(), e),
                },
                Err(e) => log::warn!("Failed to read {}: {}", json_path.display(), e),
            }
        }

        if toml_path.exists() {
            match std::fs::read_to_string(toml_path) {
                Ok(content) => match toml::from_str::<Config>(&content) {
                    Ok(config) => {
                        log::debug!("Loaded config from {}", toml_path.display());
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring malformed {}: {}", toml_path.display(), e),
                },
                Err(e) => log::warn!("Failed to read {}: {}", toml_path.display(), e),
            }
        }

        Config::default()
    }

    /// Apply environment overrides. `GEMINI_API_KEY` takes precedence over `API_KEY`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(http_proxy) = lookup("HTTP_PROXY") {
            self.http_proxy = http_proxy;
        }
        if let Some(https_proxy) = lookup("HTTPS_PROXY") {
            self.https_proxy = https_proxy;
        }
        if let Some(api_key) = lookup("GEMINI_API_KEY")
            .and_then(non_blank)
            .or_else(|| lookup("API_KEY").and_then(non_blank))
        {
            self.api_key = Some(api_key);
        }
        if let Some(api_base) = lookup("API_BASE").and_then(non_blank) {
            self.api_base = Some(api_base);
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| samsaya_dir().join("audio"))
    }

    fn models(&self) -> GeminiModels {
        let mut models = GeminiModels::default();
        if let Some(model) = &self.default_model {
            models.default = model.clone();
        }
        if let Some(model) = &self.thinking_model {
            models.thinking = model.clone();
        }
        models
    }

    fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        let mut builder = reqwest::Client::builder();

        if !self.http_proxy.is_empty() {
            let proxy = reqwest::Proxy::http(&self.http_proxy).map_err(|source| ConfigError::Proxy {
                url: self.http_proxy.clone(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }
        if !self.https_proxy.is_empty() {
            let proxy = reqwest::Proxy::https(&self.https_proxy).map_err(|source| ConfigError::Proxy {
                url: self.https_proxy.clone(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }

        builder.build().map_err(ConfigError::Client)
    }

    /// Without an API key every backend call fails with `MissingApiKey`.
    pub fn build_client(&self) -> Result<GeminiProvider, ConfigError> {
        let mut provider = GeminiProvider::from_optional_key(self.api_key.clone())
            .with_client(self.http_client()?)
            .with_models(self.models());

        if let Some(base) = &self.api_base {
            provider = provider.with_base_url(base.clone());
        }

        if !provider.has_api_key() {
            log::warn!("No API key configured; set GEMINI_API_KEY or pass --api-key");
        }

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn gemini_key_beats_generic_key() {
        let mut config = Config::default();
        config.apply_env(env(&[("GEMINI_API_KEY", "g-key"), ("API_KEY", "generic")]));
        assert_eq!(config.api_key.as_deref(), Some("g-key"));
    }

    #[test]
    fn blank_env_key_does_not_clobber_file_key() {
        let mut config = Config {
            api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        config.apply_env(env(&[("GEMINI_API_KEY", "  "), ("API_BASE", "http://localhost:9")]));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.api_base.as_deref(), Some("http://localhost:9"));
    }

    #[test]
    fn json_file_wins_over_toml() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("config.json");
        let toml_path = dir.path().join("samsaya.toml");
        std::fs::write(&json, r#"{"api_key":"json-key","default_model":"m-json"}"#).unwrap();
        std::fs::write(&toml_path, "api_key = \"toml-key\"\n").unwrap();

        let config = Config::from_files(&json, &toml_path);
        assert_eq!(config.api_key.as_deref(), Some("json-key"));
        assert_eq!(config.default_model.as_deref(), Some("m-json"));
    }

    #[test]
    fn toml_used_when_json_missing_or_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("config.json");
        let toml_path = dir.path().join("samsaya.toml");
        std::fs::write(&json, "{ not json").unwrap();
        std::fs::write(&toml_path, "api_key = \"toml-key\"\nhttps_proxy = \"http://proxy:8080\"\n").unwrap();

        let config = Config::from_files(&json, &toml_path);
        assert_eq!(config.api_key.as_deref(), Some("toml-key"));
        assert_eq!(config.https_proxy, "http://proxy:8080");
    }

    #[test]
    fn no_files_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_files(&dir.path().join("a.json"), &dir.path().join("b.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn build_client_applies_models_and_key() {
        let config = Config {
            api_key: Some("k".to_string()),
            thinking_model: Some("custom-pro".to_string()),
            ..Config::default()
        };
        let provider = config.build_client().unwrap();
        assert!(provider.has_api_key());
        assert_eq!(provider.models().thinking, "custom-pro");
        assert_eq!(provider.models().default, "gemini-2.5-flash");
    }

    #[test]
    fn build_client_without_key_still_builds() {
        let provider = Config::default().build_client().unwrap();
        assert!(!provider.has_api_key());
    }

    #[test]
    fn output_dir_prefers_configured_path() {
        let config = Config {
            output_dir: Some(PathBuf::from("/tmp/samsaya-out")),
            ..Config::default()
        };
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/samsaya-out"));
    }
}
