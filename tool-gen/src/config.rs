//! Configuration for tool generation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Documents fetched per generation.
pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

/// Documents embedded in the generation prompt.
pub const DEFAULT_PROMPT_SAMPLES: usize = 5;

/// Documents fetched for a standalone attribute lookup.
pub const DEFAULT_ATTRIBUTE_SAMPLES: usize = 5;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsmithConfig {
    /// Orchestrator settings.
    pub generator: GeneratorConfig,

    /// Text generation settings.
    pub openai: OpenAiConfig,

    /// Root of the sample documents read by the directory provider.
    pub samples_dir: PathBuf,

    /// Directory holding the tool catalog.
    pub catalog_dir: PathBuf,
}

impl ToolsmithConfig {
    /// Load a TOML file, then apply the environment on top.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config.with_env())
    }

    /// Apply process environment overrides.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("TOOLSMITH_SAMPLES_DIR") {
            self.samples_dir = dir.into();
        }
        if let Some(dir) = lookup("TOOLSMITH_CATALOG_DIR") {
            self.catalog_dir = dir.into();
        }
        if let Some(db_name) = lookup("TOOLSMITH_DB_NAME").filter(|name| !name.is_empty()) {
            self.generator.default_db_name = Some(db_name);
        }
        self.openai = self.openai.with_env_from(lookup);
        self
    }
}

impl Default for ToolsmithConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            openai: OpenAiConfig::default(),
            samples_dir: PathBuf::from("samples"),
            catalog_dir: PathBuf::from("catalog"),
        }
    }
}

/// Settings for the generation orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Maximum documents fetched per generation.
    pub sample_limit: usize,

    /// Maximum documents embedded in the prompt.
    pub prompt_samples: usize,

    /// Documents fetched for an attribute lookup.
    pub attribute_samples: usize,

    /// Database used when a request names none.
    pub default_db_name: Option<String>,
}

impl GeneratorConfig {
    /// Set the sample limit.
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    /// Set how many samples go into the prompt.
    pub fn with_prompt_samples(mut self, count: usize) -> Self {
        self.prompt_samples = count;
        self
    }

    /// Set the default database name.
    pub fn with_default_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.default_db_name = Some(db_name.into());
        self
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            prompt_samples: DEFAULT_PROMPT_SAMPLES,
            attribute_samples: DEFAULT_ATTRIBUTE_SAMPLES,
            default_db_name: None,
        }
    }
}

/// Settings for the OpenAI-compatible chat completions client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL.
    pub base_url: String,

    /// Chat model.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// API key. Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl OpenAiConfig {
    /// Apply `OPENAI_API_KEY`, `OPENAI_MODEL` and `OPENAI_BASE_URL` from `lookup`.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|key| !key.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("OPENAI_MODEL").filter(|model| !model.is_empty()) {
            self.model = model;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL").filter(|url| !url.is_empty()) {
            self.base_url = url;
        }
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            api_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ToolsmithConfig = toml::from_str(
            r#"
            catalog_dir = "/var/lib/toolsmith"

            [generator]
            prompt_samples = 3

            [openai]
            model = "gpt-4o"
            "#,
        )
        .unwrap();

        assert_eq!(config.catalog_dir, PathBuf::from("/var/lib/toolsmith"));
        assert_eq!(config.generator.prompt_samples, 3);
        assert_eq!(config.generator.sample_limit, DEFAULT_SAMPLE_LIMIT);
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", ""),
            ("TOOLSMITH_DB_NAME", "library"),
        ]);

        let config = ToolsmithConfig::default()
            .with_env_from(|key| env.get(key).map(|value| (*value).to_string()));

        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.generator.default_db_name.as_deref(), Some("library"));
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let config = OpenAiConfig::default().with_api_key("secret");
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ToolsmithConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
