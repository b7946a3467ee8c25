use crate::domain::ports::ConfigProvider;
use crate::utils::error::{IntakeError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SIGNATURES_DIR: &str = "signatures";
pub const DEFAULT_RECORDS_DIR: &str = ".";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub bot: BotConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub name: String,
    pub web_app_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub signatures_dir: Option<String>,
    pub records_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

impl TomlConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| IntakeError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| IntakeError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the value of the environment variable. Unset
    /// variables are left in place and reported by `validate`.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| IntakeError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn verbose(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.verbose)
            .unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

fn unresolved_variable(value: &str) -> Option<&str> {
    let start = value.find("${")? + 2;
    let end = value[start..].find('}')? + start;
    Some(&value[start..end])
}

impl ConfigProvider for TomlConfig {
    fn signatures_dir(&self) -> &str {
        self.storage
            .signatures_dir
            .as_deref()
            .unwrap_or(DEFAULT_SIGNATURES_DIR)
    }

    fn records_dir(&self) -> &str {
        self.storage
            .records_dir
            .as_deref()
            .unwrap_or(DEFAULT_RECORDS_DIR)
    }

    fn web_app_url(&self) -> &str {
        &self.bot.web_app_url
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("bot.name", &self.bot.name)?;

        for value in [
            self.web_app_url(),
            self.signatures_dir(),
            self.records_dir(),
        ] {
            if let Some(var) = unresolved_variable(value) {
                return Err(IntakeError::MissingConfigError {
                    field: format!("environment variable {}", var),
                });
            }
        }

        validate_url("bot.web_app_url", self.web_app_url())?;
        validate_path("storage.signatures_dir", self.signatures_dir())?;
        validate_path("storage.records_dir", self.records_dir())?;
        Ok(())
    }
}
