use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_url, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "intake-bot")]
#[command(about = "Collects a five-step form with a drawn signature over a console transport")]
pub struct CliConfig {
    #[arg(long, help = "TOML configuration file; overrides the path and URL flags")]
    pub config: Option<String>,

    #[arg(long, default_value = "signatures")]
    pub signatures_dir: String,

    #[arg(long, default_value = ".")]
    pub records_dir: String,

    #[arg(long, default_value = "https://localhost:8443/signature")]
    pub web_app_url: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl ConfigProvider for CliConfig {
    fn signatures_dir(&self) -> &str {
        &self.signatures_dir
    }

    fn records_dir(&self) -> &str {
        &self.records_dir
    }

    fn web_app_url(&self) -> &str {
        &self.web_app_url
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("signatures_dir", &self.signatures_dir)?;
        validate_path("records_dir", &self.records_dir)?;
        validate_url("web_app_url", &self.web_app_url)?;
        if let Some(path) = &self.config {
            validate_path("config", path)?;
        }
        Ok(())
    }
}
