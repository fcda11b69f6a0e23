//! Runtime settings for the scenario and teardown commands
//!
//! Every deployment URL, UI label and wait bound has a default matching the
//! live Gerência Patrimonial deployment. A TOML file may override any subset
//! of them, and command line flags override the file.
//!
//! ```toml
//! frontend_url = "https://staging.example.com/"
//! api_url = "https://staging-api.example.com/api"
//! headless = true
//!
//! [timeouts]
//! element_secs = 20
//!
//! [labels]
//! company_state = "SP"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::types::ViewportSize;
use crate::webdriver::BrowserType;

pub const DEFAULT_FRONTEND_URL: &str = "https://gerencia-patrimonial.vercel.app/";
pub const DEFAULT_API_URL: &str = "https://gerencia-patrimonial-api.onrender.com/api";
pub const DEFAULT_HANDOFF_FILE: &str = "created_data.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid {field} '{value}': {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Complete settings for one invocation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Front end root the scenario starts from
    pub frontend_url: String,
    /// REST API base, without trailing slash
    pub api_url: String,
    /// Where the handoff record is written and read
    pub handoff_file: PathBuf,
    /// Directory for failure screenshots
    pub screenshot_dir: PathBuf,
    pub browser: BrowserType,
    pub headless: bool,
    pub viewport: Option<ViewportSize>,
    pub timeouts: Timeouts,
    pub labels: Labels,
    pub teardown: TeardownOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            handoff_file: PathBuf::from(DEFAULT_HANDOFF_FILE),
            screenshot_dir: PathBuf::from("."),
            browser: BrowserType::Chrome,
            headless: false,
            viewport: None,
            timeouts: Timeouts::default(),
            labels: Labels::default(),
            teardown: TeardownOptions::default(),
        }
    }
}

/// Wait bounds and settle pauses
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Default bound for an element to become visible or clickable
    pub element_secs: u64,
    /// Bound for the company's access link after creation
    pub company_link_secs: u64,
    /// Short bound for the wide-layout navigation attempt
    pub desktop_nav_secs: u64,
    /// Pause while the mobile sidebar slides in
    pub menu_animation_ms: u64,
    pub after_load_ms: u64,
    pub after_open_register_ms: u64,
    pub after_register_ms: u64,
    pub after_login_ms: u64,
    pub before_save_ms: u64,
    pub after_navigation_ms: u64,
    pub before_branch_form_ms: u64,
    pub before_branch_save_ms: u64,
    pub after_branch_save_ms: u64,
    /// Per-request bound for the REST client
    pub http_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element_secs: 10,
            company_link_secs: 15,
            desktop_nav_secs: 5,
            menu_animation_ms: 4000,
            after_load_ms: 3000,
            after_open_register_ms: 5000,
            after_register_ms: 3000,
            after_login_ms: 1000,
            before_save_ms: 500,
            after_navigation_ms: 5000,
            before_branch_form_ms: 6000,
            before_branch_save_ms: 6000,
            after_branch_save_ms: 11000,
            http_secs: 30,
        }
    }
}

impl Timeouts {
    pub fn element(&self) -> Duration {
        Duration::from_secs(self.element_secs)
    }

    pub fn company_link(&self) -> Duration {
        Duration::from_secs(self.company_link_secs)
    }

    pub fn desktop_nav(&self) -> Duration {
        Duration::from_secs(self.desktop_nav_secs)
    }

    pub fn http(&self) -> Duration {
        Duration::from_secs(self.http_secs)
    }

    /// No settle pauses and one-second waits, for scripted drivers in tests
    pub fn instant() -> Self {
        Self {
            element_secs: 1,
            company_link_secs: 1,
            desktop_nav_secs: 1,
            menu_animation_ms: 0,
            after_load_ms: 0,
            after_open_register_ms: 0,
            after_register_ms: 0,
            after_login_ms: 0,
            before_save_ms: 0,
            after_navigation_ms: 0,
            before_branch_form_ms: 0,
            before_branch_save_ms: 0,
            after_branch_save_ms: 0,
            http_secs: 5,
        }
    }
}

/// Visible UI text the scenario matches against
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub create_account: String,
    pub companies_heading: String,
    pub access_company: String,
    pub branch_offices: String,
    pub company_state: String,
    pub branch_office_state: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            create_account: "Criar Conta".to_string(),
            companies_heading: "Suas Empresas".to_string(),
            access_company: "Acessar Empresa".to_string(),
            branch_offices: "Filiais".to_string(),
            company_state: "AL".to_string(),
            branch_office_state: "DF".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeardownOptions {
    /// Delete each company's branch offices before the company itself
    pub purge_branch_offices: bool,
}

impl Settings {
    /// Load settings from an optional TOML file, falling back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => {
                debug!("Loading settings from {}", path.display());
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Check that both deployment URLs parse
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("frontend_url", &self.frontend_url),
            ("api_url", &self.api_url),
        ] {
            url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
                field,
                value: value.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
