use std::fmt;

use crate::config::ConfigError;
use crate::scenario::ScenarioError;

/// Binary-level error carrying the process exit code
#[derive(Debug)]
pub enum E2eError {
    /// Element missing or never became usable (exit code 2)
    ElementUnavailable(String),
    /// WebDriver connection failed (exit code 4)
    WebDriverFailed(String),
    /// A bounded wait ran out (exit code 5)
    Timeout(String),
    /// Settings or arguments rejected (exit code 6)
    Config(String),
    /// Stopped by Ctrl-C (exit code 130)
    Interrupted,
    /// Generic error (exit code 1)
    Other(anyhow::Error),
}

impl E2eError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            E2eError::ElementUnavailable(_) => 2,
            E2eError::WebDriverFailed(_) => 4,
            E2eError::Timeout(_) => 5,
            E2eError::Config(_) => 6,
            E2eError::Interrupted => 130,
            E2eError::Other(_) => 1,
        }
    }
}

impl fmt::Display for E2eError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            E2eError::ElementUnavailable(msg) => write!(f, "Element unavailable: {}", msg),
            E2eError::WebDriverFailed(msg) => write!(f, "WebDriver connection failed: {}", msg),
            E2eError::Timeout(msg) => write!(f, "Operation timed out: {}", msg),
            E2eError::Config(msg) => write!(f, "Configuration error: {}", msg),
            E2eError::Interrupted => write!(f, "Interrupted"),
            E2eError::Other(err) => write!(f, "{:#}", err),
        }
    }
}

impl std::error::Error for E2eError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            E2eError::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<ConfigError> for E2eError {
    fn from(err: ConfigError) -> Self {
        E2eError::Config(err.to_string())
    }
}

impl From<ScenarioError> for E2eError {
    fn from(err: ScenarioError) -> Self {
        if matches!(err, ScenarioError::Interrupted) {
            return E2eError::Interrupted;
        }
        if matches!(err, ScenarioError::Handoff(_)) {
            return E2eError::Other(anyhow::Error::new(err));
        }
        let msg = err.to_string();
        if err.is_timeout() {
            E2eError::Timeout(msg)
        } else {
            E2eError::ElementUnavailable(msg)
        }
    }
}

impl From<anyhow::Error> for E2eError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(config) = err.downcast_ref::<ConfigError>() {
            return E2eError::Config(config.to_string());
        }

        // Connection failures surface as context strings from the driver layer
        let msg = format!("{:#}", err);
        if msg.contains("WebDriver") || msg.contains("geckodriver") || msg.contains("chromedriver")
        {
            E2eError::WebDriverFailed(msg)
        } else {
            E2eError::Other(err)
        }
    }
}

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;
