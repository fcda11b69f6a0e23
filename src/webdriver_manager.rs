use anyhow::{Context, Result};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::webdriver::BrowserType;

/// Starts chromedriver/geckodriver on demand and stops what it started
#[derive(Default)]
pub struct WebDriverManager {
    processes: Mutex<Vec<DriverProcess>>,
}

struct DriverProcess {
    browser_type: BrowserType,
    child: Child,
    port: u16,
    url: String,
}

impl WebDriverManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the URL of a ready driver, starting one if nothing answers
    pub async fn ensure_driver(&self, browser_type: &BrowserType) -> Result<String> {
        let managed: Vec<String> = self
            .processes
            .lock()
            .map(|processes| {
                processes
                    .iter()
                    .filter(|p| p.browser_type == *browser_type)
                    .map(|p| p.url.clone())
                    .collect()
            })
            .unwrap_or_default();

        for url in managed {
            if Self::is_driver_ready(&url).await {
                debug!("Using managed WebDriver at {}", url);
                return Ok(url);
            }
        }

        let standard = format!("http://localhost:{}", Self::standard_port(browser_type));
        if Self::is_driver_ready(&standard).await {
            debug!("Found external WebDriver at {}", standard);
            return Ok(standard);
        }

        info!(
            "WebDriver not detected, starting {}",
            browser_type.driver_name()
        );
        self.start_driver(browser_type).await
    }

    async fn start_driver(&self, browser_type: &BrowserType) -> Result<String> {
        let command = browser_type.driver_name();
        if !Self::command_exists(command) {
            anyhow::bail!(
                "{} not found in PATH. Install it or start it manually on port {}",
                command,
                Self::standard_port(browser_type)
            );
        }

        let port = Self::find_free_port_for_browser(browser_type)?;
        let port_arg = match browser_type {
            BrowserType::Firefox => vec!["--port".to_string(), port.to_string()],
            BrowserType::Chrome => vec![format!("--port={}", port)],
        };

        let child = Command::new(command)
            .args(&port_arg)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context(format!("Failed to start {}", command))?;

        let url = format!("http://localhost:{}", port);
        if let Ok(mut processes) = self.processes.lock() {
            processes.push(DriverProcess {
                browser_type: *browser_type,
                child,
                port,
                url: url.clone(),
            });
        }

        // 3 seconds total
        for _ in 0..30 {
            if Self::is_driver_running(&url).await {
                info!("{} started on port {}", command, port);
                return Ok(url);
            }
            sleep(Duration::from_millis(100)).await;
        }

        self.stop_port(port);
        anyhow::bail!("WebDriver failed to start within timeout")
    }

    fn standard_port(browser_type: &BrowserType) -> u16 {
        match browser_type {
            BrowserType::Firefox => 4444,
            BrowserType::Chrome => 9515,
        }
    }

    /// Check if a command exists in PATH
    pub fn command_exists(command: &str) -> bool {
        let finder = if cfg!(windows) { "where" } else { "which" };
        Command::new(finder)
            .arg(command)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Prefer the browser's conventional ports, else let the OS pick one
    pub fn find_free_port_for_browser(browser_type: &BrowserType) -> Result<u16> {
        let base = Self::standard_port(browser_type);
        for port in base..base + 3 {
            if !Self::is_port_in_use(port) {
                return Ok(port);
            }
            debug!("Port {} is in use", port);
        }

        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        Ok(listener.local_addr()?.port())
    }

    pub fn is_port_in_use(port: u16) -> bool {
        std::net::TcpListener::bind(("127.0.0.1", port)).is_err()
    }

    /// Something answers on `/status`
    pub async fn is_driver_running(url: &str) -> bool {
        match reqwest::Client::new()
            .get(format!("{}/status", url))
            .timeout(Duration::from_secs(1))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// The driver reports `value.ready == true`
    async fn is_driver_ready(url: &str) -> bool {
        let response = match reqwest::Client::new()
            .get(format!("{}/status", url))
            .timeout(Duration::from_secs(1))
            .send()
            .await
        {
            Ok(response) => response,
            Err(_) => return false,
        };

        response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.pointer("/value/ready").and_then(|r| r.as_bool()))
            .unwrap_or(false)
    }

    fn stop_port(&self, port: u16) {
        if let Ok(mut processes) = self.processes.lock()
            && let Some(index) = processes.iter().position(|p| p.port == port)
        {
            let mut process = processes.remove(index);
            let _ = process.child.kill();
            let _ = process.child.wait();
        }
    }

    /// Stop every driver this manager started
    pub fn stop_all(&self) {
        if let Ok(mut processes) = self.processes.lock() {
            for process in processes.iter_mut() {
                debug!("Stopping WebDriver on port {}", process.port);
                let _ = process.child.kill();
                let _ = process.child.wait();
            }
            processes.clear();
        }
    }
}

impl Drop for WebDriverManager {
    fn drop(&mut self) {
        self.stop_all();
    }
}

lazy_static::lazy_static! {
    pub static ref GLOBAL_WEBDRIVER_MANAGER: WebDriverManager = WebDriverManager::new();
}

#[cfg(test)]
#[path = "webdriver_manager_test.rs"]
mod webdriver_manager_test;
