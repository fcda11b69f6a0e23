use anyhow::{Context, Result};
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::types::ViewportSize;
use crate::webdriver_manager::GLOBAL_WEBDRIVER_MANAGER;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Supported browser types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    /// Mozilla Firefox
    Firefox,
    /// Google Chrome/Chromium
    Chrome,
}

impl std::str::FromStr for BrowserType {
    type Err = anyhow::Error;

    /// Parse browser type from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "firefox" => Ok(BrowserType::Firefox),
            "chrome" | "chromium" => Ok(BrowserType::Chrome),
            _ => anyhow::bail!("Unsupported browser: {}", s),
        }
    }
}

impl BrowserType {
    pub fn driver_name(&self) -> &'static str {
        match self {
            BrowserType::Firefox => "geckodriver",
            BrowserType::Chrome => "chromedriver",
        }
    }
}

/// How an element is located on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    XPath(String),
}

impl Selector {
    pub fn id(id: &str) -> Self {
        Selector::Id(id.to_string())
    }

    /// `<button>` whose own text is exactly `text`
    pub fn button_with_text(text: &str) -> Self {
        Selector::XPath(format!("//button[text()={}]", xpath_literal(text)))
    }

    pub fn heading(text: &str) -> Self {
        Selector::XPath(format!("//h1[text()={}]", xpath_literal(text)))
    }

    /// Trigger button of the custom select control
    pub fn combobox() -> Self {
        Selector::XPath("//button[@role='combobox']".to_string())
    }

    /// Item of an open select list, matched on its full text
    pub fn option(label: &str) -> Self {
        Selector::XPath(format!("//div[@role='option' and .={}]", xpath_literal(label)))
    }

    pub fn link_containing(text: &str) -> Self {
        Selector::XPath(format!("//a[contains(., {})]", xpath_literal(text)))
    }

    /// Link inside the card that shows `company`
    ///
    /// Climbs from the title to the nearest enclosing element that holds such
    /// a link, so sibling cards in the same grid never match.
    pub fn company_link(company: &str, link_text: &str) -> Self {
        let link = format!("a[contains(., {})]", xpath_literal(link_text));
        Selector::XPath(format!(
            "//div[text()={}]/ancestor::div[.//{link}][1]//{link}",
            xpath_literal(company)
        ))
    }

    /// Sidebar toggle rendered only below the `lg` breakpoint
    pub fn menu_toggle() -> Self {
        Selector::XPath("//div[contains(@class, 'lg:hidden')]//button".to_string())
    }

    fn locator(&self) -> Locator<'_> {
        match self {
            Selector::Id(id) => Locator::Id(id),
            Selector::XPath(xpath) => Locator::XPath(xpath),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(id) => write!(f, "#{id}"),
            Selector::XPath(xpath) => f.write_str(xpath),
        }
    }
}

/// Quote a string for use inside an XPath expression
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts: Vec<String> = value
            .split('\'')
            .map(|part| format!("'{part}'"))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Element state a bounded wait is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Present,
    Visible,
    Clickable,
    Hidden,
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Readiness::Present => "present",
            Readiness::Visible => "visible",
            Readiness::Clickable => "clickable",
            Readiness::Hidden => "hidden",
        })
    }
}

#[derive(Debug, Error)]
pub enum UiError {
    #[error("Timed out after {}s waiting for {selector} to be {state}", .waited.as_secs_f64())]
    Timeout {
        selector: String,
        state: Readiness,
        waited: Duration,
    },
    #[error("WebDriver {action} failed: {message}")]
    Command {
        action: &'static str,
        message: String,
    },
}

impl UiError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, UiError::Timeout { .. })
    }

    fn command(action: &'static str, err: impl fmt::Display) -> Self {
        UiError::Command {
            action,
            message: err.to_string(),
        }
    }
}

/// Browser automation capability the scenario drives
#[allow(async_fn_in_trait)]
pub trait UiDriver {
    type Element;

    async fn goto(&self, url: &str) -> Result<(), UiError>;

    /// Locate an element that should already be on the page
    async fn find(&self, selector: &Selector) -> Result<Self::Element, UiError>;

    async fn wait_visible(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Self::Element, UiError>;

    async fn wait_clickable(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Self::Element, UiError>;

    /// Wait until no element matching `selector` is displayed
    async fn wait_invisible(&self, selector: &Selector, timeout: Duration)
    -> Result<(), UiError>;

    /// Simulated pointer click
    async fn click(&self, element: &Self::Element) -> Result<(), UiError>;

    async fn type_text(&self, element: &Self::Element, text: &str) -> Result<(), UiError>;

    async fn scroll_into_view(&self, element: &Self::Element, center: bool)
    -> Result<(), UiError>;

    /// Click dispatched through the DOM instead of the pointer pipeline
    async fn js_click(&self, element: &Self::Element) -> Result<(), UiError>;

    async fn pause(&self, duration: Duration);

    async fn save_screenshot(&self, path: &Path) -> Result<(), UiError>;
}

/// WebDriver-backed browser session
pub struct Browser {
    client: Client,
    implicit_wait: Duration,
    // Chrome user-data-dir, removed when the session ends
    _profile_dir: Option<tempfile::TempDir>,
}

impl Browser {
    /// Start (or reuse) a WebDriver and open a new session
    pub async fn connect(
        browser_type: BrowserType,
        viewport: Option<ViewportSize>,
        headless: bool,
    ) -> Result<Self> {
        info!("Connecting to {:?} WebDriver", browser_type);

        let webdriver_url = GLOBAL_WEBDRIVER_MANAGER
            .ensure_driver(&browser_type)
            .await?;

        let mut caps = serde_json::Map::new();
        let mut profile_dir = None;

        match &browser_type {
            BrowserType::Firefox => {
                let mut args = Vec::new();
                if headless {
                    args.push("--headless".to_string());
                }
                if let Some(vp) = &viewport {
                    args.push(format!("--width={}", vp.width));
                    args.push(format!("--height={}", vp.height));
                }
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            BrowserType::Chrome => {
                let mut args = vec!["--no-sandbox".to_string()];
                if headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                    args.push("--disable-dev-shm-usage".to_string());
                }
                if let Some(vp) = &viewport {
                    args.push(format!("--window-size={},{}", vp.width, vp.height));
                }

                // Separate profile per session, Chrome refuses to share one
                let dir = tempfile::Builder::new()
                    .prefix("patrimonial-e2e-chrome-")
                    .tempdir()?;
                args.push(format!("--user-data-dir={}", dir.path().display()));
                profile_dir = Some(dir);

                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }

        debug!("Connecting to WebDriver at {}", webdriver_url);
        let client = ClientBuilder::rustls()
            .capabilities(caps)
            .connect(&webdriver_url)
            .await
            .context(format!(
                "Failed to connect to WebDriver at {}",
                webdriver_url
            ))?;

        if let Some(vp) = viewport {
            debug!("Setting viewport to {}x{}", vp.width, vp.height);
            if let Err(e) = client.set_window_size(vp.width, vp.height).await {
                debug!("Note: Could not set window size: {}", e);
            }
        }

        Ok(Browser {
            client,
            implicit_wait: Duration::from_secs(5),
            _profile_dir: profile_dir,
        })
    }

    pub async fn close(self) -> Result<()> {
        self.client
            .close()
            .await
            .context("Failed to close browser session")
    }

    /// Poll until an element matching `selector` reaches `state`
    async fn poll(
        &self,
        selector: &Selector,
        state: Readiness,
        timeout: Duration,
    ) -> Result<Option<Element>, UiError> {
        debug!("Waiting up to {:?} for {} to be {}", timeout, selector, state);
        let deadline = Instant::now() + timeout;

        loop {
            let found = self
                .client
                .find_all(selector.locator())
                .await
                .map_err(|e| UiError::command("find", e))?;

            if state == Readiness::Hidden {
                let mut all_hidden = true;
                for element in &found {
                    if !Self::is_ready(element, state).await {
                        all_hidden = false;
                        break;
                    }
                }
                if all_hidden {
                    return Ok(None);
                }
            } else {
                for element in found {
                    if Self::is_ready(&element, state).await {
                        return Ok(Some(element));
                    }
                }
            }

            if Instant::now() >= deadline {
                return Err(UiError::Timeout {
                    selector: selector.to_string(),
                    state,
                    waited: timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_ready(element: &Element, state: Readiness) -> bool {
        // Stale or detached elements count as not ready
        match state {
            Readiness::Present => true,
            Readiness::Visible => element.is_displayed().await.unwrap_or(false),
            Readiness::Clickable => {
                element.is_displayed().await.unwrap_or(false)
                    && element.is_enabled().await.unwrap_or(false)
            }
            Readiness::Hidden => !element.is_displayed().await.unwrap_or(false),
        }
    }

    async fn poll_element(
        &self,
        selector: &Selector,
        state: Readiness,
        timeout: Duration,
    ) -> Result<Element, UiError> {
        self.poll(selector, state, timeout)
            .await?
            .ok_or_else(|| UiError::Timeout {
                selector: selector.to_string(),
                state,
                waited: timeout,
            })
    }

    async fn run_script(
        &self,
        action: &'static str,
        script: &str,
        element: &Element,
    ) -> Result<(), UiError> {
        let arg = serde_json::to_value(element).map_err(|e| UiError::command(action, e))?;
        self.client
            .execute(script, vec![arg])
            .await
            .map_err(|e| UiError::command(action, e))?;
        Ok(())
    }
}

impl UiDriver for Browser {
    type Element = Element;

    async fn goto(&self, url: &str) -> Result<(), UiError> {
        info!("Navigating to {}", url);
        self.client
            .goto(url)
            .await
            .map_err(|e| UiError::command("navigation", e))
    }

    async fn find(&self, selector: &Selector) -> Result<Element, UiError> {
        self.poll_element(selector, Readiness::Present, self.implicit_wait)
            .await
    }

    async fn wait_visible(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Element, UiError> {
        self.poll_element(selector, Readiness::Visible, timeout)
            .await
    }

    async fn wait_clickable(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Element, UiError> {
        self.poll_element(selector, Readiness::Clickable, timeout)
            .await
    }

    async fn wait_invisible(&self, selector: &Selector, timeout: Duration) -> Result<(), UiError> {
        self.poll(selector, Readiness::Hidden, timeout).await?;
        Ok(())
    }

    async fn click(&self, element: &Element) -> Result<(), UiError> {
        element
            .click()
            .await
            .map_err(|e| UiError::command("click", e))
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<(), UiError> {
        element
            .send_keys(text)
            .await
            .map_err(|e| UiError::command("send keys", e))
    }

    async fn scroll_into_view(&self, element: &Element, center: bool) -> Result<(), UiError> {
        let script = if center {
            "arguments[0].scrollIntoView({block: 'center'});"
        } else {
            "arguments[0].scrollIntoView(true);"
        };
        self.run_script("scroll", script, element).await
    }

    async fn js_click(&self, element: &Element) -> Result<(), UiError> {
        self.run_script("script click", "arguments[0].click();", element)
            .await
    }

    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    async fn save_screenshot(&self, path: &Path) -> Result<(), UiError> {
        let png = self
            .client
            .screenshot()
            .await
            .map_err(|e| UiError::command("screenshot", e))?;
        std::fs::write(path, png).map_err(|e| UiError::command("screenshot", e))?;
        info!("Screenshot saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
#[path = "webdriver_test.rs"]
mod webdriver_test;
