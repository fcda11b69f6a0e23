// Scripted UiDriver that records every interaction

use patrimonial_e2e::webdriver::Readiness;
use patrimonial_e2e::{Selector, UiDriver, UiError};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Elements are identified by their selector text
pub type FakeElement = String;

#[derive(Default)]
pub struct FakeDriver {
    actions: Mutex<Vec<String>>,
    /// Selectors that never show up
    missing: Vec<String>,
    /// Elements whose script click raises
    broken_js_click: Vec<String>,
    /// Lookups that fail with a driver error instead of timing out
    failing: Vec<String>,
    /// Elements that never disappear
    still_visible: Vec<String>,
    /// Lookups that never complete
    stalled: Vec<String>,
    /// Sidebar hidden until the menu toggle is clicked
    narrow: bool,
    menu_open: Mutex<bool>,
    paused: Mutex<Duration>,
}

#[allow(dead_code)]
impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn narrow() -> Self {
        FakeDriver {
            narrow: true,
            ..Self::default()
        }
    }

    pub fn without(mut self, selector: Selector) -> Self {
        self.missing.push(selector.to_string());
        self
    }

    pub fn with_broken_js_click(mut self, selector: Selector) -> Self {
        self.broken_js_click.push(selector.to_string());
        self
    }

    pub fn failing(mut self, selector: Selector) -> Self {
        self.failing.push(selector.to_string());
        self
    }

    pub fn still_visible(mut self, selector: Selector) -> Self {
        self.still_visible.push(selector.to_string());
        self
    }

    pub fn stalled_at(mut self, selector: Selector) -> Self {
        self.stalled.push(selector.to_string());
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    pub fn total_pause(&self) -> Duration {
        *self.paused.lock().unwrap()
    }

    /// Index of the first action equal to `action`
    pub fn position(&self, action: &str) -> Option<usize> {
        self.actions().iter().position(|a| a == action)
    }

    pub fn did(&self, action: &str) -> bool {
        self.position(action).is_some()
    }

    /// Any recorded action mentions `fragment`
    pub fn touched(&self, fragment: &str) -> bool {
        self.actions().iter().any(|a| a.contains(fragment))
    }

    fn push(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }

    async fn locate(
        &self,
        kind: &str,
        selector: &Selector,
        state: Readiness,
        timeout: Duration,
    ) -> Result<FakeElement, UiError> {
        let key = selector.to_string();
        self.push(format!("{kind} {key}"));

        if self.stalled.contains(&key) {
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&key) {
            return Err(UiError::Command {
                action: "find",
                message: "invalid session id".to_string(),
            });
        }

        let hidden_by_layout = self.narrow
            && key == Selector::link_containing("Filiais").to_string()
            && !*self.menu_open.lock().unwrap();

        if self.missing.contains(&key) || hidden_by_layout {
            return Err(UiError::Timeout {
                selector: key,
                state,
                waited: timeout,
            });
        }
        Ok(key)
    }
}

impl UiDriver for FakeDriver {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> Result<(), UiError> {
        self.push(format!("goto {url}"));
        Ok(())
    }

    async fn find(&self, selector: &Selector) -> Result<FakeElement, UiError> {
        self.locate("find", selector, Readiness::Present, Duration::from_secs(5))
            .await
    }

    async fn wait_visible(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<FakeElement, UiError> {
        self.locate("wait_visible", selector, Readiness::Visible, timeout)
            .await
    }

    async fn wait_clickable(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<FakeElement, UiError> {
        self.locate("wait_clickable", selector, Readiness::Clickable, timeout)
            .await
    }

    async fn wait_invisible(&self, selector: &Selector, timeout: Duration) -> Result<(), UiError> {
        let key = selector.to_string();
        self.push(format!("wait_invisible {key}"));
        if self.still_visible.contains(&key) {
            return Err(UiError::Timeout {
                selector: key,
                state: Readiness::Hidden,
                waited: timeout,
            });
        }
        Ok(())
    }

    async fn click(&self, element: &FakeElement) -> Result<(), UiError> {
        if *element == Selector::menu_toggle().to_string() {
            *self.menu_open.lock().unwrap() = true;
        }
        self.push(format!("click {element}"));
        Ok(())
    }

    async fn type_text(&self, element: &FakeElement, text: &str) -> Result<(), UiError> {
        self.push(format!("type {element} {text}"));
        Ok(())
    }

    async fn scroll_into_view(&self, element: &FakeElement, center: bool) -> Result<(), UiError> {
        self.push(format!(
            "scroll {element}{}",
            if center { " center" } else { "" }
        ));
        Ok(())
    }

    async fn js_click(&self, element: &FakeElement) -> Result<(), UiError> {
        self.push(format!("js_click {element}"));
        if self.broken_js_click.contains(element) {
            return Err(UiError::Command {
                action: "script click",
                message: "javascript error: element is detached".to_string(),
            });
        }
        Ok(())
    }

    async fn pause(&self, duration: Duration) {
        *self.paused.lock().unwrap() += duration;
    }

    async fn save_screenshot(&self, path: &Path) -> Result<(), UiError> {
        self.push(format!("screenshot {}", path.display()));
        std::fs::write(path, b"\x89PNG fake").map_err(|e| UiError::Command {
            action: "screenshot",
            message: e.to_string(),
        })
    }
}
