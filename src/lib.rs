//! # patrimonial-e2e
#![allow(clippy::uninlined_format_args)]
//!
//! End-to-end scenario and fixture teardown for the Gerência Patrimonial web
//! application.
//!
//! Two commands share one handoff file:
//!
//! ```bash
//! # Drive a browser through register, login, company and branch office creation.
//! # Writes created_data.json on every exit path.
//! patrimonial-e2e scenario --headless
//!
//! # Log in as the generated manager and delete what it owns, then remove
//! # created_data.json. Safe to run unconditionally.
//! patrimonial-e2e teardown
//!
//! # Print the fixture data a run id expands to
//! patrimonial-e2e fixtures --run-id 54321
//! ```
//!
//! ## Narrow viewports
//!
//! The application hides its sidebar behind a menu toggle below the `lg`
//! breakpoint. The scenario tries the wide layout first and falls back to
//! the toggle, so the same run works at any size:
//!
//! ```bash
//! patrimonial-e2e scenario --viewport 375x667
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use patrimonial_e2e::{Fixtures, RunId, Settings, TeardownAgent};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::default();
//! let fixtures = Fixtures::derive(RunId::random());
//! println!("manager: {}", fixtures.manager.email);
//!
//! let outcome = TeardownAgent::new(&settings).run().await;
//! println!("{}", outcome.to_json());
//! # Ok(())
//! # }
//! ```

/// REST client for teardown
pub mod api;

/// Settings and their TOML overrides
pub mod config;

/// Exit-code carrying errors for the binary
pub mod errors;

/// Run identity and generated fixture data
pub mod fixtures;

/// Persisted handoff record and its scoped guards
pub mod handoff;

/// Browser journey
pub mod scenario;

/// Fixture removal through the API
pub mod teardown;

/// Shared value types
pub mod types;

/// WebDriver browser control and automation
pub mod webdriver;

/// Automatic WebDriver process management
pub mod webdriver_manager;

pub use config::Settings;
pub use fixtures::{Fixtures, RunId};
pub use handoff::HandoffRecord;
pub use scenario::{ScenarioError, ScenarioReport, ScenarioRunner};
pub use teardown::{CleanupSummary, TeardownAgent, TeardownOutcome};
pub use types::{NavigationPath, Step, ViewportSize};
pub use webdriver::{Browser, BrowserType, Selector, UiDriver, UiError};
