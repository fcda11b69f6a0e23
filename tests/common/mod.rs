// Common test utilities and fixtures

#![allow(dead_code)]

pub mod fake_driver;
pub mod mock_api;

use patrimonial_e2e::Settings;
use patrimonial_e2e::config::Timeouts;
use tempfile::TempDir;

/// Settings pointing every file into a fresh temp directory
pub fn isolated_settings() -> (TempDir, Settings) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let settings = Settings {
        handoff_file: dir.path().join("created_data.json"),
        screenshot_dir: dir.path().to_path_buf(),
        timeouts: Timeouts::instant(),
        ..Settings::default()
    };
    (dir, settings)
}
