use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
}

impl ViewportSize {
    /// Parse viewport size from "WIDTHxHEIGHT" format (e.g., "1920x1080")
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('x').collect();
        if parts.len() != 2 {
            anyhow::bail!("Invalid viewport format. Use WIDTHxHEIGHT (e.g., 1920x1080)");
        }

        let width = parts[0]
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid width in viewport size"))?;
        let height = parts[1]
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid height in viewport size"))?;

        Ok(ViewportSize { width, height })
    }
}

/// One stage of the manager journey, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Register,
    Login,
    CreateCompany,
    OpenCompany,
    OpenBranchOffices,
    CreateBranchOffice,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::Register,
        Step::Login,
        Step::CreateCompany,
        Step::OpenCompany,
        Step::OpenBranchOffices,
        Step::CreateBranchOffice,
    ];

    /// 1-based position used in progress logs
    pub fn number(&self) -> usize {
        Step::ALL.iter().position(|s| s == self).unwrap_or(0) + 1
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Register => "register manager",
            Step::Login => "log in",
            Step::CreateCompany => "create company",
            Step::OpenCompany => "open company",
            Step::OpenBranchOffices => "open branch offices",
            Step::CreateBranchOffice => "create branch office",
        };
        f.write_str(name)
    }
}

/// Which layout the branch-office link was reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationPath {
    /// Link clicked directly from the visible sidebar
    Desktop,
    /// Sidebar opened through the menu toggle first
    Mobile,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
