//! Teardown agent: removes what a scenario run created
//!
//! Logs in with the handoff credentials, deletes every company the manager
//! owns, then the manager. It never fails past its own boundary: remote
//! errors are logged and summarized in the returned outcome, and the handoff
//! file is removed on every path where it existed.
//!
//! A 404 is tolerated per call. A company that is already gone is skipped
//! and the run continues with the next one and the manager itself.

use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::api::{ApiClient, ApiError, LoginOutcome, OrganizationSummary, Session};
use crate::config::Settings;
use crate::handoff::{HandoffRecord, RemoveOnDrop};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub companies_deleted: usize,
    /// Companies that answered 404 on delete
    pub companies_missing: usize,
    pub branch_offices_deleted: usize,
    /// False when the manager was already gone
    pub user_deleted: bool,
}

/// How a teardown run ended
#[derive(Debug)]
pub enum TeardownOutcome {
    /// No handoff file; nothing was contacted
    NothingToClean,
    /// Handoff file lacked credentials
    IncompleteRecord,
    /// Login was rejected, the manager no longer exists
    AlreadyClean,
    Cleaned(CleanupSummary),
    /// Stopped on an error that is not a 404
    Aborted {
        error: anyhow::Error,
        partial: CleanupSummary,
    },
}

impl TeardownOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, TeardownOutcome::Aborted { .. })
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TeardownOutcome::NothingToClean => serde_json::json!({ "outcome": "nothing_to_clean" }),
            TeardownOutcome::IncompleteRecord => {
                serde_json::json!({ "outcome": "incomplete_record" })
            }
            TeardownOutcome::AlreadyClean => serde_json::json!({ "outcome": "already_clean" }),
            TeardownOutcome::Cleaned(summary) => serde_json::json!({
                "outcome": "cleaned",
                "summary": summary,
            }),
            TeardownOutcome::Aborted { error, partial } => serde_json::json!({
                "outcome": "aborted",
                "error": format!("{:#}", error),
                "summary": partial,
            }),
        }
    }
}

pub struct TeardownAgent {
    api_url: String,
    handoff_file: PathBuf,
    timeout: std::time::Duration,
    purge_branch_offices: bool,
}

impl TeardownAgent {
    pub fn new(settings: &Settings) -> Self {
        TeardownAgent {
            api_url: settings.api_url.clone(),
            handoff_file: settings.handoff_file.clone(),
            timeout: settings.timeouts.http(),
            purge_branch_offices: settings.teardown.purge_branch_offices,
        }
    }

    pub async fn run(&self) -> TeardownOutcome {
        info!("Starting cleanup");

        let record = match HandoffRecord::load(&self.handoff_file) {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(
                    "File '{}' not found. Nothing to clean.",
                    self.handoff_file.display()
                );
                return TeardownOutcome::NothingToClean;
            }
            Err(e) => {
                // Unreadable file: remove it so the next run starts clean
                let _remove = RemoveOnDrop::new(&self.handoff_file);
                error!("Unexpected error during cleanup: {:#}", e);
                return TeardownOutcome::Aborted {
                    error: e,
                    partial: CleanupSummary::default(),
                };
            }
        };
        let _remove = RemoveOnDrop::new(&self.handoff_file);

        if !record.is_complete() {
            warn!("Manager credentials missing from handoff file. Cleanup aborted.");
            return TeardownOutcome::IncompleteRecord;
        }

        let api = match ApiClient::new(&self.api_url, self.timeout) {
            Ok(api) => api,
            Err(e) => {
                error!("Unexpected error during cleanup: {}", e);
                return TeardownOutcome::Aborted {
                    error: e.into(),
                    partial: CleanupSummary::default(),
                };
            }
        };

        let mut summary = CleanupSummary::default();
        match self.clean(&api, &record, &mut summary).await {
            Ok(false) => TeardownOutcome::AlreadyClean,
            Ok(true) => {
                info!("Cleanup completed successfully");
                TeardownOutcome::Cleaned(summary)
            }
            Err(e) => {
                log_api_error(&e);
                TeardownOutcome::Aborted {
                    error: e.into(),
                    partial: summary,
                }
            }
        }
    }

    /// Returns false when the login was rejected
    async fn clean(
        &self,
        api: &ApiClient,
        record: &HandoffRecord,
        summary: &mut CleanupSummary,
    ) -> Result<bool, ApiError> {
        info!("Logging in as '{}'", record.gestor_email);
        let session = match api.login(&record.gestor_email, &record.gestor_senha).await? {
            LoginOutcome::Authenticated(session) => session,
            LoginOutcome::Rejected(status) => {
                info!(
                    status = status.as_u16(),
                    "Could not log in as '{}'. The user was probably removed already.",
                    record.gestor_email
                );
                return Ok(false);
            }
        };
        info!("Login succeeded");

        let listed = api.list_companies(&session).await;
        let companies = tolerate_not_found(listed)?.unwrap_or_default();
        if companies.is_empty() {
            info!("No companies found for this manager");
        }

        for company in &companies {
            if self.purge_branch_offices {
                summary.branch_offices_deleted +=
                    self.purge_branch_offices_of(api, &session, company).await?;
            }

            info!("Deleting company '{}' (ID: {})", company.nome, company.id);
            match tolerate_not_found(api.delete_company(&session, &company.id).await)? {
                Some(()) => {
                    info!("Company ID {} deleted", company.id);
                    summary.companies_deleted += 1;
                }
                None => summary.companies_missing += 1,
            }
        }

        info!(
            "Deleting manager '{}' (ID: {})",
            record.gestor_email, session.user_id
        );
        if tolerate_not_found(api.delete_user(&session).await)?.is_some() {
            info!("Manager ID {} deleted", session.user_id);
            summary.user_deleted = true;
        }

        Ok(true)
    }

    async fn purge_branch_offices_of(
        &self,
        api: &ApiClient,
        session: &Session,
        company: &OrganizationSummary,
    ) -> Result<usize, ApiError> {
        let listed = api.list_branch_offices(session, &company.id).await;
        let branch_offices = tolerate_not_found(listed)?.unwrap_or_default();

        let mut deleted = 0;
        for branch_office in &branch_offices {
            info!(
                "Deleting branch office '{}' (ID: {}) of company {}",
                branch_office.nome, branch_office.id, company.id
            );
            let result = api
                .delete_branch_office(session, &company.id, &branch_office.id)
                .await;
            if tolerate_not_found(result)?.is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// Map a 404 to `None`, keep every other error
fn tolerate_not_found<T>(result: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => {
            warn!(
                url = e.url(),
                "Resource not found (404). Probably already deleted. Continuing..."
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn log_api_error(e: &ApiError) {
    match e {
        ApiError::Status {
            operation,
            url,
            status,
            body,
        } => error!(
            operation = *operation,
            url = %url,
            status = status.as_u16(),
            body = %body,
            "API error during cleanup"
        ),
        other => error!(
            operation = other.operation(),
            url = other.url(),
            "Unexpected error during cleanup: {}",
            other
        ),
    }
}
