//! REST client for the Gerência Patrimonial API
//!
//! Only the calls teardown needs: token login, listing a user's companies and
//! branch offices, and deleting them.

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure of one API call, with enough context to investigate by hand
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{operation} failed with HTTP {status} at {url}: {body}")]
    Status {
        operation: &'static str,
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("{operation} request to {url} failed: {source}")]
    Transport {
        operation: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned an unreadable body from {url}: {source}")]
    Decode {
        operation: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    pub fn operation(&self) -> &'static str {
        match self {
            ApiError::Status { operation, .. }
            | ApiError::Transport { operation, .. }
            | ApiError::Decode { operation, .. } => operation,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ApiError::Status { url, .. }
            | ApiError::Transport { url, .. }
            | ApiError::Decode { url, .. } => url,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Resource id as the API returns it, either a number or a string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Number(u64),
    Text(String),
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteId::Number(n) => write!(f, "{n}"),
            RemoteId::Text(s) => f.write_str(s),
        }
    }
}

/// Company or branch office listing entry
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationSummary {
    pub id: RemoteId,
    #[serde(default)]
    pub nome: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: String,
    usuario: UserSummary,
}

#[derive(Debug, Deserialize)]
struct UserSummary {
    id: RemoteId,
}

/// Bearer credential for one authenticated user
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: RemoteId,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(Session),
    /// Any non-200 answer: the user is gone or the password changed
    Rejected(StatusCode),
}

pub struct ApiClient {
    http: Client,
    base: String,
}

impl ApiClient {
    /// `base` may end with a slash, request paths are appended without one
    pub fn new(base: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        let operation = "login";
        let url = self.url("/token/");
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(&json!({ "email": email, "senha": password }))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                operation,
                url: url.clone(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Ok(LoginOutcome::Rejected(response.status()));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|source| ApiError::Decode {
                operation,
                url,
                source,
            })?;
        Ok(LoginOutcome::Authenticated(Session {
            token: token.access,
            user_id: token.usuario.id,
        }))
    }

    pub async fn list_companies(
        &self,
        session: &Session,
    ) -> Result<Vec<OrganizationSummary>, ApiError> {
        let path = format!("/usuarios/{}/empresas/", session.user_id);
        self.fetch("list companies", session, &path).await
    }

    pub async fn list_branch_offices(
        &self,
        session: &Session,
        company: &RemoteId,
    ) -> Result<Vec<OrganizationSummary>, ApiError> {
        let path = format!("/empresas/{}/filiais/", company);
        self.fetch("list branch offices", session, &path).await
    }

    pub async fn delete_company(
        &self,
        session: &Session,
        company: &RemoteId,
    ) -> Result<(), ApiError> {
        let path = format!("/empresas/{}/", company);
        self.delete("delete company", session, &path).await
    }

    pub async fn delete_branch_office(
        &self,
        session: &Session,
        company: &RemoteId,
        branch_office: &RemoteId,
    ) -> Result<(), ApiError> {
        let path = format!("/empresas/{}/filiais/{}/", company, branch_office);
        self.delete("delete branch office", session, &path).await
    }

    /// Delete the authenticated user itself
    pub async fn delete_user(&self, session: &Session) -> Result<(), ApiError> {
        let path = format!("/usuarios/{}/", session.user_id);
        self.delete("delete user", session, &path).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        session: &Session,
        path: &str,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.send(operation, Method::GET, session, &url).await?;
        response
            .json()
            .await
            .map_err(|source| ApiError::Decode {
                operation,
                url,
                source,
            })
    }

    async fn delete(
        &self,
        operation: &'static str,
        session: &Session,
        path: &str,
    ) -> Result<(), ApiError> {
        let url = self.url(path);
        self.send(operation, Method::DELETE, session, &url).await?;
        Ok(())
    }

    /// Send an authenticated request and turn non-2xx answers into errors
    async fn send(
        &self,
        operation: &'static str,
        method: Method,
        session: &Session,
        url: &str,
    ) -> Result<reqwest::Response, ApiError> {
        debug!("{} {}", method, url);
        let response = self
            .http
            .request(method, url)
            .bearer_auth(&session.token)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                operation,
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            operation,
            url: url.to_string(),
            status,
            body,
        })
    }
}
