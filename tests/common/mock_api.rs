// In-process stand-in for the Gerência Patrimonial REST API

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const TOKEN: &str = "test-access-token";

#[derive(Default)]
struct Inner {
    email: String,
    password: String,
    user_id: u64,
    user_exists: bool,
    /// id -> name, in listing order
    companies: Vec<(u64, String)>,
    /// company id -> branch office ids
    branch_offices: HashMap<u64, Vec<u64>>,
    /// Company deletes answering 404 even though listed
    vanished: Vec<u64>,
    /// Company deletes answering 500
    broken: Vec<u64>,
    list_status: Option<StatusCode>,
    calls: Vec<String>,
    unauthenticated_calls: usize,
}

#[derive(Clone)]
pub struct MockApi {
    inner: Arc<Mutex<Inner>>,
}

#[allow(dead_code)]
impl MockApi {
    pub fn with_user(email: &str, password: &str, user_id: u64) -> Self {
        MockApi {
            inner: Arc::new(Mutex::new(Inner {
                email: email.to_string(),
                password: password.to_string(),
                user_id,
                user_exists: true,
                ..Inner::default()
            })),
        }
    }

    /// No user registered: every login answers 401
    pub fn empty() -> Self {
        MockApi {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn company(self, id: u64, name: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .companies
            .push((id, name.to_string()));
        self
    }

    pub fn branch_office(self, company: u64, id: u64) -> Self {
        self.inner
            .lock()
            .unwrap()
            .branch_offices
            .entry(company)
            .or_default()
            .push(id);
        self
    }

    pub fn vanished_company(self, id: u64) -> Self {
        self.inner.lock().unwrap().vanished.push(id);
        self
    }

    pub fn broken_company(self, id: u64) -> Self {
        self.inner.lock().unwrap().broken.push(id);
        self
    }

    pub fn list_status(self, status: StatusCode) -> Self {
        self.inner.lock().unwrap().list_status = Some(status);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn unauthenticated_calls(&self) -> usize {
        self.inner.lock().unwrap().unauthenticated_calls
    }

    pub fn user_exists(&self) -> bool {
        self.inner.lock().unwrap().user_exists
    }

    pub fn remaining_companies(&self) -> Vec<u64> {
        let inner = self.inner.lock().unwrap();
        inner.companies.iter().map(|(id, _)| *id).collect()
    }

    /// Serve on an ephemeral port; returns the API base URL
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/api/token/", post(login))
            .route("/api/usuarios/:id/empresas/", get(list_companies))
            .route("/api/usuarios/:id/", delete(delete_user))
            .route("/api/empresas/:id/", delete(delete_company))
            .route("/api/empresas/:id/filiais/", get(list_branch_offices))
            .route(
                "/api/empresas/:id/filiais/:fid/",
                delete(delete_branch_office),
            )
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    fn record(&self, method: &Method, uri: &Uri, headers: Option<&HeaderMap>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("{} {}", method, uri.path()));

        let Some(headers) = headers else {
            return true;
        };
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {}", TOKEN));
        if !authorized {
            inner.unauthenticated_calls += 1;
        }
        authorized
    }
}

type Reply = Response;

fn reply(status: StatusCode, body: Value) -> Reply {
    (status, Json(body)).into_response()
}

fn not_found() -> Reply {
    let detail = "Não encontrado.";
    reply(StatusCode::NOT_FOUND, json!({ "detail": detail }))
}

fn unauthorized() -> Reply {
    let detail = "Credenciais não fornecidas.";
    reply(StatusCode::UNAUTHORIZED, json!({ "detail": detail }))
}

async fn login(
    State(api): State<MockApi>,
    method: Method,
    uri: Uri,
    Json(body): Json<Value>,
) -> Reply {
    api.record(&method, &uri, None);
    let inner = api.inner.lock().unwrap();
    let accepted = inner.user_exists
        && body["email"] == inner.email
        && body["senha"] == inner.password;
    if !accepted {
        let detail = "Nenhuma conta ativa encontrada com as credenciais fornecidas";
        return reply(StatusCode::UNAUTHORIZED, json!({ "detail": detail }));
    }
    let user = json!({ "id": inner.user_id, "email": inner.email, "tipo_usuario": "GESTOR" });
    reply(
        StatusCode::OK,
        json!({ "access": TOKEN, "refresh": "test-refresh-token", "usuario": user }),
    )
}

async fn list_companies(
    State(api): State<MockApi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Reply {
    if !api.record(&method, &uri, Some(&headers)) {
        return unauthorized();
    }
    let inner = api.inner.lock().unwrap();
    if let Some(status) = inner.list_status {
        return reply(status, json!({ "detail": "listing override" }));
    }
    if !inner.user_exists || id != inner.user_id {
        return not_found();
    }
    let companies: Vec<Value> = inner
        .companies
        .iter()
        .map(|(id, name)| json!({ "id": id, "nome": name, "cnpj": "11222333000154" }))
        .collect();
    reply(StatusCode::OK, Value::Array(companies))
}

async fn delete_company(
    State(api): State<MockApi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Reply {
    if !api.record(&method, &uri, Some(&headers)) {
        return unauthorized();
    }
    let mut inner = api.inner.lock().unwrap();
    if inner.broken.contains(&id) {
        let body = json!({ "detail": "database unavailable" });
        return reply(StatusCode::INTERNAL_SERVER_ERROR, body);
    }
    if inner.vanished.contains(&id) {
        inner.companies.retain(|(cid, _)| *cid != id);
        return not_found();
    }
    let before = inner.companies.len();
    inner.companies.retain(|(cid, _)| *cid != id);
    if inner.companies.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_user(
    State(api): State<MockApi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Reply {
    if !api.record(&method, &uri, Some(&headers)) {
        return unauthorized();
    }
    let mut inner = api.inner.lock().unwrap();
    if !inner.user_exists || id != inner.user_id {
        return not_found();
    }
    inner.user_exists = false;
    StatusCode::NO_CONTENT.into_response()
}

async fn list_branch_offices(
    State(api): State<MockApi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Reply {
    if !api.record(&method, &uri, Some(&headers)) {
        return unauthorized();
    }
    let inner = api.inner.lock().unwrap();
    let listed: Vec<Value> = inner
        .branch_offices
        .get(&id)
        .into_iter()
        .flatten()
        .map(|fid| json!({ "id": fid.to_string(), "nome": format!("Filial {}", fid) }))
        .collect();
    reply(StatusCode::OK, Value::Array(listed))
}

async fn delete_branch_office(
    State(api): State<MockApi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Path((company, id)): Path<(u64, u64)>,
) -> Reply {
    if !api.record(&method, &uri, Some(&headers)) {
        return unauthorized();
    }
    let mut inner = api.inner.lock().unwrap();
    match inner.branch_offices.get_mut(&company) {
        Some(ids) if ids.contains(&id) => {
            ids.retain(|fid| *fid != id);
            StatusCode::NO_CONTENT.into_response()
        }
        _ => not_found(),
    }
}
