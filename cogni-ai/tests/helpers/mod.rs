//! Shared test helpers
//!
//! - `FakeDatastore`: in-memory PostgREST look-alike served by a local axum server
//! - `FakeLlmServer`: records Gemini / OpenAI requests and answers with canned text
//! - `FakeProvider`: in-process `LlmProvider` for pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cogni_ai::llm::{GenerationRequest, LlmError, LlmProvider};
use cogni_ai::services::InsightPipeline;
use cogni_ai::store::PostgrestStore;
use cogni_common::config::PromptLimits;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const SERVICE_KEY: &str = "test-service-key";

/// 1x1 transparent PNG
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

// ============================================================================
// Fake datastore
// ============================================================================

#[derive(Default)]
pub struct DatastoreState {
    pub tables: HashMap<String, Vec<Value>>,
    /// (method, table) for every authorized request
    pub requests: Vec<(String, String)>,
    pub next_id: usize,
    /// Force every table request to fail with this status
    pub fail_with: Option<u16>,
}

#[derive(Clone)]
pub struct FakeDatastore {
    pub base_url: String,
    pub state: Arc<Mutex<DatastoreState>>,
}

impl FakeDatastore {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(DatastoreState::default()));
        let router = Router::new()
            .route(
                "/rest/v1/:table",
                get(select_rows).post(insert_rows).patch(update_rows),
            )
            .route("/files/:name", get(serve_file))
            .with_state(state.clone());

        let base_url = spawn_server(router).await;
        Self { base_url, state }
    }

    pub fn store(&self) -> PostgrestStore {
        PostgrestStore::new(&self.base_url, SERVICE_KEY).unwrap()
    }

    pub fn file_url(&self, name: &str) -> String {
        format!("{}/files/{}", self.base_url, name)
    }

    pub fn insert(&self, table: &str, row: Value) {
        let mut state = self.state.lock().unwrap();
        state.tables.entry(table.to_string()).or_default().push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state.tables.get(table).cloned().unwrap_or_default()
    }

    pub fn request_count(&self, method: &str, table: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .requests
            .iter()
            .filter(|(m, t)| m == method && t == table)
            .count()
    }

    pub fn fail_with(&self, status: u16) {
        self.state.lock().unwrap().fail_with = Some(status);
    }

    /// Add a text upload with a deterministic `created_at`
    pub fn add_upload(&self, classroom_id: &str, id: &str, title: &str, content: &str, minute: u32) {
        self.insert(
            "uploads",
            json!({
                "id": id,
                "classroom_id": classroom_id,
                "user_id": "user-1",
                "title": title,
                "content": content,
                "file_type": "text",
                "file_url": null,
                "created_at": format!("2024-03-01T10:{:02}:00+00:00", minute),
            }),
        );
    }

    pub fn add_image_upload(&self, classroom_id: &str, id: &str, title: &str, url: &str, minute: u32) {
        self.insert(
            "uploads",
            json!({
                "id": id,
                "classroom_id": classroom_id,
                "user_id": "user-1",
                "title": title,
                "content": null,
                "file_type": "image",
                "file_url": url,
                "created_at": format!("2024-03-01T10:{:02}:00+00:00", minute),
            }),
        );
    }

    pub fn add_message(&self, classroom_id: &str, id: &str, content: &str, minute: u32) {
        self.insert(
            "messages",
            json!({
                "id": id,
                "classroom_id": classroom_id,
                "user_id": "user-2",
                "content": content,
                "channel": "general",
                "created_at": format!("2024-03-01T11:{:02}:00+00:00", minute),
            }),
        );
    }
}

fn authorize(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
    apikey == Some(SERVICE_KEY) && bearer == Some(format!("Bearer {}", SERVICE_KEY).as_str())
}

/// Common request gate: auth, forced failures, request log
fn gate(
    state: &Arc<Mutex<DatastoreState>>,
    headers: &HeaderMap,
    method: &Method,
    table: &str,
) -> Option<Response> {
    if !authorize(headers) {
        return Some(
            (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid API key" }))).into_response(),
        );
    }

    let mut state = state.lock().unwrap();
    if let Some(status) = state.fail_with {
        let status = StatusCode::from_u16(status).unwrap();
        return Some((status, Json(json!({ "message": "forced failure" }))).into_response());
    }
    state.requests.push((method.to_string(), table.to_string()));
    None
}

fn matches_filters(row: &Value, query: &[(String, String)]) -> bool {
    query.iter().all(|(key, value)| {
        if matches!(key.as_str(), "select" | "order" | "limit") {
            return true;
        }
        let actual = row[key.as_str()].as_str();
        if let Some(expected) = value.strip_prefix("eq.") {
            return actual == Some(expected);
        }
        if let Some(list) = value.strip_prefix("in.(").and_then(|v| v.strip_suffix(')')) {
            return actual.is_some_and(|actual| list.split(',').any(|item| item == actual));
        }
        true
    })
}

async fn select_rows(
    State(state): State<Arc<Mutex<DatastoreState>>>,
    Path(table): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = gate(&state, &headers, &Method::GET, &table) {
        return rejection;
    }

    let state = state.lock().unwrap();
    let mut rows: Vec<Value> = state
        .tables
        .get(&table)
        .map(|rows| rows.iter().filter(|row| matches_filters(row, &query)).cloned().collect())
        .unwrap_or_default();

    for (key, value) in &query {
        if key == "order" {
            if let Some((column, direction)) = value.split_once('.') {
                rows.sort_by(|a, b| {
                    let a = a[column].as_str().unwrap_or_default().to_string();
                    let b = b[column].as_str().unwrap_or_default().to_string();
                    a.cmp(&b)
                });
                if direction == "desc" {
                    rows.reverse();
                }
            }
        }
    }

    if let Some((_, limit)) = query.iter().find(|(key, _)| key == "limit") {
        let limit: usize = limit.parse().unwrap();
        rows.truncate(limit);
    }

    Json(Value::Array(rows)).into_response()
}

async fn insert_rows(
    State(state): State<Arc<Mutex<DatastoreState>>>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = gate(&state, &headers, &Method::POST, &table) {
        return rejection;
    }

    let mut state = state.lock().unwrap();
    state.next_id += 1;
    let mut row = body;
    if row.get("id").is_none() {
        row["id"] = json!(format!("{}-{}", table, state.next_id));
    }
    if row.get("created_at").is_none() {
        row["created_at"] = json!(chrono::Utc::now().to_rfc3339());
    }
    state.tables.entry(table).or_default().push(row.clone());

    let wants_representation = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("return=representation"));

    if wants_representation {
        (StatusCode::CREATED, Json(json!([row]))).into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}

async fn update_rows(
    State(state): State<Arc<Mutex<DatastoreState>>>,
    Path(table): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = gate(&state, &headers, &Method::PATCH, &table) {
        return rejection;
    }

    let mut state = state.lock().unwrap();
    if let Some(rows) = state.tables.get_mut(&table) {
        for row in rows.iter_mut().filter(|row| matches_filters(row, &query)) {
            if let (Some(target), Some(changes)) = (row.as_object_mut(), body.as_object()) {
                for (key, value) in changes {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
    }

    StatusCode::NO_CONTENT.into_response()
}

async fn serve_file(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "board.png" => ([("content-type", "image/png")], Bytes::from_static(PNG_BYTES)).into_response(),
        "notes.txt" => ([("content-type", "image/png")], Bytes::from_static(b"not really an image")).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

// ============================================================================
// Fake LLM HTTP endpoints
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

pub struct LlmServerState {
    pub reply: String,
    pub status: u16,
    pub calls: Vec<RecordedCall>,
}

#[derive(Clone)]
pub struct FakeLlmServer {
    pub base_url: String,
    pub state: Arc<Mutex<LlmServerState>>,
}

impl FakeLlmServer {
    pub async fn start(reply: &str) -> Self {
        let state = Arc::new(Mutex::new(LlmServerState {
            reply: reply.to_string(),
            status: 200,
            calls: Vec::new(),
        }));

        let router = Router::new()
            .route("/v1beta/models/:call", post(gemini_generate))
            .route("/v1/chat/completions", post(openai_complete))
            .with_state(state.clone());

        let base_url = spawn_server(router).await;
        Self { base_url, state }
    }

    pub fn set_status(&self, status: u16) {
        self.state.lock().unwrap().status = status;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

fn record(state: &Arc<Mutex<LlmServerState>>, path: String, headers: &HeaderMap, body: Value) -> (u16, String) {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect();

    let mut state = state.lock().unwrap();
    state.calls.push(RecordedCall { path, headers, body });
    (state.status, state.reply.clone())
}

async fn gemini_generate(
    State(state): State<Arc<Mutex<LlmServerState>>>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let (status, reply) = record(&state, format!("/v1beta/models/{}", call), &headers, body);
    if status != 200 {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, Json(json!({ "error": { "message": "fake failure" } }))).into_response();
    }

    Json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": reply }] },
            "finishReason": "STOP"
        }]
    }))
    .into_response()
}

async fn openai_complete(
    State(state): State<Arc<Mutex<LlmServerState>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let (status, reply) = record(&state, "/v1/chat/completions".to_string(), &headers, body);
    if status != 200 {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, Json(json!({ "error": { "message": "fake failure" } }))).into_response();
    }

    Json(json!({
        "id": "chatcmpl-test",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": reply },
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

// ============================================================================
// In-process provider
// ============================================================================

pub const GUIDE_TEXT: &str = "# 📚 Complete Study Guide\n\n## 📋 Overview\nCells, mitosis and energy in living things.";

/// Provider that returns canned text (or a rate-limit error when `reply` is `None`)
pub struct FakeProvider {
    pub reply: Mutex<Option<String>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeProvider {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Some(text.to_string())),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_reply(&self, text: &str) {
        *self.reply.lock().unwrap() = Some(text.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.lock().unwrap().clone().ok_or(LlmError::RateLimit)
    }
}

/// Pipeline over a fake datastore and a fake provider
pub fn pipeline(datastore: &FakeDatastore, provider: Arc<FakeProvider>) -> InsightPipeline {
    InsightPipeline::new(Arc::new(datastore.store()), provider, PromptLimits::default()).unwrap()
}
