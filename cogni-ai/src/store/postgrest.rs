//! PostgREST client for the managed Postgres backend
//!
//! Tables live under `{base_url}/rest/v1/{table}`. Every request carries the
//! service key both as `apikey` and as a bearer token, which bypasses row-level
//! security the same way the web application's server-side code does.

use async_trait::async_trait;
use cogni_common::config::DatastoreConfig;
use cogni_common::models::{
    Insight, InsightType, InsightUpdate, Message, NewInsight, NewMessage, NewUpload, Upload,
};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::{ClassroomStore, StoreError};

const USER_AGENT: &str = concat!("ClassroomCogni/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

const UPLOADS_TABLE: &str = "uploads";
const MESSAGES_TABLE: &str = "messages";
const INSIGHTS_TABLE: &str = "ai_insights";

/// PostgREST datastore client
pub struct PostgrestStore {
    http_client: reqwest::Client,
    rest_url: String,
    service_key: String,
}

impl PostgrestStore {
    /// Create a client for the project at `base_url` (e.g. `https://xyz.supabase.co`)
    pub fn new(base_url: &str, service_key: &str) -> Result<Self, StoreError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(StoreError::Config("datastore URL is empty".to_string()));
        }
        if service_key.trim().is_empty() {
            return Err(StoreError::Config("datastore service key is empty".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rest_url: format!("{}/rest/v1", base_url),
            service_key: service_key.trim().to_string(),
        })
    }

    pub fn from_config(config: &DatastoreConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Config("SUPABASE_URL is not set".to_string()))?;
        let key = config
            .service_key
            .as_deref()
            .ok_or_else(|| StoreError::Config("SUPABASE_SERVICE_KEY is not set".to_string()))?;
        Self::new(url, key)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        tracing::debug!(table, ?query, "Datastore select");

        let response = self
            .request(Method::GET, table)
            .query(query)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let response = check_status(response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::Parse(format!("{} rows: {}", table, e)))
    }

    async fn insert_row<B: Serialize + Sync>(&self, table: &str, body: &B) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }
}

/// Turn non-success responses into [`StoreError::Api`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), %message, "Datastore request failed");
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// `in.(study_guide,confusion_summary)`
fn known_insight_types() -> String {
    let names: Vec<&str> = InsightType::ALL.iter().map(InsightType::as_str).collect();
    format!("in.({})", names.join(","))
}

#[async_trait]
impl ClassroomStore for PostgrestStore {
    async fn fetch_uploads(&self, classroom_id: &str) -> Result<Vec<Upload>, StoreError> {
        self.fetch_rows(
            UPLOADS_TABLE,
            &[
                ("select", "*".to_string()),
                ("classroom_id", eq(classroom_id)),
                ("order", "created_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn fetch_messages(&self, classroom_id: &str, limit: usize) -> Result<Vec<Message>, StoreError> {
        let mut messages: Vec<Message> = self
            .fetch_rows(
                MESSAGES_TABLE,
                &[
                    ("select", "*".to_string()),
                    ("classroom_id", eq(classroom_id)),
                    ("order", "created_at.desc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        // Newest-first from the backend; callers expect conversation order
        messages.reverse();
        Ok(messages)
    }

    async fn find_insight(
        &self,
        classroom_id: &str,
        insight_type: InsightType,
    ) -> Result<Option<Insight>, StoreError> {
        let rows: Vec<Insight> = self
            .fetch_rows(
                INSIGHTS_TABLE,
                &[
                    ("select", "*".to_string()),
                    ("classroom_id", eq(classroom_id)),
                    ("insight_type", eq(insight_type.as_str())),
                    ("order", "created_at.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn list_insights(&self, classroom_id: &str) -> Result<Vec<Insight>, StoreError> {
        // Other tools write this table too; only rows this service understands are returned
        self.fetch_rows(
            INSIGHTS_TABLE,
            &[
                ("select", "*".to_string()),
                ("classroom_id", eq(classroom_id)),
                ("insight_type", known_insight_types()),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn insert_insight(&self, insight: &NewInsight) -> Result<Insight, StoreError> {
        let response = self
            .request(Method::POST, INSIGHTS_TABLE)
            .header("Prefer", "return=representation")
            .json(insight)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let rows: Vec<Insight> = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Parse(format!("inserted insight: {}", e)))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Parse("insert returned no rows".to_string()))
    }

    async fn update_insight(&self, id: &str, update: &InsightUpdate) -> Result<(), StoreError> {
        let response = self
            .request(Method::PATCH, INSIGHTS_TABLE)
            .query(&[("id", eq(id))])
            .header("Prefer", "return=minimal")
            .json(update)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }

    async fn insert_upload(&self, upload: &NewUpload) -> Result<(), StoreError> {
        self.insert_row(UPLOADS_TABLE, upload).await
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<(), StoreError> {
        self.insert_row(MESSAGES_TABLE, message).await
    }
}
