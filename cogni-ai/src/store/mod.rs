//! Classroom datastore access
//!
//! The service reads uploads and messages and replaces insight rows. The
//! [`ClassroomStore`] trait is the seam between the pipeline and the backend;
//! [`PostgrestStore`] talks to the managed Postgres backend over its REST API.

pub mod postgrest;

pub use postgrest::PostgrestStore;

use async_trait::async_trait;
use cogni_common::models::{
    Insight, InsightType, InsightUpdate, Message, NewInsight, NewMessage, NewUpload, Upload,
};
use thiserror::Error;

/// Datastore client errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Datastore error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Read/write access to a classroom's records
#[async_trait]
pub trait ClassroomStore: Send + Sync {
    /// All uploads for a classroom, oldest first
    async fn fetch_uploads(&self, classroom_id: &str) -> Result<Vec<Upload>, StoreError>;

    /// The most recent `limit` messages for a classroom, oldest first
    async fn fetch_messages(&self, classroom_id: &str, limit: usize) -> Result<Vec<Message>, StoreError>;

    /// First insight of the given type for a classroom, if any
    async fn find_insight(
        &self,
        classroom_id: &str,
        insight_type: InsightType,
    ) -> Result<Option<Insight>, StoreError>;

    /// All insights stored for a classroom
    async fn list_insights(&self, classroom_id: &str) -> Result<Vec<Insight>, StoreError>;

    async fn insert_insight(&self, insight: &NewInsight) -> Result<Insight, StoreError>;

    async fn update_insight(&self, id: &str, update: &InsightUpdate) -> Result<(), StoreError>;

    async fn insert_upload(&self, upload: &NewUpload) -> Result<(), StoreError>;

    async fn insert_message(&self, message: &NewMessage) -> Result<(), StoreError>;
}
