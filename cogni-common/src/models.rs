//! Datastore record models
//!
//! Flat rows shared with the classroom web application. Every record is
//! associated with a classroom through `classroom_id`; this service only
//! reads uploads and messages and creates/replaces insight rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A note uploaded to a classroom (typed text or an attached file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub id: String,
    pub classroom_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Upload {
    /// Detected content kind for this upload
    pub fn kind(&self) -> UploadKind {
        UploadKind::detect(self.file_type.as_deref(), self.file_url.as_deref())
    }

    /// Text body, treating missing content as empty
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// A classroom chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub classroom_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A generated insight stored for a classroom
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub classroom_id: String,
    pub insight_type: InsightType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Insight {
    /// Typed view of the metadata column, if it was written by this service
    pub fn parsed_metadata(&self) -> Option<InsightMetadata> {
        serde_json::from_value(self.metadata.clone()).ok()
    }
}

/// Insert payload for a new insight row
#[derive(Debug, Clone, Serialize)]
pub struct NewInsight {
    pub classroom_id: String,
    pub insight_type: InsightType,
    pub content: String,
    pub unit_name: String,
    pub metadata: InsightMetadata,
}

/// Replacement payload for an existing insight row
#[derive(Debug, Clone, Serialize)]
pub struct InsightUpdate {
    pub content: String,
    pub metadata: InsightMetadata,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an upload (used by the seed tool)
#[derive(Debug, Clone, Serialize)]
pub struct NewUpload {
    pub classroom_id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub file_type: String,
}

/// Insert payload for a chat message (used by the seed tool)
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub classroom_id: String,
    pub user_id: String,
    pub content: String,
    pub channel: String,
}

/// Metadata written alongside every generated insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightMetadata {
    /// Number of uploads or messages the insight was generated from
    pub source_count: usize,
    /// Hex SHA-256 of the prompt source text
    pub source_hash: String,
    pub provider: String,
    pub model: String,
    pub last_updated: DateTime<Utc>,
}

/// Kind of generated insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    StudyGuide,
    ConfusionSummary,
}

impl InsightType {
    pub const ALL: [InsightType; 2] = [InsightType::StudyGuide, InsightType::ConfusionSummary];

    /// Value stored in the `insight_type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::StudyGuide => "study_guide",
            InsightType::ConfusionSummary => "confusion_summary",
        }
    }

    /// Display name stored in the `unit_name` column
    pub fn unit_name(&self) -> &'static str {
        match self {
            InsightType::StudyGuide => "Complete Study Guide",
            InsightType::ConfusionSummary => "Confusion Patterns",
        }
    }

    /// Human-readable label used in result messages
    pub fn label(&self) -> &'static str {
        match self {
            InsightType::StudyGuide => "study guide",
            InsightType::ConfusionSummary => "confusion summary",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "study_guide" => Ok(InsightType::StudyGuide),
            "confusion_summary" | "confusion" => Ok(InsightType::ConfusionSummary),
            other => Err(Error::InvalidInput(format!("Unknown insight type '{}'", other))),
        }
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "heic", "heif"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "ppt", "pptx", "odt"];

/// Content kind of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Text,
    Image,
    Document,
}

impl UploadKind {
    /// Detect kind from the declared file type, falling back to the URL extension
    ///
    /// `file_type` may be a short tag (`text`, `image`, `pdf`) or a MIME type
    /// (`image/png`, `application/pdf`). Anything unrecognized is treated as text.
    pub fn detect(file_type: Option<&str>, file_url: Option<&str>) -> Self {
        if let Some(kind) = file_type.and_then(Self::from_declared_type) {
            return kind;
        }

        file_url
            .and_then(url_extension)
            .and_then(|ext| Self::from_extension(&ext))
            .unwrap_or(UploadKind::Text)
    }

    fn from_declared_type(file_type: &str) -> Option<Self> {
        let normalized = file_type.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if normalized == "image" || normalized.starts_with("image/") {
            return Some(UploadKind::Image);
        }
        if normalized == "text" || normalized.starts_with("text/") || normalized == "markdown" {
            return Some(UploadKind::Text);
        }
        if normalized == "document"
            || normalized == "application/pdf"
            || normalized.starts_with("application/vnd.openxmlformats")
            || normalized == "application/msword"
        {
            return Some(UploadKind::Document);
        }

        Self::from_extension(&normalized)
    }

    fn from_extension(ext: &str) -> Option<Self> {
        if IMAGE_EXTENSIONS.contains(&ext) {
            Some(UploadKind::Image)
        } else if DOCUMENT_EXTENSIONS.contains(&ext) {
            Some(UploadKind::Document)
        } else {
            None
        }
    }
}

/// Lowercased extension of the last path segment, ignoring query and fragment
fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = path.rsplit('/').next()?;
    let (_, ext) = last_segment.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}
