//! Insight generation pipeline
//!
//! **Flow per insight:**
//! 1. Fetch the classroom's source rows (uploads or messages)
//! 2. Build the prompt and hash its source text
//! 3. Skip when the stored insight was generated from identical sources (unless forced)
//! 4. Call the configured provider
//! 5. Replace the stored insight row, or create it on first run
//!
//! Fetch failures propagate to the caller. Generation and write failures are
//! reported in the [`ProcessResult`] so a batch of runs can continue.

use chrono::Utc;
use cogni_common::config::PromptLimits;
use cogni_common::models::{Insight, InsightMetadata, InsightType, InsightUpdate, NewInsight};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{GenerationRequest, LlmError, LlmProvider};
use crate::services::image_loader::ImageLoader;
use crate::services::prompt_builder::{
    build_confusion_prompt, build_study_guide_prompt, BuiltPrompt, CONFUSION_SYSTEM_PROMPT,
    STUDY_GUIDE_SYSTEM_PROMPT,
};
use crate::store::{ClassroomStore, StoreError};

/// Outcome of one insight run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub success: bool,
    pub classroom_id: String,
    pub insight_type: InsightType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads_processed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages_processed: Option<usize>,
    /// True when the stored insight was already current
    #[serde(default)]
    pub skipped: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight_id: Option<String>,
}

impl ProcessResult {
    fn new(classroom_id: &str, insight_type: InsightType, sources: usize) -> Self {
        let (uploads_processed, messages_processed) = match insight_type {
            InsightType::StudyGuide => (Some(sources), None),
            InsightType::ConfusionSummary => (None, Some(sources)),
        };

        Self {
            success: true,
            classroom_id: classroom_id.to_string(),
            insight_type,
            uploads_processed,
            messages_processed,
            skipped: false,
            message: String::new(),
            insight_id: None,
        }
    }

    fn fail(mut self, message: String) -> Self {
        self.success = false;
        self.message = message;
        self
    }
}

/// Failure between prompt construction and the insight write
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Wording for result messages
struct Wording {
    title: &'static str,
    label: &'static str,
    source_noun: &'static str,
}

fn wording(insight_type: InsightType) -> Wording {
    match insight_type {
        InsightType::StudyGuide => Wording {
            title: "Study guide",
            label: insight_type.label(),
            source_noun: "uploads",
        },
        InsightType::ConfusionSummary => Wording {
            title: "Confusion summary",
            label: insight_type.label(),
            source_noun: "messages",
        },
    }
}

/// Whether `existing` was generated from the same source text
fn is_up_to_date(existing: Option<&Insight>, source_hash: &str) -> bool {
    existing
        .and_then(Insight::parsed_metadata)
        .is_some_and(|metadata| metadata.source_hash == source_hash)
}

/// Orchestrates fetch → prompt → generate → write for a classroom
pub struct InsightPipeline {
    store: Arc<dyn ClassroomStore>,
    provider: Arc<dyn LlmProvider>,
    images: ImageLoader,
    limits: PromptLimits,
}

impl InsightPipeline {
    pub fn new(
        store: Arc<dyn ClassroomStore>,
        provider: Arc<dyn LlmProvider>,
        limits: PromptLimits,
    ) -> anyhow::Result<Self> {
        let images = ImageLoader::new(limits.max_image_bytes)?;
        Ok(Self {
            store,
            provider,
            images,
            limits,
        })
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn store(&self) -> &Arc<dyn ClassroomStore> {
        &self.store
    }

    /// Run the requested insight kinds in order
    pub async fn run(
        &self,
        classroom_id: &str,
        kinds: &[InsightType],
        force: bool,
    ) -> Result<Vec<ProcessResult>, StoreError> {
        let mut results = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let result = match kind {
                InsightType::StudyGuide => self.generate_study_guide(classroom_id, force).await?,
                InsightType::ConfusionSummary => {
                    self.generate_confusion_summary(classroom_id, force).await?
                }
            };
            results.push(result);
        }
        Ok(results)
    }

    /// Generate (or refresh) the classroom's study guide from all uploads
    pub async fn generate_study_guide(
        &self,
        classroom_id: &str,
        force: bool,
    ) -> Result<ProcessResult, StoreError> {
        info!(classroom_id, force, "Processing classroom study guide");

        let uploads = self.store.fetch_uploads(classroom_id).await?;
        info!(classroom_id, uploads = uploads.len(), "Found uploads");

        let result = ProcessResult::new(classroom_id, InsightType::StudyGuide, uploads.len());
        if uploads.is_empty() {
            info!(classroom_id, "No uploads to process");
            return Ok(ProcessResult {
                message: "No uploads found in this classroom.".to_string(),
                ..result
            });
        }

        let built = build_study_guide_prompt(&uploads, &self.limits);
        self.complete(result, built, STUDY_GUIDE_SYSTEM_PROMPT, force).await
    }

    /// Generate (or refresh) the confusion-pattern summary from recent chat messages
    pub async fn generate_confusion_summary(
        &self,
        classroom_id: &str,
        force: bool,
    ) -> Result<ProcessResult, StoreError> {
        info!(classroom_id, force, "Processing classroom confusion summary");

        let messages = self
            .store
            .fetch_messages(classroom_id, self.limits.max_messages)
            .await?;
        let built = build_confusion_prompt(&messages, &self.limits);
        info!(
            classroom_id,
            messages = built.source_count,
            fetched = messages.len(),
            "Found messages"
        );

        let result = ProcessResult::new(classroom_id, InsightType::ConfusionSummary, built.source_count);
        if built.source_count == 0 {
            info!(classroom_id, "No messages to analyze");
            return Ok(ProcessResult {
                message: "No messages found in this classroom.".to_string(),
                ..result
            });
        }

        self.complete(result, built, CONFUSION_SYSTEM_PROMPT, force).await
    }

    /// Shared tail of every insight run: freshness check, generation, write
    async fn complete(
        &self,
        mut result: ProcessResult,
        built: BuiltPrompt,
        system_prompt: &str,
        force: bool,
    ) -> Result<ProcessResult, StoreError> {
        let insight_type = result.insight_type;
        let words = wording(insight_type);
        let classroom_id = result.classroom_id.clone();

        let existing = self.store.find_insight(&classroom_id, insight_type).await?;
        if !force && is_up_to_date(existing.as_ref(), &built.source_hash) {
            info!(classroom_id = %classroom_id, %insight_type, "Stored insight is current, skipping");
            result.skipped = true;
            result.insight_id = existing.map(|insight| insight.id);
            result.message = format!("{} is already up to date.", words.title);
            return Ok(result);
        }

        if built.truncated {
            warn!(
                classroom_id = %classroom_id,
                %insight_type,
                limit = self.limits.max_source_chars,
                "Source text truncated to fit prompt budget"
            );
        }

        match self.generate_and_save(&classroom_id, insight_type, &built, system_prompt, existing).await {
            Ok(Some(insight_id)) => {
                info!(classroom_id = %classroom_id, %insight_type, insight_id = %insight_id, "Insight saved");
                result.insight_id = Some(insight_id);
                result.message = format!(
                    "{} generated from {} {}.",
                    words.title, built.source_count, words.source_noun
                );
                Ok(result)
            }
            Ok(None) => {
                warn!(classroom_id = %classroom_id, %insight_type, "Provider returned too little content");
                Ok(result.fail(format!("Failed to generate {} content.", words.label)))
            }
            Err(e) => {
                warn!(classroom_id = %classroom_id, %insight_type, error = %e, "Insight generation failed");
                Ok(result.fail(format!("Error generating {}: {}", words.label, e)))
            }
        }
    }

    /// Returns the saved insight id, or `None` when the output was too short to keep
    async fn generate_and_save(
        &self,
        classroom_id: &str,
        insight_type: InsightType,
        built: &BuiltPrompt,
        system_prompt: &str,
        existing: Option<Insight>,
    ) -> Result<Option<String>, GenerationError> {
        let images = self.images.load_all(&built.images).await;

        let request = GenerationRequest::new(built.prompt.clone())
            .with_system_prompt(system_prompt)
            .with_images(images);

        info!(
            classroom_id,
            %insight_type,
            provider = self.provider.name(),
            model = self.provider.model(),
            images = request.images.len(),
            "Generating insight"
        );
        let content = self.provider.generate(&request).await?;
        let content = content.trim();

        if content.chars().count() < self.limits.min_content_chars {
            return Ok(None);
        }

        let metadata = InsightMetadata {
            source_count: built.source_count,
            source_hash: built.source_hash.clone(),
            provider: self.provider.name().to_string(),
            model: self.provider.model().to_string(),
            last_updated: Utc::now(),
        };

        let insight_id = match existing {
            Some(existing) => {
                let update = InsightUpdate {
                    content: content.to_string(),
                    metadata,
                    created_at: Utc::now(),
                };
                self.store.update_insight(&existing.id, &update).await?;
                info!(classroom_id, %insight_type, "Updated existing insight");
                existing.id
            }
            None => {
                let new_insight = NewInsight {
                    classroom_id: classroom_id.to_string(),
                    insight_type,
                    content: content.to_string(),
                    unit_name: insight_type.unit_name().to_string(),
                    metadata,
                };
                let created = self.store.insert_insight(&new_insight).await?;
                info!(classroom_id, %insight_type, "Created new insight");
                created.id
            }
        };

        Ok(Some(insight_id))
    }
}
