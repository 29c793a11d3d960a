//! Prompt construction
//!
//! Concatenates a classroom's uploads (or chat messages) into a single
//! source text, truncates it to the configured character budget and embeds it
//! in the fixed instruction template for the requested insight.

use cogni_common::config::PromptLimits;
use cogni_common::models::{Message, Upload};
use cogni_common::UploadKind;
use sha2::{Digest, Sha256};

pub const STUDY_GUIDE_SYSTEM_PROMPT: &str =
    "You are a helpful educational assistant that creates comprehensive study guides.";

pub const CONFUSION_SYSTEM_PROMPT: &str =
    "You are an experienced teacher who analyzes student questions to find where a class is struggling.";

const NOTES_TRUNCATION_MARKER: &str = "\n\n[Additional notes truncated...]";
const MESSAGES_TRUNCATION_MARKER: &str = "\n\n[Additional messages truncated...]";

/// Image upload referenced from the prompt text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// 1-based number used in the `[Image n attached: ...]` marker
    pub number: usize,
    pub title: String,
    pub url: String,
}

/// A finished prompt plus what went into it
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    pub prompt: String,
    /// Hex SHA-256 of the untruncated source text
    pub source_hash: String,
    /// Number of uploads or messages included
    pub source_count: usize,
    pub truncated: bool,
    pub images: Vec<ImageRef>,
}

/// Hex SHA-256 of `text`
pub fn source_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Cut `text` to at most `max_chars` characters
///
/// Returns `None` when the text already fits. Counts characters, not bytes,
/// so the cut never lands inside a UTF-8 sequence.
pub fn truncate_chars(text: &str, max_chars: usize) -> Option<&str> {
    text.char_indices().nth(max_chars).map(|(idx, _)| &text[..idx])
}

fn apply_budget(source: &str, max_chars: usize, marker: &str) -> (String, bool) {
    match truncate_chars(source, max_chars) {
        Some(prefix) => (format!("{}{}", prefix, marker), true),
        None => (source.to_string(), false),
    }
}

/// Build the study guide prompt from every upload in the classroom
pub fn build_study_guide_prompt(uploads: &[Upload], limits: &PromptLimits) -> BuiltPrompt {
    let mut notes = String::new();
    let mut images = Vec::new();

    for (i, upload) in uploads.iter().enumerate() {
        notes.push_str(&format!("\n--- Note {}: {} ---\n", i + 1, upload.title));

        match upload.kind() {
            UploadKind::Text => notes.push_str(upload.text()),
            UploadKind::Image => {
                let url = upload.file_url.as_deref().filter(|u| !u.trim().is_empty());
                match url {
                    Some(url) if images.len() < limits.max_images => {
                        let number = images.len() + 1;
                        notes.push_str(&format!("[Image {} attached: {}]", number, upload.title));
                        images.push(ImageRef {
                            number,
                            title: upload.title.clone(),
                            url: url.to_string(),
                        });
                    }
                    _ => notes.push_str(&format!("[Image upload not included: {}]", upload.title)),
                }
                if !upload.text().trim().is_empty() {
                    notes.push('\n');
                    notes.push_str(upload.text());
                }
            }
            UploadKind::Document => {
                if upload.text().trim().is_empty() {
                    notes.push_str("[Document attached without extracted text]");
                } else {
                    notes.push_str(upload.text());
                }
            }
        }

        notes.push('\n');
    }

    let hash = source_hash(&notes);
    let (notes_text, truncated) = apply_budget(&notes, limits.max_source_chars, NOTES_TRUNCATION_MARKER);

    let image_hint = if images.is_empty() {
        String::new()
    } else {
        format!(
            "\n{} image(s) of handwritten or photographed notes are attached in order. \
             Read them carefully and include their content in the guide.\n",
            images.len()
        )
    };

    let prompt = format!(
        r#"You are a helpful study assistant. Create a comprehensive study guide based on the following class notes.

CLASS NOTES:
{notes_text}
{image_hint}
Create a well-organized study guide with the following structure:

# 📚 Complete Study Guide

## 📋 Overview
Brief summary of what these notes cover.

## 🔑 Key Concepts
Explain the main concepts clearly with definitions.

## 📝 Important Terms
List key vocabulary with definitions.

## 💡 Main Ideas
Bullet points of the most important takeaways.

## 🧮 Formulas & Equations (if applicable)
Use LaTeX notation: $inline$ or $$display$$

## ❓ Review Questions
5-10 questions to test understanding.

## 🎯 Summary
Key points to remember.

FORMATTING:
- Use proper Markdown with headers (##, ###)
- Use bullet points and numbered lists
- Use **bold** for important terms
- Use tables when helpful
- For math, use LaTeX: $x^2$ or $$\frac{{a}}{{b}}$$
- Be thorough but clear"#
    );

    BuiltPrompt {
        prompt,
        source_hash: hash,
        source_count: uploads.len(),
        truncated,
        images,
    }
}

/// Build the confusion analysis prompt from recent chat messages
///
/// Blank messages are skipped and do not count toward `source_count`.
pub fn build_confusion_prompt(messages: &[Message], limits: &PromptLimits) -> BuiltPrompt {
    let mut transcript = String::new();
    let mut count = 0;

    for message in messages {
        let content = message.content.trim();
        if content.is_empty() {
            continue;
        }
        // Keep one message per line
        let single_line = content.split_whitespace().collect::<Vec<_>>().join(" ");
        transcript.push_str("- ");
        transcript.push_str(&single_line);
        transcript.push('\n');
        count += 1;
    }

    let hash = source_hash(&transcript);
    let (transcript_text, truncated) =
        apply_budget(&transcript, limits.max_source_chars, MESSAGES_TRUNCATION_MARKER);

    let prompt = format!(
        r#"Below are recent messages students posted in their class chat. Identify the patterns of confusion they reveal.

STUDENT MESSAGES ({count}):
{transcript_text}

Write a concise report for the teacher with the following structure:

# 🧭 Confusion Patterns

## 🔥 Top Confusion Topics
Rank the topics students struggle with most. For each, give a short explanation of the misunderstanding and how many messages touch on it.

## 💬 Representative Questions
Quote two or three messages that best illustrate each topic.

## 🔍 Likely Root Causes
Concepts that are commonly mixed up or prerequisites that seem to be missing.

## ✅ Suggested Clarifications
A short, student-friendly explanation for each topic.

## 🎯 Teaching Recommendations
Concrete activities or review steps for the next class.

FORMATTING:
- Use proper Markdown with headers (##, ###)
- Use bullet points and numbered lists
- Use **bold** for key terms
- Do not include student names or identifiers"#
    );

    BuiltPrompt {
        prompt,
        source_hash: hash,
        source_count: count,
        truncated,
        images: Vec::new(),
    }
}
