//! # ClassroomCogni Common Library
//!
//! Shared code for the ClassroomCogni services including:
//! - Datastore record models (uploads, messages, insights)
//! - Content-type detection for uploads
//! - Configuration loading
//! - Error types

pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{InsightType, UploadKind};
