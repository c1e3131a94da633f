//! Contracts for the external collaborators the pipeline drives.
//!
//! The core owns none of these: persistent preferences, the chat platform,
//! content safety, and thumbnail normalization all live in the host bot.
//! Hosts implement these traits; the integration tests ship in-memory
//! versions.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TransportError;
use crate::media::{ChatId, MediaRef, UserId};

/// Which text the classifiers read for a given user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePreference {
    #[default]
    Filename,
    Caption,
}

/// Per-user metadata fields for the tagging stage. Each field has a fixed
/// placeholder default used when the store has nothing better.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFields {
    pub title: String,
    pub artist: String,
    pub author: String,
    pub video_title: String,
    pub audio_title: String,
    pub subtitle_title: String,
}

impl Default for MetadataFields {
    fn default() -> Self {
        Self {
            title: "Encoded by RenameBot".to_string(),
            artist: "RenameBot".to_string(),
            author: "RenameBot".to_string(),
            video_title: "Encoded by RenameBot".to_string(),
            audio_title: "By RenameBot".to_string(),
            subtitle_title: "By RenameBot".to_string(),
        }
    }
}

/// Read side of the per-user preference store. The core never writes
/// preferences; the host bot's command surface does that.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// The user's rename template, if one has been configured.
    async fn rename_template(&self, user: UserId) -> Result<Option<String>>;

    async fn source_preference(&self, user: UserId) -> Result<SourcePreference>;

    /// Stored upload caption for a chat, if any.
    async fn caption(&self, chat: ChatId) -> Result<Option<String>>;

    /// The user's stored thumbnail, if any.
    async fn thumbnail(&self, user: UserId) -> Result<Option<MediaRef>>;

    /// Whether the tagging stage runs for this user.
    async fn metadata_enabled(&self, user: UserId) -> Result<bool>;

    async fn metadata_fields(&self, user: UserId) -> Result<MetadataFields>;
}

/// Progress callback for long transfers. Invoked often; implementations
/// must not block the transfer.
pub trait ProgressSink: Send + Sync {
    fn update(&self, transferred: u64, total: u64);
}

/// Default sink: logs once per ten-percent step.
pub struct LogProgress {
    label: &'static str,
    last_step: AtomicU64,
}

impl LogProgress {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            last_step: AtomicU64::new(u64::MAX),
        }
    }
}

impl ProgressSink for LogProgress {
    fn update(&self, transferred: u64, total: u64) {
        if total == 0 {
            return;
        }
        let step = transferred.saturating_mul(100) / total / 10 * 10;
        if self.last_step.swap(step, Ordering::Relaxed) != step {
            debug!(label = self.label, percent = step, "transfer progress");
        }
    }
}

/// One outbound upload. Kind dispatch happens in the pipeline; the
/// transport only sees the parameters.
#[derive(Debug)]
pub struct Upload<'a> {
    pub chat: ChatId,
    pub path: &'a Path,
    pub caption: &'a str,
    pub thumbnail: Option<&'a Path>,
}

/// File transfer through the chat platform. Both directions may signal
/// `TransportError::RateLimited` with a mandated wait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `media` to `dest`; returns the actual local path written.
    async fn download(
        &self,
        media: &MediaRef,
        dest: &Path,
        progress: Option<&dyn ProgressSink>,
    ) -> std::result::Result<PathBuf, TransportError>;

    async fn upload_document(
        &self,
        upload: &Upload<'_>,
        progress: Option<&dyn ProgressSink>,
    ) -> std::result::Result<(), TransportError>;

    async fn upload_video(
        &self,
        upload: &Upload<'_>,
        progress: Option<&dyn ProgressSink>,
    ) -> std::result::Result<(), TransportError>;

    async fn upload_audio(
        &self,
        upload: &Upload<'_>,
        progress: Option<&dyn ProgressSink>,
    ) -> std::result::Result<(), TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageId(pub i64);

/// Plain-text messaging, used for the single in-place status message and
/// for user-facing outcomes.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn post(&self, chat: ChatId, text: &str)
        -> std::result::Result<MessageId, TransportError>;

    async fn edit(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> std::result::Result<(), TransportError>;

    async fn delete(
        &self,
        chat: ChatId,
        message: MessageId,
    ) -> std::result::Result<(), TransportError>;
}

/// Content-safety check over the filename and message context. An internal
/// failure is treated by the pipeline as fail-closed.
#[async_trait]
pub trait ContentSafety: Send + Sync {
    async fn is_unsafe(&self, filename: &str, caption: Option<&str>) -> Result<bool>;
}

/// Resizes/normalizes a fetched thumbnail. Failure is non-fatal to the
/// pipeline; the upload just goes out bare.
#[async_trait]
pub trait ThumbnailNormalizer: Send + Sync {
    async fn normalize(&self, path: &Path) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_preference_defaults_to_filename() {
        assert_eq!(SourcePreference::default(), SourcePreference::Filename);
        assert_eq!(
            serde_json::from_str::<SourcePreference>("\"caption\"").unwrap(),
            SourcePreference::Caption
        );
    }

    #[test]
    fn metadata_fields_have_placeholder_defaults() {
        let fields = MetadataFields::default();
        assert!(!fields.title.is_empty());
        assert!(!fields.subtitle_title.is_empty());
    }

    #[test]
    fn log_progress_tolerates_zero_totals() {
        let sink = LogProgress::new("test");
        sink.update(0, 0);
        sink.update(50, 100);
        sink.update(55, 100);
    }
}
