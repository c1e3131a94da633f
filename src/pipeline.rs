//! The rename pipeline: one invocation per inbound file event.
//!
//! Stages run strictly in order: load preferences, duplicate check,
//! content check, source-text selection, extraction, rendering, download,
//! metadata tagging, thumbnail preparation, upload. Every run ends in
//! cleanup, whatever the outcome, and progress is reported by editing a
//! single status message in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{StageError, TransportError};
use crate::extract::Extracted;
use crate::guard::DuplicateGuard;
use crate::media::{ChatId, IncomingFile, MediaKind, UserId};
use crate::services::{
    ContentSafety, LogProgress, MessageId, Messenger, PreferenceStore, ProgressSink,
    SourcePreference, ThumbnailNormalizer, Transport, Upload,
};
use crate::tagger::MetadataTagger;
use crate::template::target_filename;

const NO_TEMPLATE_MESSAGE: &str = "Please set a rename format first with /autorename.";
const REJECTED_MESSAGE: &str = "Unsafe content detected; file skipped.";

/// How one pipeline invocation ended.
#[derive(Debug)]
pub enum Outcome {
    Completed { file_name: String },
    /// The user has no rename template configured. A precondition, not an
    /// error; the user gets setup instructions.
    NoTemplate,
    /// Same file id was already in flight. Silent.
    Duplicate,
    /// The content check flagged the file.
    Rejected,
    Failed(StageError),
}

/// External collaborators, one per seam the pipeline drives.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn PreferenceStore>,
    pub transport: Arc<dyn Transport>,
    pub messenger: Arc<dyn Messenger>,
    pub safety: Arc<dyn ContentSafety>,
    pub tagger: Arc<dyn MetadataTagger>,
    pub thumbnails: Arc<dyn ThumbnailNormalizer>,
}

pub struct Pipeline {
    services: Services,
    config: PipelineConfig,
    guard: DuplicateGuard,
}

enum StagesOutcome {
    Uploaded(String),
    Rejected,
}

impl Pipeline {
    pub fn new(services: Services, config: PipelineConfig) -> Self {
        let guard = DuplicateGuard::with_window(config.dedup_window);
        Self {
            services,
            config,
            guard,
        }
    }

    /// Process one inbound file event end to end. Never panics on
    /// collaborator failure; every exit path releases the duplicate-guard
    /// entry and removes the temporary files the run created.
    pub async fn handle(&self, file: IncomingFile) -> Outcome {
        info!(
            file_id = %file.file_id,
            kind = ?file.kind,
            name = file.display_name(),
            "processing incoming file"
        );

        let (template, source) = match self.load_preferences(file.user_id).await {
            Ok(prefs) => prefs,
            Err(err) => {
                let mut status = StatusMessage::new(self.services.messenger.as_ref(), file.chat_id);
                status.set(&err.to_string()).await;
                return Outcome::Failed(err);
            }
        };
        let Some(template) = template else {
            if let Err(e) = self
                .services
                .messenger
                .post(file.chat_id, NO_TEMPLATE_MESSAGE)
                .await
            {
                warn!(error = %e, "failed to send template hint");
            }
            return Outcome::NoTemplate;
        };

        // Nothing has been acquired yet, so a duplicate exits silently.
        if !self.guard.should_process(&file.file_id) {
            return Outcome::Duplicate;
        }

        let mut status = StatusMessage::new(self.services.messenger.as_ref(), file.chat_id);
        let mut ctx = PipelineContext::default();
        let outcome = match self
            .run(&file, &template, source, &mut status, &mut ctx)
            .await
        {
            Ok(StagesOutcome::Uploaded(file_name)) => {
                status.delete().await;
                Outcome::Completed { file_name }
            }
            Ok(StagesOutcome::Rejected) => Outcome::Rejected,
            Err(err) => {
                warn!(file_id = %file.file_id, error = %err, "pipeline run failed");
                status.set(&err.to_string()).await;
                Outcome::Failed(err)
            }
        };
        ctx.cleanup().await;
        self.guard.release(&file.file_id);
        outcome
    }

    async fn load_preferences(
        &self,
        user: UserId,
    ) -> Result<(Option<String>, SourcePreference), StageError> {
        let template = self
            .services
            .store
            .rename_template(user)
            .await
            .map_err(StageError::Preferences)?;
        let source = self
            .services
            .store
            .source_preference(user)
            .await
            .map_err(StageError::Preferences)?;
        Ok((template, source))
    }

    async fn run(
        &self,
        file: &IncomingFile,
        template: &str,
        source: SourcePreference,
        status: &mut StatusMessage<'_>,
        ctx: &mut PipelineContext,
    ) -> Result<StagesOutcome, StageError> {
        // Content check fails closed: a checker error aborts the run.
        match self
            .services
            .safety
            .is_unsafe(file.display_name(), file.caption.as_deref())
            .await
        {
            Ok(false) => {}
            Ok(true) => {
                info!(file_id = %file.file_id, "content check rejected file");
                if let Err(e) = self
                    .services
                    .messenger
                    .post(file.chat_id, REJECTED_MESSAGE)
                    .await
                {
                    warn!(error = %e, "failed to send rejection message");
                }
                return Ok(StagesOutcome::Rejected);
            }
            Err(e) => return Err(StageError::ContentCheck(e)),
        }

        let text = match (source, file.caption.as_deref()) {
            (SourcePreference::Caption, Some(caption)) => caption,
            _ => file.display_name(),
        };

        let extracted = Extracted::from_text(text);
        let new_name = target_filename(template, &extracted, file.display_name(), file.kind);
        info!(new_name = %new_name, "target filename rendered");

        let download_path = self.config.download_dir.join(&new_name);
        let tagged_path = self.config.metadata_dir.join(&new_name);
        fs::create_dir_all(&self.config.download_dir)
            .await
            .map_err(|e| StageError::Download(TransportError::Io(e)))?;
        fs::create_dir_all(&self.config.metadata_dir)
            .await
            .map_err(|e| StageError::Download(TransportError::Io(e)))?;

        status.set("Downloading...").await;
        ctx.download = Some(download_path.clone());
        let progress = LogProgress::new("download");
        let local = match self
            .services
            .transport
            .download(&file.media, &download_path, Some(&progress))
            .await
        {
            Err(TransportError::RateLimited { retry_after }) => {
                debug!(?retry_after, "download rate limited, waiting once");
                tokio::time::sleep(retry_after).await;
                self.services
                    .transport
                    .download(&file.media, &download_path, Some(&progress))
                    .await
                    .map_err(StageError::Download)?
            }
            other => other.map_err(StageError::Download)?,
        };
        ctx.download = Some(local.clone());

        let metadata_on = self
            .services
            .store
            .metadata_enabled(file.user_id)
            .await
            .map_err(StageError::Preferences)?;
        let upload_source = if metadata_on {
            status.set("Processing metadata...").await;
            let fields = self
                .services
                .store
                .metadata_fields(file.user_id)
                .await
                .map_err(StageError::Preferences)?;
            ctx.tagged = Some(tagged_path.clone());
            self.services
                .tagger
                .tag(&local, &tagged_path, &fields)
                .await
                .map_err(StageError::Tagging)?;
            tagged_path
        } else {
            debug!(file_id = %file.file_id, "metadata disabled for user, skipping tagging");
            local.clone()
        };

        status.set("Preparing upload...").await;
        let caption = self
            .services
            .store
            .caption(file.chat_id)
            .await
            .map_err(StageError::Preferences)?
            .unwrap_or_else(|| format!("**{new_name}**"));
        let thumbnail = self.prepare_thumbnail(file, ctx).await;

        status.set("Uploading...").await;
        let upload = Upload {
            chat: file.chat_id,
            path: &upload_source,
            caption: &caption,
            thumbnail: thumbnail.as_deref(),
        };
        let progress = LogProgress::new("upload");
        match self.send(file.kind, &upload, &progress).await {
            Err(TransportError::RateLimited { retry_after }) => {
                debug!(?retry_after, "upload rate limited, waiting once");
                tokio::time::sleep(retry_after).await;
                self.send(file.kind, &upload, &progress)
                    .await
                    .map_err(StageError::Upload)?;
            }
            other => other.map_err(StageError::Upload)?,
        }

        info!(file_id = %file.file_id, new_name = %new_name, "file renamed and re-uploaded");
        Ok(StagesOutcome::Uploaded(new_name))
    }

    async fn send(
        &self,
        kind: MediaKind,
        upload: &Upload<'_>,
        progress: &dyn ProgressSink,
    ) -> Result<(), TransportError> {
        match kind {
            MediaKind::Document => {
                self.services
                    .transport
                    .upload_document(upload, Some(progress))
                    .await
            }
            MediaKind::Video => {
                self.services
                    .transport
                    .upload_video(upload, Some(progress))
                    .await
            }
            MediaKind::Audio => {
                self.services
                    .transport
                    .upload_audio(upload, Some(progress))
                    .await
            }
        }
    }

    /// Resolve, fetch, and normalize a thumbnail. Best effort all the way
    /// through: any failure downgrades to uploading without one.
    async fn prepare_thumbnail(
        &self,
        file: &IncomingFile,
        ctx: &mut PipelineContext,
    ) -> Option<PathBuf> {
        let source = match self.services.store.thumbnail(file.user_id).await {
            Ok(Some(stored)) => Some(stored),
            Ok(None) => match file.kind {
                MediaKind::Video => file.video_thumb.clone(),
                _ => None,
            },
            Err(e) => {
                warn!(error = %e, "thumbnail preference lookup failed, continuing without");
                None
            }
        };
        let source = source?;

        let dest = self
            .config
            .download_dir
            .join(format!("{}.thumb", file.file_id));
        ctx.thumbs.push(dest.clone());
        let raw = match self.services.transport.download(&source, &dest, None).await {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "thumbnail fetch failed, continuing without");
                return None;
            }
        };
        ctx.thumbs.push(raw.clone());

        match self.services.thumbnails.normalize(&raw).await {
            Ok(processed) => {
                ctx.thumbs.push(processed.clone());
                Some(processed)
            }
            Err(e) => {
                warn!(error = %e, "thumbnail normalization failed, continuing without");
                None
            }
        }
    }
}

/// The one user-visible status message, posted lazily and edited in place.
/// Messaging failures are logged, never fatal.
struct StatusMessage<'a> {
    messenger: &'a dyn Messenger,
    chat: ChatId,
    id: Option<MessageId>,
}

impl<'a> StatusMessage<'a> {
    fn new(messenger: &'a dyn Messenger, chat: ChatId) -> Self {
        Self {
            messenger,
            chat,
            id: None,
        }
    }

    async fn set(&mut self, text: &str) {
        match self.id {
            Some(id) => {
                if let Err(e) = self.messenger.edit(self.chat, id, text).await {
                    warn!(error = %e, "failed to edit status message");
                }
            }
            None => match self.messenger.post(self.chat, text).await {
                Ok(id) => self.id = Some(id),
                Err(e) => warn!(error = %e, "failed to post status message"),
            },
        }
    }

    async fn delete(self) {
        if let Some(id) = self.id {
            if let Err(e) = self.messenger.delete(self.chat, id).await {
                warn!(error = %e, "failed to delete status message");
            }
        }
    }
}

/// Temporary paths one run may have created; all removed on exit.
#[derive(Debug, Default)]
struct PipelineContext {
    download: Option<PathBuf>,
    tagged: Option<PathBuf>,
    thumbs: Vec<PathBuf>,
}

impl PipelineContext {
    async fn cleanup(&self) {
        for path in self
            .download
            .iter()
            .chain(self.tagged.iter())
            .chain(self.thumbs.iter())
        {
            remove_quietly(path).await;
        }
    }
}

/// Remove a file or directory, tolerating paths that never came to exist.
/// Removal errors are logged and do not stop the remaining removals.
async fn remove_quietly(path: &Path) {
    let meta = match fs::metadata(path).await {
        Ok(meta) => meta,
        Err(_) => return,
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "failed to remove temporary path");
    }
}
