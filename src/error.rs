use std::time::Duration;

use thiserror::Error;

/// Errors raised by the chat-platform transport.
///
/// `RateLimited` is the distinguished signal the pipeline recovers from:
/// the carried duration is the wait the platform mandated before the next
/// attempt. Everything else aborts the stage.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("{0}")]
    Failed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the metadata-tagging subprocess.
#[derive(Error, Debug)]
pub enum TagError {
    #[error("tagger not found: {0}")]
    ToolNotFound(String),

    /// The subprocess exceeded its time budget and was terminated.
    #[error("tagging timed out")]
    TimedOut,

    #[error("tagger exited with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A pipeline stage failure. The `Display` text is what the user sees in
/// the status message, so variants keep it short.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Error accessing preferences. Please try again later.")]
    Preferences(#[source] anyhow::Error),

    #[error("Error during content check")]
    ContentCheck(#[source] anyhow::Error),

    #[error("Download failed: {0}")]
    Download(#[from] TransportError),

    #[error("Metadata processing failed: {0}")]
    Tagging(#[from] TagError),

    #[error("Upload failed: {0}")]
    Upload(TransportError),
}
