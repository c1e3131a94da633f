use serde::{Deserialize, Serialize};

/// Kind of media attached to an inbound message. Uploads are matched back
/// to the same kind so a video stays a video on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Document,
    Video,
    Audio,
}

impl MediaKind {
    /// Extension used when the source filename has none. Videos default to
    /// mp4, everything else to mp3.
    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Document | MediaKind::Audio => "mp3",
        }
    }
}

/// Opaque platform handle for a piece of media (a file id, not a path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef(pub String);

impl MediaRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// One inbound file event, as delivered by the host bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingFile {
    /// Identity used for duplicate detection.
    pub file_id: String,
    pub media: MediaRef,
    pub kind: MediaKind,
    pub file_name: Option<String>,
    pub file_size: u64,
    pub caption: Option<String>,
    pub chat_id: ChatId,
    pub user_id: UserId,
    /// Thumbnail embedded in the media itself, if the platform exposes one.
    pub video_thumb: Option<MediaRef>,
}

impl IncomingFile {
    /// Filename, or a kind-based stand-in when the platform sent none.
    pub fn display_name(&self) -> &str {
        match &self.file_name {
            Some(name) => name,
            None => match self.kind {
                MediaKind::Document => "document",
                MediaKind::Video => "video",
                MediaKind::Audio => "audio",
            },
        }
    }
}
