//! Core engine for an auto-rename chat bot.
//!
//! Takes an inbound media file, classifies season/episode/quality/audio
//! tags out of its filename or caption, renders the user's rename template,
//! and drives the download → tag → thumbnail → upload pipeline against the
//! host bot's collaborators. The chat platform, preference store, content
//! checker, and thumbnail resizer are all external; see [`services`] for
//! the seams.

pub mod config;
pub mod error;
pub mod extract;
pub mod guard;
pub mod media;
pub mod pipeline;
pub mod services;
pub mod tagger;
pub mod template;

pub use config::PipelineConfig;
pub use error::{StageError, TagError, TransportError};
pub use pipeline::{Outcome, Pipeline, Services};
