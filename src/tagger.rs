//! Metadata tagging through an external ffmpeg process.
//!
//! The tag step remuxes without re-encoding (`-map 0 -c copy`) while
//! writing container- and stream-level titles. The subprocess runs under a
//! hard time budget; hitting it terminates the process.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::TagError;
use crate::services::MetadataFields;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[async_trait]
pub trait MetadataTagger: Send + Sync {
    /// Write `input` to `output` with `fields` embedded.
    async fn tag(
        &self,
        input: &Path,
        output: &Path,
        fields: &MetadataFields,
    ) -> Result<(), TagError>;
}

/// Tagger backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegTagger {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegTagger {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_program<P: AsRef<Path>>(program: P) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            ..Self::new()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FfmpegTagger {
    fn default() -> Self {
        Self::new()
    }
}

fn command_args(input: &Path, output: &Path, fields: &MetadataFields) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), input.into()];
    for (flag, value) in [
        ("-metadata", format!("title={}", fields.title)),
        ("-metadata", format!("artist={}", fields.artist)),
        ("-metadata", format!("author={}", fields.author)),
        ("-metadata:s:v", format!("title={}", fields.video_title)),
        ("-metadata:s:a", format!("title={}", fields.audio_title)),
        ("-metadata:s:s", format!("title={}", fields.subtitle_title)),
    ] {
        args.push(flag.into());
        args.push(value.into());
    }
    args.extend(["-map".into(), "0".into(), "-c".into(), "copy".into()]);
    args.extend(["-loglevel".into(), "error".into()]);
    args.push(output.into());
    args
}

#[async_trait]
impl MetadataTagger for FfmpegTagger {
    async fn tag(
        &self,
        input: &Path,
        output: &Path,
        fields: &MetadataFields,
    ) -> Result<(), TagError> {
        let args = command_args(input, output, fields);
        debug!(program = %self.program.display(), input = %input.display(), "tagging media");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timeout drops the in-flight future, which kills the child.
            .kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, command.output()).await;
        let output_data = match result {
            Err(_) => {
                warn!(input = %input.display(), "tagging timed out, process terminated");
                return Err(TagError::TimedOut);
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TagError::ToolNotFound(self.program.display().to_string()));
            }
            Ok(Err(e)) => return Err(TagError::Io(e)),
            Ok(Ok(data)) => data,
        };

        if !output_data.status.success() {
            let stderr = String::from_utf8_lossy(&output_data.stderr).trim().to_string();
            return Err(TagError::Failed {
                code: output_data.status.code(),
                stderr,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_shape_matches_remux_contract() {
        let fields = MetadataFields {
            title: "T".into(),
            artist: "Ar".into(),
            author: "Au".into(),
            video_title: "V".into(),
            audio_title: "A".into(),
            subtitle_title: "S".into(),
        };
        let args = command_args(Path::new("in.mkv"), Path::new("out.mkv"), &fields);
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(args[0], "-i");
        assert_eq!(args[1], "in.mkv");
        assert!(args.windows(2).any(|w| w == ["-metadata", "title=T"]));
        assert!(args.windows(2).any(|w| w == ["-metadata:s:v", "title=V"]));
        assert!(args.windows(2).any(|w| w == ["-metadata:s:a", "title=A"]));
        assert!(args.windows(2).any(|w| w == ["-metadata:s:s", "title=S"]));
        assert!(args.windows(2).any(|w| w == ["-map", "0"]));
        assert!(args.windows(2).any(|w| w == ["-c", "copy"]));
        assert!(args.windows(2).any(|w| w == ["-loglevel", "error"]));
        assert_eq!(args.last().map(String::as_str), Some("out.mkv"));
    }

    #[tokio::test]
    async fn missing_binary_is_reported_as_tool_not_found() {
        let tagger = FfmpegTagger::with_program("/nonexistent/ffmpeg-test-binary");
        let err = tagger
            .tag(
                Path::new("in.mkv"),
                Path::new("out.mkv"),
                &MetadataFields::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TagError::ToolNotFound(_)));
    }
}
