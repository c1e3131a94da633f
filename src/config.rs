use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
const DEFAULT_METADATA_DIR: &str = "metadata";

/// Filesystem and timing knobs for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where downloads land before tagging.
    pub download_dir: PathBuf,
    /// Where tagged output is written.
    pub metadata_dir: PathBuf,
    /// Duplicate-submission window.
    pub dedup_window: Duration,
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            metadata_dir: PathBuf::from(DEFAULT_METADATA_DIR),
            dedup_window: Duration::from_secs(10),
        }
    }
}

pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn download_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.download_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn metadata_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.config.metadata_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn dedup_window(mut self, window: Duration) -> Self {
        self.config.dedup_window = window;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
