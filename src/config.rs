use crate::constants::source::DEFAULT_QUEUE_CAPACITY;
use crate::constants::writer::{DEFAULT_LABEL_QUEUE_CAPACITY, DEFAULT_WRITER_QUEUE_CAPACITY};
use crate::errors::PipelineError;
use crate::transport::fs::ListingOptions;

/// Runtime settings for a preprocessing pipeline.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Decoded file batches buffered between the reader thread and the consumer.
    pub queue_capacity: usize,
    /// Transformed file batches buffered ahead of the corpus writer thread.
    pub writer_queue_capacity: usize,
    /// Label records buffered ahead of the label-log writer thread.
    ///
    /// Kept large so label dumping does not stall the caller's iteration.
    pub label_queue_capacity: usize,
    /// Stop after this many corpus files (all files when `None`).
    pub max_files: Option<usize>,
    /// Skip corpus files whose content looks binary.
    pub skip_binary: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            writer_queue_capacity: DEFAULT_WRITER_QUEUE_CAPACITY,
            label_queue_capacity: DEFAULT_LABEL_QUEUE_CAPACITY,
            max_files: None,
            skip_binary: true,
        }
    }
}

impl PipelineConfig {
    /// Override the reader queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Override the corpus writer queue capacity.
    pub fn with_writer_queue_capacity(mut self, capacity: usize) -> Self {
        self.writer_queue_capacity = capacity;
        self
    }

    /// Override the label-log writer queue capacity.
    pub fn with_label_queue_capacity(mut self, capacity: usize) -> Self {
        self.label_queue_capacity = capacity;
        self
    }

    /// Cap the number of corpus files read per run.
    pub fn with_max_files(mut self, max_files: Option<usize>) -> Self {
        self.max_files = max_files;
        self
    }

    /// Enable or disable binary-file skipping.
    pub fn with_skip_binary(mut self, skip_binary: bool) -> Self {
        self.skip_binary = skip_binary;
        self
    }

    /// Reject settings that would deadlock or never produce data.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, value) in [
            ("queue_capacity", self.queue_capacity),
            ("writer_queue_capacity", self.writer_queue_capacity),
            ("label_queue_capacity", self.label_queue_capacity),
        ] {
            if value == 0 {
                return Err(PipelineError::Configuration(format!(
                    "{name} must be at least 1"
                )));
            }
        }
        if self.max_files == Some(0) {
            return Err(PipelineError::Configuration(
                "max_files must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn listing_options(&self) -> ListingOptions {
        ListingOptions {
            skip_binary: self.skip_binary,
            max_files: self.max_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.queue_capacity, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_capacities_are_rejected() {
        let config = PipelineConfig::default().with_queue_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(PipelineError::Configuration(_))
        ));
        let config = PipelineConfig::default().with_max_files(Some(0));
        assert!(config.validate().is_err());
        for config in [
            PipelineConfig::default().with_writer_queue_capacity(0),
            PipelineConfig::default().with_label_queue_capacity(0),
        ] {
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn listing_options_follow_config() {
        let options = PipelineConfig::default()
            .with_skip_binary(false)
            .with_max_files(Some(3))
            .listing_options();
        assert!(!options.skip_binary);
        assert_eq!(options.max_files, Some(3));
    }
}
