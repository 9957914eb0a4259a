//! Run observers injected into a `Preprocessor` at construction.

use std::path::Path;
use std::time::Instant;

use tracing::warn;

use crate::errors::PipelineError;
use crate::writer::LineLog;

/// Callbacks fired by the corpus producer thread.
///
/// Implementations must be cheap; they run on the reader's hot path.
pub trait PipelineObserver: Send + Sync {
    /// A corpus file is about to be opened.
    fn file_opened(&self, _path: &Path) {}
    /// A corpus file finished decoding into `rows` rows.
    fn file_decoded(&self, _path: &Path, _rows: usize) {}
}

/// Observer that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Appends the seconds elapsed since creation each time a file is opened.
pub struct TimingLog {
    log: LineLog,
    started: Instant,
}

impl TimingLog {
    /// Start timing and truncate the log at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        Ok(Self {
            log: LineLog::open(path.as_ref())?,
            started: Instant::now(),
        })
    }

    /// Flush pending entries and stop the log writer.
    pub fn close(&self) -> Result<u64, PipelineError> {
        self.log.close()
    }

    /// Location of the timing log.
    pub fn path(&self) -> &Path {
        self.log.path()
    }
}

impl PipelineObserver for TimingLog {
    fn file_opened(&self, path: &Path) {
        let elapsed = self.started.elapsed().as_secs_f64();
        if let Err(err) = self.log.append(elapsed.to_string()) {
            warn!(path = %path.display(), error = %err, "timing log rejected entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn timing_log_writes_one_line_per_opened_file() {
        let temp = tempdir().unwrap();
        let timing = TimingLog::open(temp.path().join("time.csv")).unwrap();
        timing.file_opened(Path::new("a.csv"));
        timing.file_opened(Path::new("b.csv"));
        assert_eq!(timing.close().unwrap(), 2);

        let contents = std::fs::read_to_string(timing.path()).unwrap();
        let values: Vec<f64> = contents
            .lines()
            .map(|line| line.parse().unwrap())
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values[0] <= values[1]);
    }
}
