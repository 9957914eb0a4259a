//! Pipeline orchestrator.
//!
//! A `Preprocessor` pairs a `TransformChain` with a `PipelineConfig` and an
//! observer. Every entry point starts its own `CorpusSource`, so streams are
//! independent and dropping one cancels and joins its producer thread.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::constants::source::SKIP_ROW_MSG;
use crate::constants::writer::CORPUS_WRITER_NAME;
use crate::data::{CorpusFile, DataPoint, RawRow, Slice};
use crate::errors::PipelineError;
use crate::label_log::{DumpState, LabelDump, LabelLog, LabelReplay};
use crate::observe::{NoopObserver, PipelineObserver};
use crate::source::{BatchScope, CorpusSource, DecodedRows};
use crate::transform::TransformChain;
use crate::transport::fs::ensure_corpus_root;
use crate::writer::{BackgroundWriter, RecordSink};

/// Lifecycle of one stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RunState {
    /// No item has been requested yet.
    NotStarted,
    /// The producer is still reading files.
    Streaming,
    /// The producer finished; queued files are still being consumed.
    Draining,
    /// Every produced item has been consumed.
    Exhausted,
    /// The corpus listing failed or the producer thread stopped.
    Failed,
}

/// Counters accumulated while a stream is consumed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StreamReport {
    /// Files decoded successfully.
    pub files_read: usize,
    /// Files that could not be opened or decoded.
    pub files_failed: usize,
    /// Rows turned into data points.
    pub rows_yielded: usize,
    /// Rows dropped for bad encoding, missing columns or invalid labels.
    pub rows_skipped: usize,
    /// Set once the stream reached `Exhausted` or `Failed`.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Summary of a `persist_transformed` run.
#[derive(Clone, Debug, Serialize)]
pub struct PersistReport {
    /// Directory the transformed corpus was written to.
    pub destination: PathBuf,
    /// Author files handed to the writer thread.
    pub files_written: u64,
    /// Rows handed to the writer thread.
    pub rows_written: usize,
    /// Counters of the underlying stream.
    pub stream: StreamReport,
    /// Time the writer thread was joined.
    pub completed_at: DateTime<Utc>,
}

/// Corpus preprocessing entry point.
pub struct Preprocessor {
    chain: TransformChain,
    config: PipelineConfig,
    observer: Arc<dyn PipelineObserver>,
    labels: Option<LabelLog>,
}

impl Preprocessor {
    /// Create a preprocessor with default settings and no observer.
    pub fn new(chain: TransformChain) -> Self {
        Self {
            chain,
            config: PipelineConfig::default(),
            observer: Arc::new(NoopObserver),
            labels: None,
        }
    }

    /// Replace the pipeline settings.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Observe file-level progress of every stream started by this preprocessor.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Write label dumps to `log` instead of a private temporary file.
    pub fn with_label_log(mut self, log: LabelLog) -> Self {
        self.labels = Some(log);
        self
    }

    /// Configured transform chain.
    pub fn chain(&self) -> &TransformChain {
        &self.chain
    }

    /// Active pipeline settings.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// State of the label log; `Idle` until a dump starts.
    pub fn label_state(&self) -> DumpState {
        self.labels
            .as_ref()
            .map_or(DumpState::Idle, LabelLog::state)
    }

    /// Lazily stream transformed data points, file by file in name order.
    pub fn stream(&self, dir: impl AsRef<Path>) -> Result<DataPointStream, PipelineError> {
        Ok(DataPointStream {
            run: self.start(dir.as_ref())?,
            chain: self.chain.clone(),
            current: None,
        })
    }

    /// Materialize every data point of `dir`.
    pub fn collect(&self, dir: impl AsRef<Path>) -> Result<Vec<DataPoint>, PipelineError> {
        let mut stream = self.stream(dir)?;
        let points: Vec<DataPoint> = stream.by_ref().collect();
        match stream.take_error() {
            Some(err) => Err(err),
            None => Ok(points),
        }
    }

    /// Stream data points grouped into slices of `size`; the last may be short.
    pub fn stream_in_slices(
        &self,
        dir: impl AsRef<Path>,
        size: usize,
    ) -> Result<SliceStream, PipelineError> {
        if size == 0 {
            return Err(PipelineError::Configuration(
                "slice size must be at least 1".to_string(),
            ));
        }
        Ok(SliceStream {
            inner: self.stream(dir)?,
            size,
        })
    }

    /// Stream whole corpus files, each with its transformed data points.
    pub fn stream_files(&self, dir: impl AsRef<Path>) -> Result<FileStream, PipelineError> {
        Ok(FileStream {
            run: self.start(dir.as_ref())?,
            chain: self.chain.clone(),
        })
    }

    /// Write the transformed corpus of `dir` into `destination`.
    ///
    /// `destination` is wiped first. Each author gets one CSV file whose text
    /// column holds the space-joined tokens. A single writer thread does all
    /// file I/O; the call returns after that thread has been joined.
    pub fn persist_transformed(
        &self,
        dir: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> Result<PersistReport, PipelineError> {
        let dir = dir.as_ref();
        let destination = destination.as_ref();
        self.config.validate()?;
        ensure_corpus_root(dir)?;
        check_destination(dir, destination)?;

        if destination.exists() {
            fs::remove_dir_all(destination)?;
        }
        fs::create_dir_all(destination)?;

        let mut run = self.start(dir)?;
        let writer = BackgroundWriter::spawn(
            CORPUS_WRITER_NAME,
            self.config.writer_queue_capacity,
            AuthorFileSink {
                destination: destination.to_path_buf(),
            },
        )?;

        let mut rows_written = 0;
        while let Some((path, rows)) = run.next_batch() {
            let mut author = None;
            for row in rows {
                let Some((row, point)) = run.transform_row(&self.chain, &path, row) else {
                    continue;
                };
                let file = author.get_or_insert_with(|| AuthorFile {
                    file_name: row.author_file_name(),
                    rows: Vec::new(),
                });
                let text = point.tokens.join(" ");
                file.rows.push(row.columns_with_text(&text).map(str::to_string));
            }
            let Some(file) = author else {
                continue;
            };
            rows_written += file.rows.len();
            if writer.send(file).is_err() {
                break;
            }
        }

        let files_written = writer.finish()?;
        if let Some(err) = run.take_error() {
            return Err(err);
        }
        info!(
            destination = %destination.display(),
            files_written,
            rows_written,
            "transformed corpus persisted"
        );
        Ok(PersistReport {
            destination: destination.to_path_buf(),
            files_written,
            rows_written,
            stream: run.report.clone(),
            completed_at: Utc::now(),
        })
    }

    /// Stream data points while copying their labels to the label log.
    ///
    /// The log is marked complete only when the returned stream is consumed
    /// to exhaustion; dropping it early leaves the log `Incomplete`.
    pub fn persist_labels_async(
        &mut self,
        dir: impl AsRef<Path>,
    ) -> Result<LabelDumpStream, PipelineError> {
        let inner = self.stream(dir)?;
        let log = match self.labels.take() {
            Some(log) => log,
            None => LabelLog::temporary()?,
        };
        let dump = log.begin_dump(self.config.label_queue_capacity);
        self.labels = Some(log);
        Ok(LabelDumpStream {
            inner,
            dump: Some(dump?),
        })
    }

    /// Replay the labels of the last completed dump.
    pub fn replay_labels(&self) -> Result<LabelReplay, PipelineError> {
        match &self.labels {
            Some(log) => log.replay(),
            None => Err(PipelineError::Precondition(
                "label replay requires a completed dump (state: Idle)".to_string(),
            )),
        }
    }

    fn start(&self, dir: &Path) -> Result<Run, PipelineError> {
        let source = CorpusSource::spawn(dir, &self.config, Arc::clone(&self.observer))?;
        debug!(root = %dir.display(), "corpus stream started");
        Ok(Run {
            source,
            report: StreamReport::default(),
            state: RunState::NotStarted,
            error: None,
        })
    }
}

/// Consumer side of one corpus source plus its bookkeeping.
struct Run {
    source: CorpusSource,
    report: StreamReport,
    state: RunState,
    error: Option<PipelineError>,
}

impl Run {
    /// Next successfully decoded file; failed files are counted and skipped.
    fn next_batch(&mut self) -> Option<(PathBuf, DecodedRows)> {
        loop {
            if matches!(self.state, RunState::Exhausted | RunState::Failed) {
                return None;
            }
            let Some(batch) = self.source.next_batch() else {
                self.settle(RunState::Exhausted);
                return None;
            };
            self.state = if self.source.producer_finished() {
                RunState::Draining
            } else {
                RunState::Streaming
            };
            match (batch.scope, batch.rows) {
                (_, Ok(rows)) => {
                    self.report.files_read += 1;
                    return Some((batch.path, rows));
                }
                (BatchScope::File, Err(_)) => self.report.files_failed += 1,
                (scope, Err(err)) => {
                    if scope == BatchScope::Listing {
                        self.report.files_failed += 1;
                    }
                    self.error = Some(err);
                    self.settle(RunState::Failed);
                    return None;
                }
            }
        }
    }

    /// Label and transform one row, counting it as yielded or skipped.
    fn transform_row(
        &mut self,
        chain: &TransformChain,
        path: &Path,
        row: Result<RawRow, PipelineError>,
    ) -> Option<(RawRow, DataPoint)> {
        let transformed = row.and_then(|row| {
            let labels = row.labels()?;
            let tokens = chain.preprocess(&row.text);
            Ok((row, DataPoint { tokens, labels }))
        });
        match transformed {
            Ok(pair) => {
                self.report.rows_yielded += 1;
                Some(pair)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, SKIP_ROW_MSG);
                self.report.rows_skipped += 1;
                None
            }
        }
    }

    fn settle(&mut self, state: RunState) {
        self.state = state;
        self.report.completed_at = Some(Utc::now());
        debug!(
            root = %self.source.root().display(),
            state = ?state,
            files_read = self.report.files_read,
            rows_yielded = self.report.rows_yielded,
            rows_skipped = self.report.rows_skipped,
            "corpus stream settled"
        );
    }

    fn take_error(&mut self) -> Option<PipelineError> {
        self.error.take()
    }
}

/// Lazy stream of transformed data points.
pub struct DataPointStream {
    run: Run,
    chain: TransformChain,
    current: Option<(PathBuf, std::vec::IntoIter<Result<RawRow, PipelineError>>)>,
}

impl DataPointStream {
    /// Counters accumulated so far.
    pub fn report(&self) -> &StreamReport {
        &self.run.report
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.run.state
    }

    /// Highest number of decoded files that waited in the source queue.
    pub fn peak_queue_len(&self) -> usize {
        self.run.source.peak_queue_len()
    }

    /// Error that stopped the stream early, if any.
    pub fn take_error(&mut self) -> Option<PipelineError> {
        self.run.take_error()
    }
}

impl Iterator for DataPointStream {
    type Item = DataPoint;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((path, rows)) = &mut self.current {
                for row in rows.by_ref() {
                    if let Some((_, point)) = self.run.transform_row(&self.chain, path, row) {
                        return Some(point);
                    }
                }
            }
            let (path, rows) = self.run.next_batch()?;
            self.current = Some((path, rows.into_iter()));
        }
    }
}

/// Stream of fixed-size slices over a `DataPointStream`.
pub struct SliceStream {
    inner: DataPointStream,
    size: usize,
}

impl SliceStream {
    /// Counters accumulated so far.
    pub fn report(&self) -> &StreamReport {
        self.inner.report()
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.inner.state()
    }

    /// Points per full slice.
    pub fn slice_size(&self) -> usize {
        self.size
    }

    /// Error that stopped the stream early, if any.
    pub fn take_error(&mut self) -> Option<PipelineError> {
        self.inner.take_error()
    }
}

impl Iterator for SliceStream {
    type Item = Slice;

    fn next(&mut self) -> Option<Self::Item> {
        let points: Vec<DataPoint> = self.inner.by_ref().take(self.size).collect();
        if points.is_empty() {
            None
        } else {
            Some(Slice { points })
        }
    }
}

/// Stream of whole corpus files.
pub struct FileStream {
    run: Run,
    chain: TransformChain,
}

impl FileStream {
    /// Counters accumulated so far.
    pub fn report(&self) -> &StreamReport {
        &self.run.report
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.run.state
    }

    /// Error that stopped the stream early, if any.
    pub fn take_error(&mut self) -> Option<PipelineError> {
        self.run.take_error()
    }
}

impl Iterator for FileStream {
    type Item = CorpusFile;

    fn next(&mut self) -> Option<Self::Item> {
        let (path, rows) = self.run.next_batch()?;
        let mut points = Vec::with_capacity(rows.len());
        let mut rows_skipped = 0;
        for row in rows {
            match self.run.transform_row(&self.chain, &path, row) {
                Some((_, point)) => points.push(point),
                None => rows_skipped += 1,
            }
        }
        Some(CorpusFile {
            path,
            points,
            rows_skipped,
        })
    }
}

/// Data point stream that mirrors every label into the label log.
pub struct LabelDumpStream {
    inner: DataPointStream,
    dump: Option<LabelDump>,
}

impl LabelDumpStream {
    /// Counters accumulated so far.
    pub fn report(&self) -> &StreamReport {
        self.inner.report()
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.inner.state()
    }

    fn settle(&mut self) {
        let Some(mut dump) = self.dump.take() else {
            return;
        };
        if self.inner.state() != RunState::Exhausted {
            dump.abandon();
            return;
        }
        match dump.complete() {
            Ok(records) => info!(records, "label dump complete"),
            Err(err) => warn!(error = %err, "label dump failed"),
        }
    }
}

impl Iterator for LabelDumpStream {
    type Item = DataPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(point) = self.inner.next() else {
            self.settle();
            return None;
        };
        let failed = match &self.dump {
            Some(dump) => dump.record(point.labels.clone()).err(),
            None => None,
        };
        if let Some(err) = failed {
            warn!(error = %err, "label writer stopped; dump abandoned");
            if let Some(mut dump) = self.dump.take() {
                dump.abandon();
            }
        }
        Some(point)
    }
}

/// One output file and its rows, in corpus column order.
struct AuthorFile {
    file_name: String,
    rows: Vec<[String; 5]>,
}

struct AuthorFileSink {
    destination: PathBuf,
}

impl RecordSink<AuthorFile> for AuthorFileSink {
    fn write(&mut self, file: AuthorFile) -> Result<(), PipelineError> {
        let path = self.destination.join(&file.file_name);
        if path.parent() != Some(self.destination.as_path()) {
            return Err(PipelineError::DestinationConflict {
                path,
                reason: "author file name escapes the destination".to_string(),
            });
        }
        let out = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        for row in &file.rows {
            writer.write_record(row).map_err(|err| PipelineError::Decode {
                path: path.clone(),
                details: err.to_string(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Reject destinations that are files or that would wipe the corpus itself.
fn check_destination(source: &Path, destination: &Path) -> Result<(), PipelineError> {
    if destination.exists() && !destination.is_dir() {
        return Err(PipelineError::DestinationConflict {
            path: destination.to_path_buf(),
            reason: "destination exists and is not a directory".to_string(),
        });
    }
    let source = fs::canonicalize(source)?;
    let resolved = resolve_path(destination)?;
    if source == resolved {
        return Err(PipelineError::DestinationConflict {
            path: destination.to_path_buf(),
            reason: "destination is the source corpus".to_string(),
        });
    }
    if source.starts_with(&resolved) {
        return Err(PipelineError::DestinationConflict {
            path: destination.to_path_buf(),
            reason: "destination contains the source corpus".to_string(),
        });
    }
    Ok(())
}

fn resolve_path(path: &Path) -> Result<PathBuf, PipelineError> {
    if path.exists() {
        return Ok(fs::canonicalize(path)?);
    }
    let absolute = std::path::absolute(path)?;
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) if parent.exists() => Ok(fs::canonicalize(parent)?.join(name)),
        _ => Ok(absolute),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TokenMapper;
    use std::fs;
    use tempfile::tempdir;

    fn write_author(dir: &Path, name: &str, rows: &[&str]) {
        fs::write(dir.join(name), rows.join("\n") + "\n").unwrap();
    }

    fn preprocessor() -> Preprocessor {
        Preprocessor::new(TransformChain::default().with_mapper(TokenMapper::MaskNumerals))
    }

    #[test]
    fn stream_reports_state_and_skipped_rows() {
        let temp = tempdir().unwrap();
        write_author(
            temp.path(),
            "1.male.20.Leo.csv",
            &["1,male,20,Leo,I am 20", "1,male,-4,Leo,bad age", "1,male,20,Leo,again"],
        );
        let mut stream = preprocessor().stream(temp.path()).unwrap();
        assert_eq!(stream.state(), RunState::NotStarted);

        let points: Vec<DataPoint> = stream.by_ref().collect();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].tokens, vec!["I", "am", "NUM"]);
        assert_eq!(stream.state(), RunState::Exhausted);

        let report = stream.report();
        assert_eq!(report.files_read, 1);
        assert_eq!(report.rows_yielded, 2);
        assert_eq!(report.rows_skipped, 1);
        assert!(report.completed_at.is_some());
        assert!(stream.take_error().is_none());
    }

    #[test]
    fn stream_rejects_missing_directory() {
        let temp = tempdir().unwrap();
        let result = preprocessor().stream(temp.path().join("absent"));
        assert!(matches!(result, Err(PipelineError::SourceNotFound { .. })));
    }

    #[test]
    fn zero_slice_size_is_a_configuration_error() {
        let temp = tempdir().unwrap();
        assert!(matches!(
            preprocessor().stream_in_slices(temp.path(), 0),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn file_stream_groups_points_by_file() {
        let temp = tempdir().unwrap();
        write_author(temp.path(), "1.male.20.Leo.csv", &["1,male,20,Leo,a b", "1,male,x,Leo,c"]);
        write_author(temp.path(), "2.female.40.Aries.csv", &["2,female,40,Aries,d"]);
        let files: Vec<CorpusFile> = preprocessor().stream_files(temp.path()).unwrap().collect();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].points.len(), 1);
        assert_eq!(files[0].rows_skipped, 1);
        assert_eq!(files[1].points[0].labels.id, "2");
    }

    #[test]
    fn destination_conflicts_are_detected() {
        let temp = tempdir().unwrap();
        let corpus = temp.path().join("corpus");
        fs::create_dir(&corpus).unwrap();
        let file_dest = temp.path().join("occupied");
        fs::write(&file_dest, "x").unwrap();

        let pre = preprocessor();
        for destination in [corpus.clone(), temp.path().to_path_buf(), file_dest] {
            assert!(matches!(
                pre.persist_transformed(&corpus, &destination),
                Err(PipelineError::DestinationConflict { .. })
            ));
        }
        assert!(corpus.is_dir());
    }

    struct PanickingObserver;

    impl PipelineObserver for PanickingObserver {
        fn file_opened(&self, _path: &Path) {
            panic!("observer failure");
        }
    }

    #[test]
    fn panicking_observer_fails_the_run_instead_of_hanging() {
        let temp = tempdir().unwrap();
        write_author(temp.path(), "1.male.20.Leo.csv", &["1,male,20,Leo,a"]);
        let pre = preprocessor().with_observer(Arc::new(PanickingObserver));

        assert!(matches!(
            pre.collect(temp.path()),
            Err(PipelineError::WorkerStopped { .. })
        ));

        let mut slices = pre.stream_in_slices(temp.path(), 4).unwrap();
        assert!(slices.next().is_none());
        assert_eq!(slices.state(), RunState::Failed);
        assert!(matches!(
            slices.take_error(),
            Some(PipelineError::WorkerStopped { .. })
        ));
        assert!(slices.take_error().is_none());
    }

    #[test]
    fn author_sink_refuses_names_outside_the_destination() {
        let temp = tempdir().unwrap();
        let destination = temp.path().join("out");
        fs::create_dir(&destination).unwrap();
        let mut sink = AuthorFileSink {
            destination: destination.clone(),
        };
        let file = AuthorFile {
            file_name: "../escaped.male.20.Leo.csv".to_string(),
            rows: vec![["x", "male", "20", "Leo", "hello"].map(str::to_string)],
        };
        assert!(matches!(
            sink.write(file),
            Err(PipelineError::DestinationConflict { .. })
        ));
        assert!(!temp.path().join("escaped.male.20.Leo.csv").exists());
    }

    #[test]
    fn label_dump_requires_exhaustion() {
        let temp = tempdir().unwrap();
        write_author(temp.path(), "1.male.20.Leo.csv", &["1,male,20,Leo,a", "1,male,20,Leo,b"]);
        let mut pre = preprocessor();
        assert!(matches!(pre.replay_labels(), Err(PipelineError::Precondition(_))));

        let mut partial = pre.persist_labels_async(temp.path()).unwrap();
        assert!(partial.next().is_some());
        drop(partial);
        assert_eq!(pre.label_state(), DumpState::Incomplete);
        assert!(pre.replay_labels().is_err());

        let full: Vec<DataPoint> = pre.persist_labels_async(temp.path()).unwrap().collect();
        assert_eq!(pre.label_state(), DumpState::Complete { records: 2 });
        let replayed: Vec<_> = pre.replay_labels().unwrap().map(Result::unwrap).collect();
        let expected: Vec<_> = full.into_iter().map(|point| point.labels).collect();
        assert_eq!(replayed, expected);
    }
}
