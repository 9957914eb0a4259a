//! Corpus source: one reader thread decoding whole files onto a bounded queue.
//!
//! Ownership model:
//! - `CorpusSource` owns the producer thread and the consumer end of the queue.
//! - The producer decodes one file at a time into a `RowBatch` and blocks on a
//!   full queue, so at most `queue_capacity` decoded files wait in memory.
//! - Dropping the source cancels the queue and joins the producer, so an
//!   abandoned stream never leaves a thread blocked on `put`.
//! - The producer closes the queue even when it unwinds; a panic is reported
//!   to the consumer as a final `BatchScope::Producer` batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::constants::source::{PRODUCER_THREAD_NAME, SKIP_FILE_MSG};
use crate::errors::PipelineError;
use crate::observe::PipelineObserver;
use crate::queue::BoundedQueue;
use crate::transport::fs::{ListingOptions, ensure_corpus_root, list_corpus_files};

/// CSV decoding of individual corpus files.
pub mod csv_file;

pub use csv_file::{DecodedRows, count_csv_records, decode_csv_file};

/// What a `RowBatch` and its failure refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchScope {
    /// One corpus file; a failure skips only that file.
    File,
    /// The corpus listing; a failure ends the stream.
    Listing,
    /// The producer thread itself stopped; always the last batch.
    Producer,
}

/// All rows decoded from one corpus file, or the reason the file failed.
#[derive(Debug)]
pub struct RowBatch {
    /// File the rows came from, or the corpus root for other scopes.
    pub path: PathBuf,
    /// What a failure in `rows` applies to.
    pub scope: BatchScope,
    /// Decoded rows.
    pub rows: Result<DecodedRows, PipelineError>,
}

/// Producer-side counters.
#[derive(Default)]
struct SourceStats {
    files_produced: AtomicUsize,
    files_failed: AtomicUsize,
    finished: AtomicBool,
}

/// Bounded, concurrently produced stream of decoded corpus files.
pub struct CorpusSource {
    root: PathBuf,
    queue: Arc<BoundedQueue<RowBatch>>,
    handle: Option<thread::JoinHandle<()>>,
    stats: Arc<SourceStats>,
}

impl CorpusSource {
    /// Validate `root` and start the reader thread.
    ///
    /// Fails with `SourceNotFound` before any thread starts when `root` is not
    /// a directory.
    pub fn spawn(
        root: impl Into<PathBuf>,
        config: &PipelineConfig,
        observer: Arc<dyn PipelineObserver>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let root = root.into();
        ensure_corpus_root(&root)?;

        let queue = Arc::new(BoundedQueue::new(config.queue_capacity));
        let stats = Arc::new(SourceStats::default());
        let producer = Producer {
            root: root.clone(),
            options: config.listing_options(),
            queue: Arc::clone(&queue),
            stats: Arc::clone(&stats),
            observer,
        };
        let handle = thread::Builder::new()
            .name(PRODUCER_THREAD_NAME.to_string())
            .spawn(move || producer.run())?;

        Ok(Self {
            root,
            queue,
            handle: Some(handle),
            stats,
        })
    }

    /// Block until the next decoded file is available.
    ///
    /// Returns `None` only after the producer finished and the queue drained.
    pub fn next_batch(&self) -> Option<RowBatch> {
        self.queue.get()
    }

    /// Corpus root this source reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True once the producer has enqueued its last batch.
    pub fn producer_finished(&self) -> bool {
        self.stats.finished.load(Ordering::Acquire)
    }

    /// Decoded files currently waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Highest queue occupancy observed so far.
    pub fn peak_queue_len(&self) -> usize {
        self.queue.peak_len()
    }

    /// Queue capacity in batches.
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Files handed to the queue so far.
    pub fn files_produced(&self) -> usize {
        self.stats.files_produced.load(Ordering::Relaxed)
    }

    /// Files that failed to open or decode.
    pub fn files_failed(&self) -> usize {
        self.stats.files_failed.load(Ordering::Relaxed)
    }
}

impl Iterator for CorpusSource {
    type Item = RowBatch;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}

impl Drop for CorpusSource {
    fn drop(&mut self) {
        self.queue.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Producer {
    root: PathBuf,
    options: ListingOptions,
    queue: Arc<BoundedQueue<RowBatch>>,
    stats: Arc<SourceStats>,
    observer: Arc<dyn PipelineObserver>,
}

impl Producer {
    fn run(self) {
        let _finish = FinishOnDrop(&self);
        self.produce();
    }

    fn finish(&self) {
        if thread::panicking() {
            warn!(root = %self.root.display(), "corpus producer panicked");
            let _ = self.queue.put(RowBatch {
                path: self.root.clone(),
                scope: BatchScope::Producer,
                rows: Err(PipelineError::WorkerStopped {
                    worker: PRODUCER_THREAD_NAME.to_string(),
                    reason: "producer thread panicked".to_string(),
                }),
            });
        }
        self.stats.finished.store(true, Ordering::Release);
        self.queue.close();
    }

    fn produce(&self) {
        let files = match list_corpus_files(&self.root, self.options) {
            Ok(files) => files,
            Err(err) => {
                warn!(root = %self.root.display(), error = %err, "corpus listing failed");
                self.stats.files_failed.fetch_add(1, Ordering::Relaxed);
                let _ = self.queue.put(RowBatch {
                    path: self.root.clone(),
                    scope: BatchScope::Listing,
                    rows: Err(err),
                });
                return;
            }
        };
        debug!(root = %self.root.display(), files = files.len(), "corpus producer started");

        for path in files {
            if self.queue.is_cancelled() {
                break;
            }
            self.observer.file_opened(&path);
            let rows = decode_csv_file(&path);
            match &rows {
                Ok(rows) => self.observer.file_decoded(&path, rows.len()),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, SKIP_FILE_MSG);
                    self.stats.files_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            let batch = RowBatch {
                path,
                scope: BatchScope::File,
                rows,
            };
            if self.queue.put(batch).is_err() {
                debug!(root = %self.root.display(), "corpus consumer cancelled");
                return;
            }
            self.stats.files_produced.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Marks the producer finished and closes the queue, also while unwinding.
struct FinishOnDrop<'a>(&'a Producer);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::NoopObserver;
    use std::fs;
    use tempfile::tempdir;

    fn write_author(dir: &Path, name: &str, rows: &[&str]) {
        let mut body = String::new();
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn spawn_rejects_missing_root_before_streaming() {
        let temp = tempdir().unwrap();
        let result = CorpusSource::spawn(
            temp.path().join("missing"),
            &PipelineConfig::default(),
            Arc::new(NoopObserver),
        );
        assert!(matches!(result, Err(PipelineError::SourceNotFound { .. })));
    }

    #[test]
    fn batches_preserve_row_order_within_file() {
        let temp = tempdir().unwrap();
        write_author(
            temp.path(),
            "1.male.20.Leo.csv",
            &["1,male,20,Leo,first", "1,male,20,Leo,second", "1,male,20,Leo,third"],
        );
        let source = CorpusSource::spawn(
            temp.path(),
            &PipelineConfig::default(),
            Arc::new(NoopObserver),
        )
        .unwrap();

        let batches: Vec<RowBatch> = source.collect();
        assert_eq!(batches.len(), 1);
        let texts: Vec<String> = batches[0]
            .rows
            .as_ref()
            .unwrap()
            .iter()
            .map(|row| row.as_ref().unwrap().text.clone())
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn dropping_an_unfinished_source_joins_the_producer() {
        let temp = tempdir().unwrap();
        for idx in 0..8 {
            write_author(
                temp.path(),
                &format!("{idx}.male.20.Leo.csv"),
                &["x,male,20,Leo,body"],
            );
        }
        let config = PipelineConfig::default().with_queue_capacity(1);
        let source = CorpusSource::spawn(temp.path(), &config, Arc::new(NoopObserver)).unwrap();
        assert!(source.next_batch().is_some());
        drop(source);
    }

    struct PanicOnSecondFile(AtomicUsize);

    impl PipelineObserver for PanicOnSecondFile {
        fn file_opened(&self, _path: &Path) {
            if self.0.fetch_add(1, Ordering::SeqCst) == 1 {
                panic!("observer failure");
            }
        }
    }

    #[test]
    fn producer_panic_ends_the_queue_with_a_producer_batch() {
        let temp = tempdir().unwrap();
        for idx in 0..3 {
            write_author(temp.path(), &format!("{idx}.male.20.Leo.csv"), &["x,male,20,Leo,b"]);
        }
        let source = CorpusSource::spawn(
            temp.path(),
            &PipelineConfig::default(),
            Arc::new(PanicOnSecondFile(AtomicUsize::new(0))),
        )
        .unwrap();

        let batches: Vec<RowBatch> = source.collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].scope, BatchScope::File);
        assert!(batches[0].rows.is_ok());
        assert_eq!(batches[1].scope, BatchScope::Producer);
        assert!(matches!(
            batches[1].rows,
            Err(PipelineError::WorkerStopped { .. })
        ));
    }

    #[test]
    fn max_files_cuts_off_the_scan() {
        let temp = tempdir().unwrap();
        for idx in 0..5 {
            write_author(
                temp.path(),
                &format!("{idx}.female.33.Libra.csv"),
                &["x,female,33,Libra,body"],
            );
        }
        let config = PipelineConfig::default().with_max_files(Some(2));
        let source = CorpusSource::spawn(temp.path(), &config, Arc::new(NoopObserver)).unwrap();
        assert_eq!(source.count(), 2);
    }
}
