//! Write-behind workers with an explicit finish/join lifecycle.
//!
//! Each writer owns exactly one thread fed through a `BoundedQueue`. Callers
//! must `finish` the writer to learn whether every item reached its sink;
//! dropping an unfinished writer still closes the queue and joins the thread.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::debug;

use crate::constants::writer::LINE_WRITER_NAME;
use crate::errors::PipelineError;
use crate::queue::BoundedQueue;
use crate::types::LogLine;

/// Destination consumed by a `BackgroundWriter`.
pub trait RecordSink<T>: Send {
    /// Persist one item.
    fn write(&mut self, item: T) -> Result<(), PipelineError>;
    /// Called once after the last item, before the worker exits.
    fn flush(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Single-threaded writer draining a bounded queue into a `RecordSink`.
pub struct BackgroundWriter<T: Send + 'static> {
    name: String,
    queue: Arc<BoundedQueue<T>>,
    handle: Mutex<Option<thread::JoinHandle<Result<u64, PipelineError>>>>,
}

impl<T: Send + 'static> BackgroundWriter<T> {
    /// Start a writer thread named `name` buffering up to `capacity` items.
    pub fn spawn<S>(name: &str, capacity: usize, mut sink: S) -> Result<Self, PipelineError>
    where
        S: RecordSink<T> + 'static,
    {
        let queue = Arc::new(BoundedQueue::new(capacity));
        let worker_queue = Arc::clone(&queue);
        let worker_name = name.to_string();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut written = 0u64;
                while let Some(item) = worker_queue.get() {
                    if let Err(err) = sink.write(item) {
                        worker_queue.cancel();
                        return Err(err);
                    }
                    written = written.saturating_add(1);
                }
                sink.flush()?;
                debug!(worker = %worker_name, written, "background writer drained");
                Ok(written)
            })?;
        Ok(Self {
            name: name.to_string(),
            queue,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Enqueue an item, blocking while the writer is behind by `capacity` items.
    pub fn send(&self, item: T) -> Result<(), PipelineError> {
        self.queue
            .put(item)
            .map_err(|_| PipelineError::WorkerStopped {
                worker: self.name.clone(),
                reason: "writer stopped accepting items".to_string(),
            })
    }

    /// Close the queue, wait for the worker, and return the number of items written.
    pub fn finish(&self) -> Result<u64, PipelineError> {
        self.queue.close();
        let handle = self
            .handle
            .lock()
            .expect("background writer handle poisoned")
            .take();
        let Some(handle) = handle else {
            return Err(PipelineError::WorkerStopped {
                worker: self.name.clone(),
                reason: "writer already finished".to_string(),
            });
        };
        handle.join().unwrap_or_else(|_| {
            Err(PipelineError::WorkerStopped {
                worker: self.name.clone(),
                reason: "writer thread panicked".to_string(),
            })
        })
    }

    /// Number of items waiting to be written.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<T: Send + 'static> Drop for BackgroundWriter<T> {
    fn drop(&mut self) {
        self.queue.close();
        let handle = match self.handle.get_mut() {
            Ok(handle) => handle.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

struct LineSink {
    out: BufWriter<File>,
}

impl RecordSink<LogLine> for LineSink {
    fn write(&mut self, line: LogLine) -> Result<(), PipelineError> {
        writeln!(self.out, "{line}")?;
        self.out.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PipelineError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Append-only line log: `open` truncates, `append` enqueues, `close` joins.
pub struct LineLog {
    path: PathBuf,
    writer: BackgroundWriter<LogLine>,
}

impl LineLog {
    /// Create (or truncate) the log at `path` and start its writer.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        let writer = BackgroundWriter::spawn(
            LINE_WRITER_NAME,
            usize::MAX,
            LineSink {
                out: BufWriter::new(file),
            },
        )?;
        Ok(Self { path, writer })
    }

    /// Queue one line for appending.
    pub fn append(&self, line: impl Into<LogLine>) -> Result<(), PipelineError> {
        self.writer.send(line.into())
    }

    /// Flush every queued line and stop the writer, returning lines written.
    pub fn close(&self) -> Result<u64, PipelineError> {
        self.writer.finish()
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
