//! Durable, append-only log of label records.
//!
//! Each record is framed as a little-endian `u32` payload length followed by
//! `[version][bitcode prefix][bitcode(LabeledRecord)]`. Replay is only allowed
//! after a dump ran to completion; the dump state is tracked explicitly and is
//! always initialized.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::constants::label_log::{
    BITCODE_PREFIX, DEFAULT_LABEL_LOG_FILENAME, LABEL_RECORD_VERSION, LENGTH_PREFIX_BYTES,
};
use crate::constants::writer::LABEL_WRITER_NAME;
use crate::errors::PipelineError;
use crate::labels::LabeledRecord;
use crate::writer::{BackgroundWriter, RecordSink};

/// Lifecycle of the label log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpState {
    /// No dump has been started.
    Idle,
    /// A dump is being written.
    Dumping,
    /// The last dump drained fully and its writer was joined.
    Complete { records: u64 },
    /// The last dump was abandoned or failed; its contents are partial.
    Incomplete,
}

/// Location and state of a label log.
pub struct LabelLog {
    path: PathBuf,
    _temp_dir: Option<TempDir>,
    state: Arc<Mutex<DumpState>>,
}

impl LabelLog {
    /// Log stored in a private temporary directory removed on drop.
    pub fn temporary() -> Result<Self, PipelineError> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join(DEFAULT_LABEL_LOG_FILENAME);
        Ok(Self {
            path,
            _temp_dir: Some(temp_dir),
            state: Arc::new(Mutex::new(DumpState::Idle)),
        })
    }

    /// Log stored at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _temp_dir: None,
            state: Arc::new(Mutex::new(DumpState::Idle)),
        }
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current dump state.
    pub fn state(&self) -> DumpState {
        *self.state.lock().expect("label log state poisoned")
    }

    /// Truncate the log and start a background writer for a new dump.
    pub fn begin_dump(&self, queue_capacity: usize) -> Result<LabelDump, PipelineError> {
        let mut state = self.state.lock().expect("label log state poisoned");
        if *state == DumpState::Dumping {
            return Err(PipelineError::Precondition(
                "a label dump is already in progress".to_string(),
            ));
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        let writer = BackgroundWriter::spawn(
            LABEL_WRITER_NAME,
            queue_capacity,
            LabelSink {
                out: BufWriter::new(file),
            },
        )?;
        *state = DumpState::Dumping;
        debug!(path = %self.path.display(), "label dump started");
        Ok(LabelDump {
            writer,
            state: Arc::clone(&self.state),
            settled: false,
        })
    }

    /// Iterate the records of the last completed dump.
    pub fn replay(&self) -> Result<LabelReplay, PipelineError> {
        match self.state() {
            DumpState::Complete { .. } => {}
            other => {
                return Err(PipelineError::Precondition(format!(
                    "label replay requires a completed dump (state: {other:?})"
                )));
            }
        }
        let file = File::open(&self.path)?;
        Ok(LabelReplay {
            path: self.path.clone(),
            reader: BufReader::new(file),
            done: false,
        })
    }
}

/// Handle of an in-progress label dump.
pub struct LabelDump {
    writer: BackgroundWriter<LabeledRecord>,
    state: Arc<Mutex<DumpState>>,
    settled: bool,
}

impl LabelDump {
    /// Queue one record for the log.
    pub fn record(&self, labels: LabeledRecord) -> Result<(), PipelineError> {
        self.writer.send(labels)
    }

    /// Flush and join the writer, then mark the dump complete.
    pub fn complete(&mut self) -> Result<u64, PipelineError> {
        self.settle(true)
    }

    /// Join the writer and mark the dump incomplete.
    pub fn abandon(&mut self) {
        if let Err(err) = self.settle(false) {
            warn!(error = %err, "abandoned label dump failed to flush");
        }
    }

    fn settle(&mut self, completed: bool) -> Result<u64, PipelineError> {
        if self.settled {
            return Err(PipelineError::Precondition(
                "label dump already settled".to_string(),
            ));
        }
        self.settled = true;
        let result = self.writer.finish();
        let mut state = self.state.lock().expect("label log state poisoned");
        *state = match (&result, completed) {
            (Ok(records), true) => DumpState::Complete { records: *records },
            _ => DumpState::Incomplete,
        };
        result
    }
}

impl Drop for LabelDump {
    fn drop(&mut self) {
        if !self.settled {
            self.abandon();
        }
    }
}

struct LabelSink {
    out: BufWriter<File>,
}

impl RecordSink<LabeledRecord> for LabelSink {
    fn write(&mut self, labels: LabeledRecord) -> Result<(), PipelineError> {
        self.out.write_all(&encode_label_record(&labels)?)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PipelineError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Frame one record as `len (u32 LE) | version | prefix | bitcode`.
pub fn encode_label_record(labels: &LabeledRecord) -> Result<Vec<u8>, PipelineError> {
    let encoded = bitcode::encode(labels);
    let payload_len = encoded.len() + 2;
    let len = u32::try_from(payload_len).map_err(|_| {
        PipelineError::Configuration(format!("label record too large: {payload_len} bytes"))
    })?;
    let mut framed = Vec::with_capacity(LENGTH_PREFIX_BYTES + payload_len);
    framed.extend_from_slice(&len.to_le_bytes());
    framed.push(LABEL_RECORD_VERSION);
    framed.push(BITCODE_PREFIX);
    framed.extend_from_slice(&encoded);
    Ok(framed)
}

/// Decode one payload (without its length prefix).
pub fn decode_label_payload(payload: &[u8]) -> Result<LabeledRecord, String> {
    match payload {
        [version, prefix, rest @ ..] => {
            if *version != LABEL_RECORD_VERSION {
                return Err(format!("label record version mismatch: {version}"));
            }
            if *prefix != BITCODE_PREFIX {
                return Err("bitcode payload missing expected prefix".to_string());
            }
            bitcode::decode(rest).map_err(|err| format!("corrupt label record: {err}"))
        }
        _ => Err("truncated label record header".to_string()),
    }
}

/// Sequential reader over a completed label log.
pub struct LabelReplay {
    path: PathBuf,
    reader: BufReader<File>,
    done: bool,
}

impl LabelReplay {
    fn read_next(&mut self) -> Result<Option<LabeledRecord>, PipelineError> {
        let mut len_bytes = [0u8; LENGTH_PREFIX_BYTES];
        let mut filled = 0;
        while filled < LENGTH_PREFIX_BYTES {
            let read = self.reader.read(&mut len_bytes[filled..])?;
            if read == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(self.corrupt("truncated length prefix".to_string()));
            }
            filled += read;
        }
        let len = u32::from_le_bytes(len_bytes) as usize;
        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                self.corrupt("truncated payload".to_string())
            } else {
                PipelineError::Io(err)
            }
        })?;
        decode_label_payload(&payload)
            .map(Some)
            .map_err(|details| self.corrupt(details))
    }

    fn corrupt(&self, details: String) -> PipelineError {
        PipelineError::Decode {
            path: self.path.clone(),
            details,
        }
    }
}

impl Iterator for LabelReplay {
    type Item = Result<LabeledRecord, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
