#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runners shared by the `blogprof` binary.
pub mod apps;
/// Pipeline configuration types.
pub mod config;
/// Centralized constants used across sources, writers, and counters.
pub mod constants;
/// Corpus statistics: vocabulary, post lengths, and label counts.
pub mod counters;
/// Row, data point, and slice types.
pub mod data;
/// Durable label log and its replay reader.
pub mod label_log;
/// Label parsing and per-author file naming.
pub mod labels;
/// Injectable run observers.
pub mod observe;
/// Streaming, slicing, and persistence entry points.
pub mod pipeline;
/// Bounded producer/consumer queue.
pub mod queue;
/// Corpus source: background reader feeding decoded files.
pub mod source;
/// Tokenizers, token mappers, and the transform chain.
pub mod transform;
/// Input transports used by sources (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Background writers and line logs.
pub mod writer;

mod errors;

pub use config::PipelineConfig;
pub use data::{CorpusFile, DataPoint, RawRow, Slice};
pub use errors::PipelineError;
pub use label_log::{DumpState, LabelLog, LabelReplay};
pub use labels::{AgeBracket, LabeledRecord, parse_age_bracket, parse_labels};
pub use observe::{NoopObserver, PipelineObserver, TimingLog};
pub use pipeline::{
    DataPointStream, FileStream, LabelDumpStream, PersistReport, Preprocessor, RunState,
    SliceStream, StreamReport,
};
pub use queue::BoundedQueue;
pub use source::CorpusSource;
pub use transform::{SocialTokenizer, TokenMapper, Tokenizer, TransformChain};
pub use types::{AuthorId, Gender, LogLine, Token, TokenSequence, Zodiac};
