//! Corpus statistics built on top of the pipeline streams.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::counters::{BUCKET_LONG, BUCKET_MEDIUM, BUCKET_SHORT, BUCKET_VERY_LONG};
use crate::data::{CorpusFile, DataPoint};
use crate::errors::PipelineError;
use crate::labels::labels_from_file_name;
use crate::source::count_csv_records;
use crate::transport::fs::{ListingOptions, ensure_corpus_root, file_name_string, list_corpus_files};
use crate::types::{BucketKey, Token};
use crate::writer::LineLog;

/// Token and type totals for a corpus.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VocabularyReport {
    /// Token counts in first-seen order.
    pub vocabulary: IndexMap<Token, u64>,
    /// Total tokens seen.
    pub tokens: u64,
    /// Distinct tokens seen.
    pub types: usize,
}

/// Count tokens and types over `files`.
///
/// After each file the running number of distinct types is appended to
/// `types_log`, giving a types-per-file growth curve.
pub fn count_types<I>(
    files: I,
    types_log: Option<&LineLog>,
) -> Result<VocabularyReport, PipelineError>
where
    I: IntoIterator<Item = CorpusFile>,
{
    let mut report = VocabularyReport::default();
    for file in files {
        for point in &file.points {
            for token in &point.tokens {
                *report.vocabulary.entry(token.clone()).or_insert(0) += 1;
                report.tokens += 1;
            }
        }
        report.types = report.vocabulary.len();
        if let Some(log) = types_log {
            log.append(report.types.to_string())?;
        }
        debug!(path = %file.path.display(), types = report.types, "counted file");
    }
    Ok(report)
}

/// Post-length histogram.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LengthReport {
    /// Posts per length bucket, shortest bucket first.
    pub buckets: IndexMap<BucketKey, u64>,
}

impl Default for LengthReport {
    fn default() -> Self {
        let buckets = [BUCKET_SHORT, BUCKET_MEDIUM, BUCKET_LONG, BUCKET_VERY_LONG]
            .into_iter()
            .map(|bucket| (bucket.to_string(), 0))
            .collect();
        Self { buckets }
    }
}

/// Bucket a post of `tokens` tokens.
pub fn length_bucket(tokens: usize) -> &'static str {
    match tokens {
        0..=50 => BUCKET_SHORT,
        51..=99 => BUCKET_MEDIUM,
        100..=199 => BUCKET_LONG,
        _ => BUCKET_VERY_LONG,
    }
}

/// Histogram of post lengths in tokens.
pub fn count_lengths<I>(points: I) -> LengthReport
where
    I: IntoIterator<Item = DataPoint>,
{
    let mut report = LengthReport::default();
    for point in points {
        *report
            .buckets
            .entry(length_bucket(point.tokens.len()).to_string())
            .or_insert(0) += 1;
    }
    report
}

/// Label multiplicities, one count per post.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    /// Posts per case-folded gender.
    pub genders: IndexMap<String, u64>,
    /// Keyed by age bracket index (`0`, `1`, `2`).
    pub ages: IndexMap<String, u64>,
    /// Posts per zodiac sign.
    pub zodiacs: IndexMap<String, u64>,
}

/// Count labels from per-author file names, weighted by each file's row count.
///
/// Files whose names do not follow the naming convention are skipped.
pub fn count_labels(dir: &Path) -> Result<LabelCounts, PipelineError> {
    ensure_corpus_root(dir)?;
    let mut counts = LabelCounts::default();
    for path in list_corpus_files(dir, ListingOptions::default())? {
        let labels = match labels_from_file_name(&file_name_string(&path)) {
            Ok(labels) => labels,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unlabeled file");
                continue;
            }
        };
        let posts = match count_csv_records(&path) {
            Ok(posts) => posts,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };
        *counts.genders.entry(labels.gender).or_insert(0) += posts;
        *counts
            .ages
            .entry(labels.age_bracket.to_string())
            .or_insert(0) += posts;
        *counts.zodiacs.entry(labels.zodiac).or_insert(0) += posts;
    }
    Ok(counts)
}

/// Write `value` as pretty JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(out, value).map_err(|err| PipelineError::Io(err.into()))
}
