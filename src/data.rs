use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::PipelineError;
use crate::labels::{LabeledRecord, author_file_name, parse_labels};

pub use crate::types::{AuthorId, Token, TokenSequence};

/// One corpus row before labeling: `id, gender, age, zodiac, text`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRow {
    /// Author identifier column.
    pub id: String,
    /// Raw gender column.
    pub gender: String,
    /// Raw age column; validated by `labels`.
    pub age: String,
    /// Raw zodiac column.
    pub zodiac: String,
    /// Free-text blog body.
    pub text: String,
}

impl RawRow {
    /// Validate the label columns of this row.
    pub fn labels(&self) -> Result<LabeledRecord, PipelineError> {
        parse_labels(&self.id, &self.gender, &self.age, &self.zodiac)
    }

    /// Per-author file name built from the raw label columns.
    pub fn author_file_name(&self) -> String {
        author_file_name(&self.id, &self.gender, &self.age, &self.zodiac)
    }

    /// Label columns followed by `text`, in corpus column order.
    pub fn columns_with_text<'a>(&'a self, text: &'a str) -> [&'a str; 5] {
        [&self.id, &self.gender, &self.age, &self.zodiac, text]
    }
}

/// The pipeline's unit of output: transformed tokens plus author labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Output of the transform chain.
    pub tokens: TokenSequence,
    /// Labels of the row's author.
    pub labels: LabeledRecord,
}

/// Fixed-size ordered batch of data points; the final slice may be short.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Slice {
    /// Data points in stream order.
    pub points: Vec<DataPoint>,
}

impl Slice {
    /// Number of data points in the slice.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` when the slice has no data points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl IntoIterator for Slice {
    type Item = DataPoint;
    type IntoIter = std::vec::IntoIter<DataPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

/// All data points decoded from one corpus file, in row order.
#[derive(Clone, Debug)]
pub struct CorpusFile {
    /// Source file.
    pub path: PathBuf,
    /// Transformed rows that passed validation.
    pub points: Vec<DataPoint>,
    /// Rows of this file that failed decoding or label validation.
    pub rows_skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::AgeBracket;

    fn row() -> RawRow {
        RawRow {
            id: "42".into(),
            gender: "Female".into(),
            age: "23".into(),
            zodiac: "Leo".into(),
            text: "hello world".into(),
        }
    }

    #[test]
    fn raw_row_labels_use_label_parser() {
        let labels = row().labels().unwrap();
        assert_eq!(labels.gender, "female");
        assert_eq!(labels.age_bracket, AgeBracket::Twenties);
    }

    #[test]
    fn raw_row_exposes_author_file_name_and_columns() {
        let row = row();
        assert_eq!(row.author_file_name(), "42.Female.23.Leo.csv");
        assert_eq!(
            row.columns_with_text("hello"),
            ["42", "Female", "23", "Leo", "hello"]
        );
    }

    #[test]
    fn slice_reports_length() {
        let slice = Slice::default();
        assert!(slice.is_empty());
        assert_eq!(slice.len(), 0);
    }
}
