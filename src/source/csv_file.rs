use std::path::Path;

use csv::StringRecord;

use crate::constants::source::{LABEL_COLUMNS, TEXT_COLUMN};
use crate::data::RawRow;
use crate::errors::PipelineError;

/// Decoded rows of one file; each row fails or succeeds on its own.
pub type DecodedRows = Vec<Result<RawRow, PipelineError>>;

/// Decode a headerless `id, gender, age, zodiac, text` CSV file.
///
/// The reader is quoting-aware, so bodies may contain commas and newlines.
/// Files that cannot be opened or read fail as a whole; rows with missing
/// label columns or invalid UTF-8 fail individually. Extra columns after the
/// text are treated as unquoted commas in the body.
pub fn decode_csv_file(path: &Path) -> Result<DecodedRows, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| decode_error(path, err))?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        match record {
            Ok(record) => rows.push(row_from_record(path, idx, &record)),
            Err(err) if err.is_io_error() => return Err(decode_error(path, err)),
            Err(err) => rows.push(Err(decode_error(path, err))),
        }
    }
    Ok(rows)
}

/// Count the records of a corpus file without building rows.
pub fn count_csv_records(path: &Path) -> Result<u64, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| decode_error(path, err))?;
    let mut record = csv::ByteRecord::new();
    let mut count = 0u64;
    while reader
        .read_byte_record(&mut record)
        .map_err(|err| decode_error(path, err))?
    {
        count += 1;
    }
    Ok(count)
}

fn row_from_record(
    path: &Path,
    idx: usize,
    record: &StringRecord,
) -> Result<RawRow, PipelineError> {
    if record.len() < LABEL_COLUMNS {
        return Err(PipelineError::Decode {
            path: path.to_path_buf(),
            details: format!(
                "row {idx}: expected at least {LABEL_COLUMNS} columns, found {}",
                record.len()
            ),
        });
    }
    Ok(RawRow {
        id: record[0].to_string(),
        gender: record[1].to_string(),
        age: record[2].to_string(),
        zodiac: record[3].to_string(),
        text: rejoin_text(record),
    })
}

/// Columns past the labels belong to the body; an unquoted comma in the text
/// splits it, so the pieces are joined back.
fn rejoin_text(record: &StringRecord) -> String {
    record
        .iter()
        .skip(TEXT_COLUMN)
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_error(path: &Path, err: csv::Error) -> PipelineError {
    PipelineError::Decode {
        path: path.to_path_buf(),
        details: err.to_string(),
    }
}
