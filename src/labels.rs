//! Author label parsing and the per-author file naming convention.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::labels::{
    FILE_NAME_PARTS, FILE_NAME_SEPARATOR, TWENTIES_MAX_AGE, UNDER_TWENTY_MAX_AGE,
};
use crate::constants::source::CORPUS_EXTENSION;
use crate::errors::PipelineError;
use crate::types::{AuthorId, Gender, Zodiac};

/// Coarse age category derived from an author's numeric age.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    bitcode::Encode,
    bitcode::Decode,
)]
pub enum AgeBracket {
    /// Ages 0 through 19.
    UnderTwenty,
    /// Ages 20 through 29.
    Twenties,
    /// Ages 30 and above.
    ThirtyPlus,
}

impl AgeBracket {
    /// Map a non-negative age onto its bracket.
    pub fn from_age(age: u64) -> Self {
        if age <= UNDER_TWENTY_MAX_AGE {
            AgeBracket::UnderTwenty
        } else if age <= TWENTIES_MAX_AGE {
            AgeBracket::Twenties
        } else {
            AgeBracket::ThirtyPlus
        }
    }

    /// Numeric bracket index (0, 1 or 2).
    pub fn index(self) -> u8 {
        match self {
            AgeBracket::UnderTwenty => 0,
            AgeBracket::Twenties => 1,
            AgeBracket::ThirtyPlus => 2,
        }
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Validated metadata of one author.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, bitcode::Encode, bitcode::Decode,
)]
pub struct LabeledRecord {
    /// Opaque author identifier.
    pub id: AuthorId,
    /// Case-folded gender.
    pub gender: Gender,
    /// Age bracket derived from the numeric age.
    pub age_bracket: AgeBracket,
    /// Zodiac sign, verbatim.
    pub zodiac: Zodiac,
}

impl fmt::Display for LabeledRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(Id: {}, Gender: {}, Age: {}, Zodiac: {})",
            self.id, self.gender, self.age_bracket, self.zodiac
        )
    }
}

/// Parse one author's raw label fields into a `LabeledRecord`.
///
/// The id, gender and zodiac end up in a per-author file name, so they must be
/// non-empty and free of `.` and path separators. The age must be a
/// non-negative integer.
pub fn parse_labels(
    id: &str,
    gender_raw: &str,
    age_raw: &str,
    zodiac_raw: &str,
) -> Result<LabeledRecord, PipelineError> {
    check_label_field("id", id)?;
    check_label_field("gender", gender_raw)?;
    check_label_field("zodiac", zodiac_raw)?;
    Ok(LabeledRecord {
        id: id.to_string(),
        gender: gender_raw.to_lowercase(),
        age_bracket: parse_age_bracket(age_raw)?,
        zodiac: zodiac_raw.to_string(),
    })
}

fn check_label_field(field: &str, value: &str) -> Result<(), PipelineError> {
    let details = if value.is_empty() {
        "empty field"
    } else if value.contains(FILE_NAME_SEPARATOR) {
        "contains the file name separator"
    } else if value.contains(['/', '\\', '\0']) {
        "contains a path separator"
    } else {
        return Ok(());
    };
    Err(PipelineError::InvalidLabel {
        source_name: format!("{field} '{value}'"),
        details: details.to_string(),
    })
}

/// Parse a raw age string and map it to its bracket.
pub fn parse_age_bracket(age_raw: &str) -> Result<AgeBracket, PipelineError> {
    let trimmed = age_raw.trim();
    let age: i64 = trimmed.parse().map_err(|_| PipelineError::InvalidAge {
        value: age_raw.to_string(),
        reason: "not an integer".to_string(),
    })?;
    if age < 0 {
        return Err(PipelineError::InvalidAge {
            value: age_raw.to_string(),
            reason: "age must be non-negative".to_string(),
        });
    }
    Ok(AgeBracket::from_age(age as u64))
}

/// Derive labels from a `<id>.<gender>.<age>.<zodiac>.csv` file name.
pub fn labels_from_file_name(file_name: &str) -> Result<LabeledRecord, PipelineError> {
    let parts: Vec<&str> = file_name.split(FILE_NAME_SEPARATOR).collect();
    if parts.len() != FILE_NAME_PARTS {
        return Err(PipelineError::InvalidLabel {
            source_name: file_name.to_string(),
            details: format!(
                "expected {FILE_NAME_PARTS} '{FILE_NAME_SEPARATOR}'-separated parts, found {}",
                parts.len()
            ),
        });
    }
    if !parts[4].eq_ignore_ascii_case(CORPUS_EXTENSION) {
        return Err(PipelineError::InvalidLabel {
            source_name: file_name.to_string(),
            details: format!("unexpected extension '{}'", parts[4]),
        });
    }
    if parts[..4].iter().any(|part| part.is_empty()) {
        return Err(PipelineError::InvalidLabel {
            source_name: file_name.to_string(),
            details: "empty label field".to_string(),
        });
    }
    parse_labels(parts[0], parts[1], parts[2], parts[3]).map_err(|err| {
        PipelineError::InvalidLabel {
            source_name: file_name.to_string(),
            details: err.to_string(),
        }
    })
}

/// Build the per-author file name for raw label fields.
pub fn author_file_name(id: &str, gender: &str, age: &str, zodiac: &str) -> String {
    let sep = FILE_NAME_SEPARATOR;
    format!(
        "{id}{sep}{gender}{sep}{age}{sep}{zodiac}{sep}{CORPUS_EXTENSION}",
        age = age.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_cover_boundaries() {
        assert_eq!(AgeBracket::from_age(0), AgeBracket::UnderTwenty);
        assert_eq!(AgeBracket::from_age(19), AgeBracket::UnderTwenty);
        assert_eq!(AgeBracket::from_age(20), AgeBracket::Twenties);
        assert_eq!(AgeBracket::from_age(29), AgeBracket::Twenties);
        assert_eq!(AgeBracket::from_age(30), AgeBracket::ThirtyPlus);
        assert_eq!(AgeBracket::from_age(u64::MAX), AgeBracket::ThirtyPlus);
    }

    #[test]
    fn brackets_are_monotonic_in_age() {
        let mut previous = 0u8;
        for age in 0..120u64 {
            let index = AgeBracket::from_age(age).index();
            assert!(index <= 2);
            assert!(index >= previous);
            previous = index;
        }
    }

    #[test]
    fn negative_and_non_numeric_ages_are_rejected() {
        assert!(matches!(
            parse_age_bracket("-1"),
            Err(PipelineError::InvalidAge { .. })
        ));
        assert!(matches!(
            parse_age_bracket("twenty"),
            Err(PipelineError::InvalidAge { .. })
        ));
        assert!(matches!(
            parse_age_bracket(""),
            Err(PipelineError::InvalidAge { .. })
        ));
    }

    #[test]
    fn parse_labels_folds_gender_and_keeps_zodiac() {
        let record = parse_labels("42", "Female", " 23 ", "Leo").unwrap();
        assert_eq!(
            record,
            LabeledRecord {
                id: "42".into(),
                gender: "female".into(),
                age_bracket: AgeBracket::Twenties,
                zodiac: "Leo".into(),
            }
        );
        let odd = parse_labels("7", "UNKNOWN", "40", "sagittarius").unwrap();
        assert_eq!(odd.gender, "unknown");
        assert_eq!(odd.zodiac, "sagittarius");
    }

    #[test]
    fn fields_that_could_leave_a_directory_are_rejected() {
        for (id, gender, zodiac) in [
            ("../escaped", "male", "Leo"),
            ("..", "male", "Leo"),
            ("", "male", "Leo"),
            ("7", "a/b", "Leo"),
            ("7", "male", "..\\Leo"),
            ("7", "male", "Le.o"),
        ] {
            assert!(
                matches!(
                    parse_labels(id, gender, "20", zodiac),
                    Err(PipelineError::InvalidLabel { .. })
                ),
                "{id}/{gender}/{zodiac} should be rejected"
            );
        }
    }

    #[test]
    fn file_name_labels_match_column_labels() {
        let from_name = labels_from_file_name("42.Female.23.Leo.csv").unwrap();
        let from_columns = parse_labels("42", "Female", "23", "Leo").unwrap();
        assert_eq!(from_name, from_columns);
    }

    #[test]
    fn malformed_file_names_are_invalid_labels() {
        for name in [
            "42.Female.Leo.csv",
            "42.Female.23.Leo.txt",
            "42.Female.x.Leo.csv",
            "42..23.Leo.csv",
        ] {
            assert!(
                matches!(
                    labels_from_file_name(name),
                    Err(PipelineError::InvalidLabel { .. })
                ),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn author_file_name_follows_convention() {
        assert_eq!(
            author_file_name("42", "Female", "23", "Leo"),
            "42.Female.23.Leo.csv"
        );
    }
}
