use thiserror::Error;

use crate::models::SubjectMark;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("mark #{position} ({value:?}) is not a number")]
    InvalidMark { position: usize, value: String },
    #[error("mark #{position} ({value}) must be between 0 and 100")]
    MarkOutOfRange { position: usize, value: f64 },
    #[error("the number of subjects ({subjects}) and marks ({marks}) should be the same")]
    CountMismatch { subjects: usize, marks: usize },
}

fn split_list(input: &str) -> impl Iterator<Item = &str> {
    input.split(',').map(str::trim).filter(|item| !item.is_empty())
}

pub fn parse_subjects(input: &str) -> Vec<String> {
    split_list(input).map(str::to_string).collect()
}

pub fn parse_marks(input: &str) -> Result<Vec<f64>, ParseError> {
    split_list(input)
        .enumerate()
        .map(|(index, raw)| {
            let position = index + 1;
            let value: f64 = raw.parse().map_err(|_| ParseError::InvalidMark {
                position,
                value: raw.to_string(),
            })?;
            if !(0.0..=100.0).contains(&value) {
                return Err(ParseError::MarkOutOfRange { position, value });
            }
            Ok(value)
        })
        .collect()
}

/// Zips parsed subjects with their marks, rejecting unequal counts.
pub fn pair_subject_marks(
    subjects: Vec<String>,
    marks: Vec<f64>,
) -> Result<Vec<SubjectMark>, ParseError> {
    if subjects.len() != marks.len() {
        return Err(ParseError::CountMismatch {
            subjects: subjects.len(),
            marks: marks.len(),
        });
    }

    Ok(subjects
        .into_iter()
        .zip(marks)
        .map(|(subject, mark)| SubjectMark { subject, mark })
        .collect())
}
