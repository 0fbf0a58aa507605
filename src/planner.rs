use thiserror::Error;
use tracing::{debug, warn};

use crate::input;
use crate::models::{Allocation, Fragment, PlanWarning, StudyPlan, SubjectMark, Timetable};

/// Most hours a week can hold, matching the upper bound of the input form.
pub const MAX_WEEKLY_HOURS: f64 = 168.0;

/// Allocations smaller than this are float residue, not study time.
const EPSILON_HOURS: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("the number of subjects ({subjects}) and marks ({marks}) should be the same")]
    CountMismatch { subjects: usize, marks: usize },
    #[error("total study hours must be between 0 and 168, got {0}")]
    InvalidHours(f64),
    #[error("at least one subject is required")]
    NoSubjects,
    #[error("mark for {subject} must be between 0 and 100, got {mark}")]
    InvalidMark { subject: String, mark: f64 },
}

/// Splits `total_hours` across subjects in proportion to `100 - mark`.
///
/// Returns `None` when every weight is zero.
pub fn subject_hours(subjects: &[SubjectMark], total_hours: f64) -> Option<Vec<f64>> {
    let total_weight: f64 = subjects.iter().map(SubjectMark::weight).sum();
    if !(total_weight > 0.0) {
        return None;
    }

    Some(
        subjects
            .iter()
            .map(|subject| subject.weight() / total_weight * total_hours)
            .collect(),
    )
}

/// Places `hours` for `subject` into the first slots with free capacity,
/// scanning day by day. Returns the hours that did not fit.
pub fn place_subject(timetable: &mut Timetable, subject: &str, hours: f64) -> f64 {
    let mut remaining = hours;

    for entry in timetable.entries_mut() {
        if remaining <= EPSILON_HOURS {
            break;
        }

        let free = entry.remaining_capacity();
        if free <= EPSILON_HOURS {
            continue;
        }

        let chunk = remaining.min(free);
        entry.assignments.push(Fragment {
            subject: subject.to_string(),
            hours: chunk,
        });
        remaining -= chunk;
    }

    if remaining <= EPSILON_HOURS {
        0.0
    } else {
        remaining
    }
}

pub fn generate(subjects: &[SubjectMark], total_hours: f64) -> Result<StudyPlan, PlanError> {
    if !total_hours.is_finite() || !(0.0..=MAX_WEEKLY_HOURS).contains(&total_hours) {
        return Err(PlanError::InvalidHours(total_hours));
    }
    if subjects.is_empty() {
        return Err(PlanError::NoSubjects);
    }
    // NaN fails the range check too.
    if let Some(bad) = subjects
        .iter()
        .find(|subject| !(0.0..=100.0).contains(&subject.mark))
    {
        return Err(PlanError::InvalidMark {
            subject: bad.subject.clone(),
            mark: bad.mark,
        });
    }

    let mut warnings = Vec::new();
    let mut timetable = Timetable::empty();

    let hours = match subject_hours(subjects, total_hours) {
        Some(hours) => hours,
        None => {
            warn!(subjects = subjects.len(), "total weight is zero, nothing to allocate");
            warnings.push(PlanWarning::ZeroTotalWeight);
            vec![0.0; subjects.len()]
        }
    };

    let capacity = Timetable::capacity_hours();
    if total_hours > capacity && !warnings.contains(&PlanWarning::ZeroTotalWeight) {
        warn!(requested = total_hours, capacity, "weekly grid is too small for the request");
        warnings.push(PlanWarning::CapacityExceeded {
            requested: total_hours,
            capacity,
        });
    }

    let allocations = subjects
        .iter()
        .zip(hours)
        .map(|(subject, hours)| {
            let unscheduled = place_subject(&mut timetable, &subject.subject, hours);
            debug!(
                subject = %subject.subject,
                mark = subject.mark,
                hours,
                unscheduled,
                "allocated subject"
            );
            Allocation {
                subject: subject.subject.clone(),
                mark: subject.mark,
                weight: subject.weight(),
                hours,
                scheduled: hours - unscheduled,
                unscheduled,
            }
        })
        .collect();

    Ok(StudyPlan {
        total_hours,
        allocations,
        timetable,
        warnings,
    })
}

/// Same as [`generate`] for parallel subject and mark sequences.
pub fn generate_from_lists(
    subjects: &[String],
    marks: &[f64],
    total_hours: f64,
) -> Result<StudyPlan, PlanError> {
    let pairs = input::pair_subject_marks(subjects.to_vec(), marks.to_vec()).map_err(|_| {
        PlanError::CountMismatch {
            subjects: subjects.len(),
            marks: marks.len(),
        }
    })?;
    generate(&pairs, total_hours)
}
