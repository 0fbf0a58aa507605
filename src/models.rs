use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hours a single time slot can hold.
pub const SLOT_CAPACITY_HOURS: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: i64,
    pub attendance_percentage: f64,
    pub assignment_score: f64,
    pub mid_term_score: f64,
    pub study_hours: f64,
    pub quiz_score: f64,
    pub final_exam_score: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("student id must be a positive integer, got {0}")]
    InvalidId(i64),
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl StudentRecord {
    /// Checks every field against its accepted range, reporting the first
    /// field that falls outside it.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.student_id <= 0 {
            return Err(RecordError::InvalidId(self.student_id));
        }

        let checks = [
            ("attendance_percentage", self.attendance_percentage, 100.0),
            ("assignment_score", self.assignment_score, 10.0),
            ("mid_term_score", self.mid_term_score, 100.0),
            ("study_hours", self.study_hours, 24.0),
            ("quiz_score", self.quiz_score, 10.0),
            ("final_exam_score", self.final_exam_score, 100.0),
        ];

        for (field, value, max) in checks {
            // NaN fails the contains check as well.
            if !(0.0..=max).contains(&value) {
                return Err(RecordError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max,
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectMark {
    pub subject: String,
    pub mark: f64,
}

impl SubjectMark {
    pub fn weight(&self) -> f64 {
        100.0 - self.mark
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimeSlot {
    Morning,
    LateMorning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 4] = [
        TimeSlot::Morning,
        TimeSlot::LateMorning,
        TimeSlot::Afternoon,
        TimeSlot::Evening,
    ];

    pub fn window(self) -> &'static str {
        match self {
            TimeSlot::Morning => "08:00-10:00",
            TimeSlot::LateMorning => "10:00-12:00",
            TimeSlot::Afternoon => "14:00-16:00",
            TimeSlot::Evening => "18:00-20:00",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.window())
    }
}

/// Part of one subject's allocation placed into a single slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub subject: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub day: Weekday,
    pub slot: TimeSlot,
    pub assignments: Vec<Fragment>,
}

impl ScheduleEntry {
    pub fn used_hours(&self) -> f64 {
        self.assignments.iter().map(|fragment| fragment.hours).sum()
    }

    pub fn remaining_capacity(&self) -> f64 {
        (SLOT_CAPACITY_HOURS - self.used_hours()).max(0.0)
    }
}

/// Weekly grid: one row per day, one entry per time slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timetable {
    pub rows: Vec<Vec<ScheduleEntry>>,
}

impl Timetable {
    pub fn empty() -> Self {
        let rows = Weekday::ALL
            .iter()
            .map(|&day| {
                TimeSlot::ALL
                    .iter()
                    .map(|&slot| ScheduleEntry {
                        day,
                        slot,
                        assignments: Vec::new(),
                    })
                    .collect()
            })
            .collect();
        Timetable { rows }
    }

    pub fn capacity_hours() -> f64 {
        (Weekday::ALL.len() * TimeSlot::ALL.len()) as f64 * SLOT_CAPACITY_HOURS
    }

    /// Entries in fill order: day-major, then slot.
    pub fn entries(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.rows.iter().flatten()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut ScheduleEntry> {
        self.rows.iter_mut().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().all(|entry| entry.assignments.is_empty())
    }

    pub fn total_hours(&self) -> f64 {
        self.entries().map(ScheduleEntry::used_hours).sum()
    }

    #[cfg(test)]
    pub fn hours_for(&self, subject: &str) -> f64 {
        self.entries()
            .flat_map(|entry| entry.assignments.iter())
            .filter(|fragment| fragment.subject == subject)
            .map(|fragment| fragment.hours)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub subject: String,
    pub mark: f64,
    pub weight: f64,
    pub hours: f64,
    pub scheduled: f64,
    pub unscheduled: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    ZeroTotalWeight,
    CapacityExceeded { requested: f64, capacity: f64 },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::ZeroTotalWeight => f.write_str(
                "every subject already has a mark of 100, so no study hours were allocated",
            ),
            PlanWarning::CapacityExceeded {
                requested,
                capacity,
            } => write!(
                f,
                "{requested:.2} hours requested but the weekly grid only holds {capacity:.2}; \
                 the remainder is left unscheduled"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyPlan {
    pub total_hours: f64,
    pub allocations: Vec<Allocation>,
    pub timetable: Timetable,
    pub warnings: Vec<PlanWarning>,
}
