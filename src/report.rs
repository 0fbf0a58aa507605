use std::fmt::Write;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{Fragment, ScheduleEntry, StudentRecord, StudyPlan, TimeSlot, Timetable};

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn format_fragments(fragments: &[Fragment]) -> String {
    if fragments.is_empty() {
        return "-".to_string();
    }

    fragments
        .iter()
        .map(|fragment| format!("{} ({:.2}h)", fragment.subject, fragment.hours))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn render_student(record: &StudentRecord) -> String {
    let mut output = String::new();
    let fields = [
        ("Attendance Percentage", record.attendance_percentage),
        ("Assignment Score", record.assignment_score),
        ("Mid-Term Score", record.mid_term_score),
        ("Study Hours", record.study_hours),
        ("Quiz Score", record.quiz_score),
        ("Final Exam Score", record.final_exam_score),
    ];

    let _ = writeln!(output, "Student {}", record.student_id);
    for (label, value) in fields {
        let _ = writeln!(output, "  {label:<22} {value}");
    }
    output
}

pub fn render_timetable(timetable: &Timetable) -> String {
    let mut output = String::new();

    for row in &timetable.rows {
        let Some(first) = row.first() else {
            continue;
        };
        let _ = writeln!(output, "{}", first.day);
        for entry in row {
            let _ = writeln!(
                output,
                "  {}  {}",
                entry.slot,
                format_fragments(&entry.assignments)
            );
        }
    }

    output
}

fn markdown_row(row: &[ScheduleEntry]) -> String {
    let cells: Vec<String> = row
        .iter()
        .map(|entry| format_fragments(&entry.assignments))
        .collect();
    let day = row.first().map(|entry| entry.day.name()).unwrap_or("");
    format!("| {} | {} |", day, cells.join(" | "))
}

pub fn build_report(
    student: Option<&StudentRecord>,
    week_of: NaiveDate,
    plan: &StudyPlan,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Weekly Study Timetable");
    let _ = writeln!(
        output,
        "Week of {} ({:.2} hours requested, {:.2} scheduled)",
        week_start(week_of),
        plan.total_hours,
        plan.timetable.total_hours()
    );

    if let Some(student) = student {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Student {}", student.student_id);
        let _ = writeln!(
            output,
            "- Attendance {:.1}%, mid-term {:.1}, final exam {:.1}",
            student.attendance_percentage, student.mid_term_score, student.final_exam_score
        );
        let _ = writeln!(
            output,
            "- Assignment {:.1}/10, quiz {:.1}/10, {:.1} study hours per day",
            student.assignment_score, student.quiz_score, student.study_hours
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Allocation");
    let _ = writeln!(output, "| Subject | Mark | Hours | Scheduled |");
    let _ = writeln!(output, "| --- | --- | --- | --- |");
    for allocation in &plan.allocations {
        let _ = writeln!(
            output,
            "| {} | {:.1} | {:.2} | {:.2} |",
            allocation.subject, allocation.mark, allocation.hours, allocation.scheduled
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Timetable");
    if plan.timetable.is_empty() {
        let _ = writeln!(output, "No study sessions scheduled this week.");
    } else {
        let headers: Vec<&str> = TimeSlot::ALL.iter().map(|slot| slot.window()).collect();
        let _ = writeln!(output, "| Day | {} |", headers.join(" | "));
        let _ = writeln!(output, "|{}", " --- |".repeat(headers.len() + 1));
        for row in &plan.timetable.rows {
            let _ = writeln!(output, "{}", markdown_row(row));
        }
    }

    if !plan.warnings.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Warnings");
        for warning in &plan.warnings {
            let _ = writeln!(output, "- {warning}");
        }
    }

    output
}

pub fn to_json(plan: &StudyPlan) -> serde_json::Result<String> {
    serde_json::to_string_pretty(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubjectMark;
    use crate::planner;

    fn sample_plan() -> StudyPlan {
        let subjects = vec![
            SubjectMark {
                subject: "Math".to_string(),
                mark: 50.0,
            },
            SubjectMark {
                subject: "Physics".to_string(),
                mark: 75.0,
            },
        ];
        planner::generate(&subjects, 10.0).unwrap()
    }

    #[test]
    fn week_start_is_monday() {
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(week_start(sunday), monday);
        assert_eq!(week_start(monday), monday);
    }

    #[test]
    fn text_grid_lists_fragments_per_slot() {
        let text = render_timetable(&sample_plan().timetable);
        assert!(text.starts_with("Monday\n  08:00-10:00  Math (2.00h)\n"));
        assert!(text.contains("  18:00-20:00  Math (0.67h), Physics (1.33h)\n"));
        assert!(text.contains("Sunday\n  08:00-10:00  -\n"));
    }

    #[test]
    fn student_rendering_lists_every_field() {
        let record = StudentRecord {
            student_id: 4,
            attendance_percentage: 90.0,
            assignment_score: 7.0,
            mid_term_score: 66.5,
            study_hours: 2.0,
            quiz_score: 6.0,
            final_exam_score: 73.0,
        };
        let text = render_student(&record);
        assert!(text.starts_with("Student 4\n"));
        assert!(text.contains("Mid-Term Score"));
        assert!(text.contains("66.5"));
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn report_has_allocation_and_grid() {
        let week_of = NaiveDate::from_ymd_opt(2026, 10, 21).unwrap();
        let report = build_report(None, week_of, &sample_plan());
        assert!(report.contains("Week of 2026-10-19 (10.00 hours requested, 10.00 scheduled)"));
        assert!(report.contains("| Math | 50.0 | 6.67 | 6.67 |"));
        assert!(report.contains("| Day | 08:00-10:00 | 10:00-12:00 | 14:00-16:00 | 18:00-20:00 |"));
        assert!(report.contains("| Tuesday | Physics (2.00h) | - | - | - |"));
        assert!(!report.contains("## Warnings"));
    }

    #[test]
    fn empty_plan_reports_no_sessions_and_warnings() {
        let subjects = vec![SubjectMark {
            subject: "Math".to_string(),
            mark: 100.0,
        }];
        let plan = planner::generate(&subjects, 5.0).unwrap();
        let report = build_report(None, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), &plan);
        assert!(report.contains("No study sessions scheduled this week."));
        assert!(report.contains("## Warnings"));
    }

    #[test]
    fn json_includes_grid_and_warnings() {
        let json = to_json(&sample_plan()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["timetable"]["rows"].as_array().unwrap().len(), 7);
        assert_eq!(value["timetable"]["rows"][0][0]["day"], "Monday");
        assert_eq!(value["allocations"][0]["subject"], "Math");
        assert!(value["warnings"].as_array().unwrap().is_empty());
    }
}
