use std::fmt::Write;

use serde::Serialize;

use crate::grading::{grade_for, severity_tier_for, Grade, SeverityTier};
use crate::models::{whole_percent, AssessmentWeighting, Student};
use crate::stats;

/// One row of the cognitive assessment table. Subjects are always graded out
/// of 100, whatever the weighting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRow {
    pub subject: String,
    pub continuous_assessment: f64,
    pub examination: f64,
    pub total: f64,
    pub percentage: u32,
    pub grade: Grade,
    pub severity: SeverityTier,
    pub highest_in_class: f64,
    pub lowest_in_class: f64,
    pub class_average: f64,
}

/// Finished report for a single student. Built only by [`compile`] and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    student: Student,
    weighting: AssessmentWeighting,
    rows: Vec<SubjectRow>,
    total_scored: f64,
    total_possible: u32,
    overall_percentage: u32,
    overall_grade: Grade,
    attendance_rate: u32,
}

impl ReportDocument {
    pub fn student(&self) -> &Student {
        &self.student
    }

    pub fn weighting(&self) -> AssessmentWeighting {
        self.weighting
    }

    pub fn rows(&self) -> &[SubjectRow] {
        &self.rows
    }

    pub fn total_scored(&self) -> f64 {
        self.total_scored
    }

    pub fn total_possible(&self) -> u32 {
        self.total_possible
    }

    pub fn overall_percentage(&self) -> u32 {
        self.overall_percentage
    }

    pub fn overall_grade(&self) -> Grade {
        self.overall_grade
    }

    pub fn attendance_rate(&self) -> u32 {
        self.attendance_rate
    }

    pub fn overall_line(&self) -> String {
        format!(
            "Overall: {}/{} ({}%) - Grade: {} | Position: {}/{}",
            self.total_scored(),
            self.total_possible(),
            self.overall_percentage,
            self.overall_grade,
            self.student.position.rank,
            self.student.position.total_students
        )
    }
}

pub fn compile(student: &Student, weighting: AssessmentWeighting) -> ReportDocument {
    let total_possible = student.results.len() as u32 * 100;
    let total_scored: f64 = student.results.iter().map(|result| result.total()).sum();
    let overall_percentage = if total_possible > 0 {
        whole_percent(total_scored / f64::from(total_possible) * 100.0)
    } else {
        0
    };

    let rows = student
        .results
        .iter()
        .map(|result| {
            let total = result.total();
            let percentage = whole_percent(total);
            SubjectRow {
                subject: result.subject.clone(),
                continuous_assessment: result.scores.continuous_assessment,
                examination: result.scores.examination,
                total,
                percentage,
                grade: grade_for(f64::from(percentage)),
                severity: severity_tier_for(f64::from(percentage)),
                highest_in_class: result.highest_in_class,
                lowest_in_class: result.lowest_in_class,
                class_average: result.class_average,
            }
        })
        .collect();

    ReportDocument {
        student: student.clone(),
        weighting,
        rows,
        total_scored,
        total_possible,
        overall_percentage,
        overall_grade: grade_for(f64::from(overall_percentage)),
        attendance_rate: stats::attendance_rate(&student.attendance),
    }
}

pub fn render_markdown(document: &ReportDocument) -> String {
    let student = document.student();
    let weighting = document.weighting();
    let mut output = String::new();

    let _ = writeln!(output, "# Mid-Term Report");
    let _ = writeln!(
        output,
        "{} term, {} session",
        student.term, student.session
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Student");
    let _ = writeln!(output, "- Name: {}", student.name);
    let _ = writeln!(output, "- Admission No: {}", student.id);
    let _ = writeln!(output, "- Class: {}", student.class_name);
    let _ = writeln!(output, "- Gender: {:?}", student.gender);
    let _ = writeln!(
        output,
        "- Position: {} of {}",
        student.position.rank, student.position.total_students
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Cognitive Assessment");

    if document.rows().is_empty() {
        let _ = writeln!(output, "No subjects recorded for this term.");
    } else {
        let _ = writeln!(
            output,
            "| Subject | {} | {} | Total | Grade | Remark | Highest | Lowest | Average |",
            weighting.ca_header(),
            weighting.exam_header()
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|");
        for row in document.rows() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} | {:.2} |",
                row.subject,
                row.continuous_assessment,
                row.examination,
                row.total,
                row.grade,
                row.grade.remark(),
                row.highest_in_class,
                row.lowest_in_class,
                row.class_average
            );
        }
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", document.overall_line());

    let attendance = &student.attendance;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance");
    let _ = writeln!(output, "- Days Recorded: {}", attendance.days_recorded);
    let _ = writeln!(output, "- Present: {}", attendance.present);
    let _ = writeln!(output, "- Absent: {}", attendance.absent);
    let _ = writeln!(output, "- Leave: {}", attendance.leave);
    let _ = writeln!(output, "- Attendance Rate: {}%", document.attendance_rate());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance Summary");
    match student.performance_summary.as_deref() {
        Some(summary) if !summary.trim().is_empty() => {
            let _ = writeln!(output, "{}", summary.trim());
        }
        _ => {
            let _ = writeln!(output, "No summary available.");
        }
    }

    output
}
