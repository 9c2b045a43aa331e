use std::path::Path;

use tracing::{debug, info};

use crate::error::{RecordsError, Result};
use crate::models::{normalize_subject, Student, SubjectResult, SubjectScore};

pub fn load(path: &Path) -> Result<Vec<Student>> {
    let raw = std::fs::read_to_string(path)?;
    let students: Vec<Student> = serde_json::from_str(&raw)?;
    info!(students = students.len(), path = %path.display(), "roster loaded");
    Ok(students)
}

pub fn save(path: &Path, students: &[Student]) -> Result<()> {
    let json = serde_json::to_string_pretty(students)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn in_class<'a>(students: &'a [Student], class_name: &str) -> Vec<&'a Student> {
    let wanted = class_name.trim();
    students
        .iter()
        .filter(|student| student.class_name.eq_ignore_ascii_case(wanted))
        .collect()
}

/// Applies bulk marks from a CSV with `student_id,subject,ca,exam` columns.
///
/// The whole file is checked before any student is touched, so a bad row
/// leaves the roster unchanged. Returns the number of rows applied.
pub fn import_marks(students: &mut [Student], csv_path: &Path) -> Result<usize> {
    #[derive(serde::Deserialize)]
    struct MarkRow {
        student_id: String,
        subject: String,
        ca: f64,
        exam: f64,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut pending = Vec::new();

    for (index, result) in reader.deserialize::<MarkRow>().enumerate() {
        let row = result?;
        // Header is line 1.
        let line = index + 2;

        let slot = students
            .iter()
            .position(|student| student.id == row.student_id.trim())
            .ok_or_else(|| {
                RecordsError::validation(format!(
                    "line {line}: no student with admission number `{}`",
                    row.student_id.trim()
                ))
            })?;
        let subject = normalize_subject(&row.subject);
        if subject.is_empty() {
            return Err(RecordsError::validation(format!("line {line}: subject is blank")));
        }
        if !(row.ca.is_finite() && row.exam.is_finite()) || row.ca < 0.0 || row.exam < 0.0 {
            return Err(RecordsError::validation(format!(
                "line {line}: scores must be non-negative numbers"
            )));
        }
        if row.ca + row.exam > 100.0 {
            return Err(RecordsError::validation(format!(
                "line {line}: {subject} total {} is above 100",
                row.ca + row.exam
            )));
        }

        pending.push((slot, subject, SubjectScore::new(row.ca, row.exam)));
    }

    let applied = pending.len();
    for (slot, subject, scores) in pending {
        let student = &mut students[slot];
        let replaced = student.result_for(&subject).is_some();
        if replaced {
            for existing in student.results.iter_mut().filter(|result| result.subject == subject) {
                existing.scores = scores;
            }
        } else {
            student.results.push(SubjectResult::new(&subject, scores));
        }
        debug!(student = %student.id, subject = %subject, replaced, "marks applied");
    }

    info!(rows = applied, path = %csv_path.display(), "bulk marks imported");
    Ok(applied)
}
