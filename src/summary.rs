use std::fmt::Write;

use tracing::{info, warn};

use crate::capability::NarrativeSummary;
use crate::error::{RecordsError, Result};
use crate::models::Student;
use crate::stats;

const SUMMARY_FAILURE: &str = "failed to generate performance summary";

/// Compact request for the narrative capability: subject totals, attendance
/// and the expected answer layout. Student names stay out of it.
pub fn encode_request(student: &Student) -> String {
    let scores = student
        .results
        .iter()
        .map(|result| format!("{}: {}", result.subject, result.total()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut request = String::new();
    let _ = writeln!(
        request,
        "Write a concise three-part performance analysis of a student's mid-term results."
    );
    let _ = writeln!(
        request,
        "Use the labels \"Performance:\", \"Attendance:\" and \"Recommendations:\", each on a new line,"
    );
    let _ = writeln!(request, "and give exactly two recommendations bulleted with '•'.");
    let _ = writeln!(request, "Scores: {scores}");
    let _ = writeln!(
        request,
        "Attendance: {}% present.",
        stats::attendance_rate(&student.attendance)
    );
    request
}

/// Returns the capability's text untouched apart from trimming.
pub async fn summarize<C>(student: &Student, capability: &C) -> Result<String>
where
    C: NarrativeSummary,
{
    info!(subjects = student.results.len(), "requesting performance summary");
    let request = encode_request(student);
    let text = capability.summarize(&request).await.map_err(|err| {
        warn!(error = %err, "performance summary failed");
        RecordsError::ExternalCapability {
            message: SUMMARY_FAILURE,
            cause: format!("{err:#}"),
        }
    })?;
    Ok(text.trim().to_string())
}
