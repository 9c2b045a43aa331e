use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::capability::TextUnderstanding;
use crate::error::{RecordsError, Result};
use crate::models::{
    AssessmentWeighting, AttendanceRecord, Gender, PositionInfo, Student, StudentStatus,
    SubjectResult,
};

pub const DEFAULT_CLASS: &str = "JS 1A";
pub const DEFAULT_SESSION: &str = "2025/2026";
pub const DEFAULT_TERM: &str = "First";
pub const PENDING_SUMMARY: &str = "AI analysis pending.";
const DEFAULT_HIGHEST: f64 = 98.0;
const DEFAULT_LOWEST: f64 = 40.0;
const DEFAULT_AVERAGE: f64 = 75.5;

#[derive(Debug, Deserialize)]
struct ExtractedRecord {
    name: Option<String>,
    id: Option<String>,
    results: Option<Vec<ExtractedResult>>,
}

#[derive(Debug, Deserialize)]
struct ExtractedResult {
    subject: String,
    score: f64,
}

/// Builds complete student records from free text.
#[derive(Debug, Clone)]
pub struct Normalizer {
    split: AssessmentWeighting,
    timeout: Option<Duration>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            split: AssessmentWeighting::COMPOSITE_SPLIT,
            timeout: None,
        }
    }
}

impl Normalizer {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// One attempt only; the caller decides whether to try again.
    pub async fn normalize<C>(&self, text: &str, capability: &C) -> Result<Student>
    where
        C: TextUnderstanding,
    {
        let text = text.trim();
        if text.is_empty() {
            return Err(RecordsError::validation("Please enter student details."));
        }

        info!(chars = text.len(), "requesting record extraction");
        let response = match self.call(text, capability).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "record extraction failed");
                return Err(err);
            }
        };

        let student = self.build(&response).inspect_err(|err| {
            warn!(error = %err, "extracted record rejected");
        })?;
        info!(subjects = student.results.len(), "record normalized");
        Ok(student)
    }

    async fn call<C>(&self, text: &str, capability: &C) -> Result<String>
    where
        C: TextUnderstanding,
    {
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, capability.extract(text)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(RecordsError::parse(format!(
                        "text-understanding service did not answer within {limit:?}"
                    )))
                }
            },
            None => capability.extract(text).await,
        };
        outcome.map_err(|err| RecordsError::parse(format!("text-understanding service failed: {err:#}")))
    }

    fn build(&self, response: &str) -> Result<Student> {
        let response = response.trim();
        if response.is_empty() {
            return Err(RecordsError::parse("service returned an empty response"));
        }

        let record: ExtractedRecord = serde_json::from_str(response)
            .map_err(|err| RecordsError::parse(format!("response is not a student record: {err}")))?;

        let name = required(record.name, "name")?;
        let id = required(record.id, "id")?;
        let extracted = record
            .results
            .ok_or_else(|| RecordsError::parse("response is missing `results`"))?;

        let mut results = Vec::with_capacity(extracted.len());
        for entry in extracted {
            if entry.subject.trim().is_empty() {
                return Err(RecordsError::parse("response contains a result without a subject"));
            }
            if !entry.score.is_finite() || entry.score < 0.0 {
                return Err(RecordsError::parse(format!(
                    "score for `{}` is not a valid number",
                    entry.subject.trim()
                )));
            }
            let mut result = SubjectResult::new(&entry.subject, self.split.split(entry.score));
            result.highest_in_class = DEFAULT_HIGHEST;
            result.lowest_in_class = DEFAULT_LOWEST;
            result.class_average = DEFAULT_AVERAGE;
            results.push(result);
        }

        Ok(Student {
            id,
            name,
            gender: Gender::Female,
            class_name: DEFAULT_CLASS.to_string(),
            session: DEFAULT_SESSION.to_string(),
            term: DEFAULT_TERM.to_string(),
            status: StudentStatus::Active,
            position: PositionInfo::default(),
            attendance: AttendanceRecord::default(),
            results,
            performance_summary: Some(PENDING_SUMMARY.to_string()),
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RecordsError::parse(format!("response is missing `{field}`")))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Canned {
        response: anyhow::Result<&'static str>,
        calls: Cell<usize>,
    }

    impl Canned {
        fn ok(response: &'static str) -> Self {
            Self {
                response: Ok(response),
                calls: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(anyhow::anyhow!("quota exceeded")),
                calls: Cell::new(0),
            }
        }
    }

    impl TextUnderstanding for Canned {
        async fn extract(&self, _text: &str) -> anyhow::Result<String> {
            self.calls.set(self.calls.get() + 1);
            match &self.response {
                Ok(body) => Ok(body.to_string()),
                Err(err) => Err(anyhow::anyhow!("{err}")),
            }
        }
    }

    struct Silent;

    impl TextUnderstanding for Silent {
        async fn extract(&self, _text: &str) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    const JOHN_DOE: &str = r#"{"name":"John Doe","id":"123","results":[{"subject":"Math","score":85},{"subject":"Science","score":92}]}"#;

    #[tokio::test]
    async fn splits_scores_and_fills_defaults() {
        let capability = Canned::ok(JOHN_DOE);
        let student = Normalizer::default()
            .normalize("John Doe, ID 123, Math: 85, Science: 92", &capability)
            .await
            .unwrap();

        assert_eq!(student.name, "John Doe");
        assert_eq!(student.id, "123");
        let math = student.result_for("Math").unwrap();
        assert_eq!(math.subject, "MATH");
        assert_eq!(math.scores.continuous_assessment, 34.0);
        assert_eq!(math.scores.examination, 51.0);
        assert_eq!(math.highest_in_class, 98.0);
        assert_eq!(math.lowest_in_class, 40.0);
        assert_eq!(math.class_average, 75.5);
        let science = student.result_for("SCIENCE").unwrap();
        assert_eq!(science.scores.continuous_assessment, 37.0);
        assert_eq!(science.scores.examination, 55.0);

        assert_eq!(student.gender, Gender::Female);
        assert_eq!(student.class_name, DEFAULT_CLASS);
        assert_eq!(student.session, DEFAULT_SESSION);
        assert_eq!(student.term, DEFAULT_TERM);
        assert_eq!(student.status, StudentStatus::Active);
        assert_eq!(student.position, PositionInfo { rank: 1, total_students: 1 });
        assert_eq!(student.attendance, AttendanceRecord::default());
        assert_eq!(student.performance_summary.as_deref(), Some(PENDING_SUMMARY));
    }

    #[tokio::test]
    async fn blank_text_never_reaches_the_service() {
        let capability = Canned::ok(JOHN_DOE);
        let err = Normalizer::default()
            .normalize("   \n\t", &capability)
            .await
            .unwrap_err();
        assert!(matches!(err, RecordsError::Validation(_)));
        assert_eq!(capability.calls.get(), 0);
    }

    #[tokio::test]
    async fn service_failure_is_a_parse_error() {
        let capability = Canned::failing();
        let err = Normalizer::default()
            .normalize("Ada, ID 7", &capability)
            .await
            .unwrap_err();
        assert!(matches!(err, RecordsError::Parse { .. }));
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(capability.calls.get(), 1);
    }

    #[tokio::test]
    async fn malformed_responses_are_rejected() {
        for body in [
            "",
            "not json",
            r#"{"name":"Ada","id":"7","results":"none"}"#,
            r#"{"name":"Ada","results":[]}"#,
            r#"{"name":"  ","id":"7","results":[]}"#,
            r#"{"name":"Ada","id":"7"}"#,
            r#"{"name":"Ada","id":"7","results":[{"subject":"","score":50}]}"#,
            r#"{"name":"Ada","id":"7","results":[{"subject":"Art","score":-4}]}"#,
        ] {
            let capability = Canned::ok(body);
            let err = Normalizer::default()
                .normalize("Ada, ID 7", &capability)
                .await
                .unwrap_err();
            assert!(matches!(err, RecordsError::Parse { .. }), "accepted {body:?}");
        }
    }

    #[tokio::test]
    async fn empty_results_are_valid() {
        let capability = Canned::ok(r#"{"name":"Ada","id":"7","results":[]}"#);
        let student = Normalizer::default()
            .normalize("Ada, ID 7", &capability)
            .await
            .unwrap();
        assert!(student.results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_bounds_the_call() {
        let err = Normalizer::default()
            .with_timeout(Duration::from_secs(5))
            .normalize("Ada, ID 7", &Silent)
            .await
            .unwrap_err();
        assert!(matches!(err, RecordsError::Parse { .. }));
        assert!(err.to_string().contains("within 5s"));
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_timeouts_are_reported_exactly() {
        let err = Normalizer::default()
            .with_timeout(Duration::from_millis(250))
            .normalize("Ada, ID 7", &Silent)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("within 250ms"), "{err}");
    }
}
