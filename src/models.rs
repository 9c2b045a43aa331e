use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubjectScore {
    #[serde(rename = "ca", alias = "continuousAssessment")]
    pub continuous_assessment: f64,
    #[serde(rename = "exam", alias = "examination")]
    pub examination: f64,
}

impl SubjectScore {
    pub fn new(continuous_assessment: f64, examination: f64) -> Self {
        Self {
            continuous_assessment,
            examination,
        }
    }

    pub fn total(&self) -> f64 {
        self.continuous_assessment + self.examination
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub subject: String,
    pub scores: SubjectScore,
    pub highest_in_class: f64,
    pub lowest_in_class: f64,
    pub class_average: f64,
}

impl SubjectResult {
    /// Subject names are stored trimmed and upper-cased.
    pub fn new(subject: &str, scores: SubjectScore) -> Self {
        Self {
            subject: normalize_subject(subject),
            scores,
            highest_in_class: 0.0,
            lowest_in_class: 0.0,
            class_average: 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.scores.total()
    }
}

pub fn normalize_subject(subject: &str) -> String {
    subject.trim().to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub days_recorded: u32,
    pub present: u32,
    pub absent: u32,
    pub leave: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionInfo {
    pub rank: u32,
    pub total_students: u32,
}

impl Default for PositionInfo {
    fn default() -> Self {
        Self {
            rank: 1,
            total_students: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Admission number.
    pub id: String,
    pub name: String,
    pub gender: Gender,
    #[serde(rename = "class")]
    pub class_name: String,
    pub session: String,
    pub term: String,
    pub status: StudentStatus,
    pub position: PositionInfo,
    pub attendance: AttendanceRecord,
    #[serde(default)]
    pub results: Vec<SubjectResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_summary: Option<String>,
}

impl Student {
    pub fn result_for(&self, subject: &str) -> Option<&SubjectResult> {
        let key = normalize_subject(subject);
        self.results.iter().find(|result| result.subject == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassTier {
    Junior,
    Senior,
}

impl ClassTier {
    /// Senior secondary classes are named `SS ...`; everything else is junior.
    pub fn for_class(class_name: &str) -> Self {
        if class_name.trim().to_uppercase().starts_with("SS") {
            ClassTier::Senior
        } else {
            ClassTier::Junior
        }
    }

    pub fn weighting(&self) -> AssessmentWeighting {
        match self {
            ClassTier::Junior => AssessmentWeighting::JUNIOR,
            ClassTier::Senior => AssessmentWeighting::SENIOR,
        }
    }
}

impl fmt::Display for ClassTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassTier::Junior => write!(f, "junior"),
            ClassTier::Senior => write!(f, "senior"),
        }
    }
}

/// Split between continuous assessment and examination, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentWeighting {
    #[serde(rename = "ca")]
    pub continuous_assessment_weight: u32,
    #[serde(rename = "exam")]
    pub examination_weight: u32,
}

impl AssessmentWeighting {
    pub const JUNIOR: Self = Self::new(40, 60);
    pub const SENIOR: Self = Self::new(30, 70);
    /// Split applied to a single composite score during record normalization.
    pub const COMPOSITE_SPLIT: Self = Self::new(40, 60);

    pub const fn new(continuous_assessment_weight: u32, examination_weight: u32) -> Self {
        Self {
            continuous_assessment_weight,
            examination_weight,
        }
    }

    pub fn split(&self, composite: f64) -> SubjectScore {
        let ca = composite * f64::from(self.continuous_assessment_weight) / 100.0;
        let exam = composite * f64::from(self.examination_weight) / 100.0;
        SubjectScore::new(round_half_up(ca), round_half_up(exam))
    }

    pub fn ca_header(&self) -> String {
        format!("C.A {}", self.continuous_assessment_weight)
    }

    pub fn exam_header(&self) -> String {
        format!("EXAM {}", self.examination_weight)
    }
}

/// Rounds halves upward, `floor(x + 0.5)`. Non-finite input yields 0.
pub fn round_half_up(value: f64) -> f64 {
    if value.is_finite() {
        (value + 0.5).floor()
    } else {
        0.0
    }
}

/// Rounded, non-negative whole percentage.
pub fn whole_percent(value: f64) -> u32 {
    round_half_up(value).max(0.0) as u32
}
