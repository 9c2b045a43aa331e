use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    A1,
    B2,
    B3,
    C4,
    C5,
    C6,
    D7,
    E8,
    F9,
}

impl Grade {
    pub fn remark(&self) -> &'static str {
        match self {
            Grade::A1 => "Excellent",
            Grade::B2 => "Very Good",
            Grade::B3 => "Good",
            Grade::C4 | Grade::C5 | Grade::C6 => "Credit",
            Grade::D7 | Grade::E8 => "Pass",
            Grade::F9 => "Fail",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Grade::A1 => "A1",
            Grade::B2 => "B2",
            Grade::B3 => "B3",
            Grade::C4 => "C4",
            Grade::C5 => "C5",
            Grade::C6 => "C6",
            Grade::D7 => "D7",
            Grade::E8 => "E8",
            Grade::F9 => "F9",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    High,
    Medium,
    Low,
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeverityTier::High => write!(f, "high"),
            SeverityTier::Medium => write!(f, "medium"),
            SeverityTier::Low => write!(f, "low"),
        }
    }
}

/// Bands are closed below; anything under 45 (NaN included) is F9.
pub fn grade_for(percentage: f64) -> Grade {
    match percentage {
        p if p >= 80.0 => Grade::A1,
        p if p >= 75.0 => Grade::B2,
        p if p >= 70.0 => Grade::B3,
        p if p >= 65.0 => Grade::C4,
        p if p >= 60.0 => Grade::C5,
        p if p >= 55.0 => Grade::C6,
        p if p >= 50.0 => Grade::D7,
        p if p >= 45.0 => Grade::E8,
        _ => Grade::F9,
    }
}

pub fn severity_tier_for(percentage: f64) -> SeverityTier {
    match percentage {
        p if p >= 70.0 => SeverityTier::High,
        p if p >= 50.0 => SeverityTier::Medium,
        _ => SeverityTier::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_are_closed_below() {
        let cases = [
            (80.0, Grade::A1),
            (79.99, Grade::B2),
            (75.0, Grade::B2),
            (70.0, Grade::B3),
            (65.0, Grade::C4),
            (60.0, Grade::C5),
            (55.0, Grade::C6),
            (50.0, Grade::D7),
            (45.0, Grade::E8),
            (44.99, Grade::F9),
        ];
        for (percentage, expected) in cases {
            assert_eq!(grade_for(percentage), expected, "percentage {percentage}");
        }
    }

    #[test]
    fn grading_is_total_and_monotonic() {
        assert_eq!(grade_for(f64::INFINITY), Grade::A1);
        assert_eq!(grade_for(250.0), Grade::A1);
        assert_eq!(grade_for(-10.0), Grade::F9);
        assert_eq!(grade_for(f64::NEG_INFINITY), Grade::F9);
        assert_eq!(grade_for(f64::NAN), Grade::F9);

        // Grade ordering runs best to worst, so it never improves as p falls.
        let mut previous = grade_for(120.0);
        let mut p = 120.0;
        while p > -20.0 {
            let current = grade_for(p);
            assert!(current >= previous, "grade improved at {p}");
            previous = current;
            p -= 0.25;
        }
    }

    #[test]
    fn severity_is_independent_of_grade_bands() {
        assert_eq!(severity_tier_for(70.0), SeverityTier::High);
        assert_eq!(severity_tier_for(69.9), SeverityTier::Medium);
        assert_eq!(severity_tier_for(50.0), SeverityTier::Medium);
        assert_eq!(severity_tier_for(49.9), SeverityTier::Low);
        assert_eq!(SeverityTier::Medium.to_string(), "medium");
    }

    #[test]
    fn labels_and_remarks() {
        assert_eq!(Grade::A1.to_string(), "A1");
        assert_eq!(Grade::C6.remark(), "Credit");
        assert_eq!(Grade::F9.remark(), "Fail");
    }
}
