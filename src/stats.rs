use std::collections::HashMap;

use serde::Serialize;

use crate::models::{round_half_up, whole_percent, AttendanceRecord, Student, SubjectResult};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leader {
    pub name: String,
    pub average: u32,
}

impl Leader {
    fn not_available() -> Self {
        Self {
            name: NOT_AVAILABLE.to_string(),
            average: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDashboard {
    pub total_students: usize,
    pub class_average_percentage: u32,
    pub top_performer: Leader,
    pub top_subject: Leader,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStatistics {
    pub subject: String,
    pub entries: usize,
    pub highest: f64,
    pub lowest: f64,
    pub average: f64,
}

/// Mean subject total, rounded. An empty sequence averages to 0.
pub fn average_score(results: &[SubjectResult]) -> u32 {
    if results.is_empty() {
        return 0;
    }
    let total: f64 = results.iter().map(SubjectResult::total).sum();
    whole_percent(total / results.len() as f64)
}

pub fn attendance_rate(attendance: &AttendanceRecord) -> u32 {
    if attendance.days_recorded == 0 {
        return 0;
    }
    whole_percent(f64::from(attendance.present) / f64::from(attendance.days_recorded) * 100.0)
}

pub fn class_dashboard(students: &[Student]) -> ClassDashboard {
    if students.is_empty() {
        return ClassDashboard {
            total_students: 0,
            class_average_percentage: 0,
            top_performer: Leader::not_available(),
            top_subject: Leader::not_available(),
        };
    }

    let mut total_score = 0.0;
    let mut result_count = 0usize;
    let mut top_performer: Option<Leader> = None;

    for student in students {
        let average = average_score(&student.results);
        // Strict comparison keeps the first student on ties.
        if top_performer.as_ref().map_or(true, |leader| average > leader.average) {
            top_performer = Some(Leader {
                name: student.name.clone(),
                average,
            });
        }

        for result in &student.results {
            total_score += result.total();
            result_count += 1;
        }
    }

    let class_average_percentage = if result_count > 0 {
        whole_percent(total_score / result_count as f64)
    } else {
        0
    };

    let mut top_subject: Option<Leader> = None;
    for stats in subject_statistics(students) {
        let average = whole_percent(stats.average);
        if top_subject.as_ref().map_or(true, |leader| average > leader.average) {
            top_subject = Some(Leader {
                name: stats.subject,
                average,
            });
        }
    }

    ClassDashboard {
        total_students: students.len(),
        class_average_percentage,
        top_performer: top_performer.unwrap_or_else(Leader::not_available),
        top_subject: top_subject.unwrap_or_else(Leader::not_available),
    }
}

/// Per-subject high, low and mean totals, in the order subjects are first seen.
pub fn subject_statistics(students: &[Student]) -> Vec<SubjectStatistics> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut accumulated: Vec<(String, usize, f64, f64, f64)> = Vec::new();

    for result in students.iter().flat_map(|student| student.results.iter()) {
        let total = result.total();
        match index.get(result.subject.as_str()) {
            Some(&slot) => {
                let entry = &mut accumulated[slot];
                entry.1 += 1;
                entry.2 += total;
                entry.3 = entry.3.max(total);
                entry.4 = entry.4.min(total);
            }
            None => {
                index.insert(result.subject.as_str(), accumulated.len());
                accumulated.push((result.subject.clone(), 1, total, total, total));
            }
        }
    }

    accumulated
        .into_iter()
        .map(|(subject, entries, sum, highest, lowest)| SubjectStatistics {
            subject,
            entries,
            highest,
            lowest,
            average: sum / entries as f64,
        })
        .collect()
}

/// Writes the class high/low/mean for every subject back into each result.
pub fn apply_class_statistics(students: &mut [Student]) {
    let statistics: HashMap<String, SubjectStatistics> = subject_statistics(students)
        .into_iter()
        .map(|stats| (stats.subject.clone(), stats))
        .collect();

    for result in students.iter_mut().flat_map(|student| student.results.iter_mut()) {
        if let Some(stats) = statistics.get(&result.subject) {
            result.highest_in_class = stats.highest;
            result.lowest_in_class = stats.lowest;
            result.class_average = round_half_up(stats.average * 10.0) / 10.0;
        }
    }
}

/// Competition ranking by average score: equal averages share a rank and the
/// following rank is skipped. Roster order is left untouched.
pub fn assign_positions(students: &mut [Student]) {
    let total_students = students.len() as u32;
    let averages: Vec<u32> = students
        .iter()
        .map(|student| average_score(&student.results))
        .collect();

    for (student, average) in students.iter_mut().zip(averages.iter()) {
        let better = averages.iter().filter(|other| *other > average).count() as u32;
        student.position.rank = better + 1;
        student.position.total_students = total_students;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::student;

    #[test]
    fn average_of_empty_results_is_zero() {
        assert_eq!(average_score(&[]), 0);
    }

    #[test]
    fn average_ignores_order() {
        let forward = student("1", "Ada", &[("MATH", 30.0, 41.0), ("ENGLISH", 20.0, 40.0), ("ART", 38.0, 60.0)]);
        let mut reversed = forward.results.clone();
        reversed.reverse();
        assert_eq!(average_score(&forward.results), 76);
        assert_eq!(average_score(&reversed), 76);
    }

    #[test]
    fn attendance_without_days_is_zero() {
        let attendance = AttendanceRecord::default();
        assert_eq!(attendance_rate(&attendance), 0);

        let attendance = AttendanceRecord {
            days_recorded: 60,
            present: 55,
            absent: 3,
            leave: 2,
        };
        assert_eq!(attendance_rate(&attendance), 92);
    }

    #[test]
    fn empty_dashboard_is_sentinel() {
        let dashboard = class_dashboard(&[]);
        assert_eq!(dashboard.total_students, 0);
        assert_eq!(dashboard.class_average_percentage, 0);
        assert_eq!(dashboard.top_performer.name, NOT_AVAILABLE);
        assert_eq!(dashboard.top_performer.average, 0);
        assert_eq!(dashboard.top_subject.name, NOT_AVAILABLE);
        assert_eq!(dashboard.top_subject.average, 0);
    }

    #[test]
    fn class_average_weights_every_result_equally() {
        let students = vec![
            student("1", "Ada", &[("MATH", 40.0, 60.0)]),
            student("2", "Bayo", &[("MATH", 20.0, 30.0), ("ENGLISH", 20.0, 30.0), ("ART", 20.0, 30.0)]),
        ];
        // (100 + 50 * 3) / 4 = 62.5, not the mean of 100 and 50.
        let dashboard = class_dashboard(&students);
        assert_eq!(dashboard.total_students, 2);
        assert_eq!(dashboard.class_average_percentage, 63);
        assert_eq!(dashboard.top_performer.name, "Ada");
        assert_eq!(dashboard.top_performer.average, 100);
        assert_eq!(dashboard.top_subject.name, "MATH");
        assert_eq!(dashboard.top_subject.average, 75);
    }

    #[test]
    fn ties_keep_the_first_listed() {
        let students = vec![
            student("1", "Ada", &[("ENGLISH", 30.0, 40.0), ("MATH", 30.0, 40.0)]),
            student("2", "Bayo", &[("ENGLISH", 35.0, 35.0), ("MATH", 30.0, 40.0)]),
        ];
        let dashboard = class_dashboard(&students);
        assert_eq!(dashboard.top_performer.name, "Ada");
        assert_eq!(dashboard.top_subject.name, "ENGLISH");
    }

    #[test]
    fn students_without_results_still_have_a_leader() {
        let students = vec![student("1", "Ada", &[]), student("2", "Bayo", &[])];
        let dashboard = class_dashboard(&students);
        assert_eq!(dashboard.top_performer.name, "Ada");
        assert_eq!(dashboard.class_average_percentage, 0);
        assert_eq!(dashboard.top_subject.name, NOT_AVAILABLE);
    }

    #[test]
    fn subject_statistics_follow_first_seen_order() {
        let mut students = vec![
            student("1", "Ada", &[("MATH", 30.0, 60.0), ("ART", 10.0, 40.0)]),
            student("2", "Bayo", &[("ART", 35.0, 50.0), ("MATH", 20.0, 25.0)]),
            student("3", "Chidi", &[("MATH", 25.0, 41.0)]),
        ];
        let stats = subject_statistics(&students);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].subject, "MATH");
        assert_eq!(stats[0].entries, 3);
        assert_eq!(stats[0].highest, 90.0);
        assert_eq!(stats[0].lowest, 45.0);
        assert_eq!(stats[0].average, 67.0);

        apply_class_statistics(&mut students);
        let art = students[1].result_for("ART").unwrap();
        assert_eq!(art.highest_in_class, 85.0);
        assert_eq!(art.lowest_in_class, 50.0);
        assert_eq!(art.class_average, 67.5);
    }

    #[test]
    fn positions_share_ranks_on_ties() {
        let mut students = vec![
            student("1", "Ada", &[("MATH", 30.0, 40.0)]),
            student("2", "Bayo", &[("MATH", 40.0, 50.0)]),
            student("3", "Chidi", &[("MATH", 30.0, 40.0)]),
            student("4", "Dayo", &[("MATH", 10.0, 20.0)]),
        ];
        assign_positions(&mut students);
        let ranks: Vec<u32> = students.iter().map(|s| s.position.rank).collect();
        assert_eq!(ranks, vec![2, 1, 2, 4]);
        assert!(students.iter().all(|s| s.position.total_students == 4));
        assert_eq!(students[0].name, "Ada");
    }
}
