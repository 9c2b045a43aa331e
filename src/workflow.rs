//! Report generation runs.
//!
//! A [`Workflow`] holds one operator's selection (session, class, term and
//! assessment components) and walks `Idle -> Generating -> Complete`, with a
//! `ValidationWarning` detour when generation is requested without any
//! component. Generation itself is a spawned task observed through a
//! [`GenerationHandle`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{RecordsError, Result};
use crate::grading::Grade;
use crate::models::{AssessmentWeighting, ClassTier, Student};
use crate::report::{compile, ReportDocument};
use crate::roster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AssessmentComponent {
    Ca40,
    Exam60,
    Ca30,
    Exam70,
}

impl AssessmentComponent {
    pub fn tier(&self) -> ClassTier {
        match self {
            AssessmentComponent::Ca40 | AssessmentComponent::Exam60 => ClassTier::Junior,
            AssessmentComponent::Ca30 | AssessmentComponent::Exam70 => ClassTier::Senior,
        }
    }

    pub fn percentage(&self) -> u32 {
        match self {
            AssessmentComponent::Ca40 => 40,
            AssessmentComponent::Exam60 => 60,
            AssessmentComponent::Ca30 => 30,
            AssessmentComponent::Exam70 => 70,
        }
    }

    pub fn for_tier(tier: ClassTier) -> [AssessmentComponent; 2] {
        match tier {
            ClassTier::Junior => [AssessmentComponent::Ca40, AssessmentComponent::Exam60],
            ClassTier::Senior => [AssessmentComponent::Ca30, AssessmentComponent::Exam70],
        }
    }
}

impl fmt::Display for AssessmentComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentComponent::Ca40 | AssessmentComponent::Ca30 => {
                write!(f, "C.A {}", self.percentage())
            }
            AssessmentComponent::Exam60 | AssessmentComponent::Exam70 => {
                write!(f, "EXAM {}", self.percentage())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkflowState {
    Idle,
    ValidationWarning,
    Generating,
    Complete,
}

/// Fully formed parameters for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub session: String,
    pub class_name: String,
    pub term: String,
    pub components: BTreeSet<AssessmentComponent>,
    pub weighting: AssessmentWeighting,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub student_id: String,
    pub student_name: String,
    pub overall_percentage: u32,
    pub overall_grade: Grade,
}

/// History entry for a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub run_id: Uuid,
    pub session: String,
    pub class_name: String,
    pub term: String,
    pub weighting: AssessmentWeighting,
    pub generated_at: DateTime<Utc>,
    pub reports: Vec<ReportSummary>,
}

#[derive(Debug)]
pub struct GenerationOutcome {
    pub record: RunRecord,
    pub documents: Vec<ReportDocument>,
}

/// Running generation. Progress is a fraction in `[0, 1]` that never goes
/// down. Dropping the handle cancels the run.
#[derive(Debug)]
pub struct GenerationHandle {
    progress: watch::Receiver<f64>,
    task: Option<JoinHandle<GenerationOutcome>>,
    lease: Arc<()>,
}

impl GenerationHandle {
    pub fn progress(&self) -> watch::Receiver<f64> {
        self.progress.clone()
    }

    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub async fn wait(mut self) -> Result<GenerationOutcome> {
        let task = self.task.take().ok_or(RecordsError::Cancelled)?;
        match task.await {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_cancelled() => Err(RecordsError::Cancelled),
            Err(err) => Err(RecordsError::ExternalCapability {
                message: "report generation failed",
                cause: err.to_string(),
            }),
        }
    }
}

impl Drop for GenerationHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn advance(progress: &watch::Sender<f64>, fraction: f64) {
    progress.send_if_modified(|current| {
        if fraction > *current {
            *current = fraction;
            true
        } else {
            false
        }
    });
}

pub fn spawn_generation(request: ReportRequest, students: Vec<Student>) -> GenerationHandle {
    let (sender, receiver) = watch::channel(0.0_f64);
    let task = tokio::spawn(async move {
        let total = students.len();
        let mut documents = Vec::with_capacity(total);

        for (done, student) in students.iter().enumerate() {
            documents.push(compile(student, request.weighting));
            advance(&sender, (done + 1) as f64 / total as f64);
            tokio::task::yield_now().await;
        }
        advance(&sender, 1.0);

        let reports = documents
            .iter()
            .map(|document| ReportSummary {
                student_id: document.student().id.clone(),
                student_name: document.student().name.clone(),
                overall_percentage: document.overall_percentage(),
                overall_grade: document.overall_grade(),
            })
            .collect();

        GenerationOutcome {
            record: RunRecord {
                run_id: Uuid::new_v4(),
                session: request.session,
                class_name: request.class_name,
                term: request.term,
                weighting: request.weighting,
                generated_at: Utc::now(),
                reports,
            },
            documents,
        }
    });

    GenerationHandle {
        progress: receiver,
        task: Some(task),
        lease: Arc::new(()),
    }
}

#[derive(Debug, Clone)]
pub struct Workflow {
    state: WorkflowState,
    session: String,
    class_name: Option<String>,
    term: String,
    components: BTreeSet<AssessmentComponent>,
    history: Vec<RunRecord>,
    running: Weak<()>,
}

impl Default for Workflow {
    fn default() -> Self {
        Self {
            state: WorkflowState::Idle,
            session: "2025/2026".to_string(),
            class_name: None,
            term: "First Term".to_string(),
            components: BTreeSet::new(),
            history: Vec::new(),
            running: Weak::new(),
        }
    }
}

impl Workflow {
    /// A run whose handle was dropped without `finish` reads as `Idle`.
    pub fn state(&self) -> WorkflowState {
        if self.state == WorkflowState::Generating && self.running.strong_count() == 0 {
            return WorkflowState::Idle;
        }
        self.state
    }

    pub fn components(&self) -> &BTreeSet<AssessmentComponent> {
        &self.components
    }

    /// Finished runs, most recent first.
    pub fn history(&self) -> &[RunRecord] {
        &self.history
    }

    pub fn tier(&self) -> Option<ClassTier> {
        self.class_name.as_deref().map(ClassTier::for_class)
    }

    pub fn set_session(&mut self, session: &str) {
        self.session = session.trim().to_string();
        self.touch();
    }

    pub fn set_term(&mut self, term: &str) {
        self.term = term.trim().to_string();
        self.touch();
    }

    /// Changing tier clears the component selection; the tiers share none.
    pub fn select_class(&mut self, class_name: &str) {
        let previous = self.tier();
        let class_name = class_name.trim();
        self.class_name = (!class_name.is_empty()).then(|| class_name.to_uppercase());
        if self.tier() != previous {
            self.components.clear();
        }
        self.touch();
    }

    pub fn toggle_component(&mut self, component: AssessmentComponent, selected: bool) -> Result<()> {
        let tier = self
            .tier()
            .ok_or_else(|| RecordsError::validation("Select a class before choosing assessments."))?;
        if component.tier() != tier {
            return Err(RecordsError::validation(format!(
                "{component} is not offered for {tier} classes"
            )));
        }
        if selected {
            self.components.insert(component);
        } else {
            self.components.remove(&component);
        }
        self.touch();
        Ok(())
    }

    pub fn dismiss_warning(&mut self) {
        if self.state == WorkflowState::ValidationWarning {
            self.state = WorkflowState::Idle;
        }
    }

    /// Checks the selection and freezes it into a request.
    pub fn request(&mut self) -> Result<ReportRequest> {
        let class_name = self
            .class_name
            .clone()
            .ok_or_else(|| RecordsError::validation("Please select a class."))?;
        if self.components.is_empty() {
            self.state = WorkflowState::ValidationWarning;
            return Err(RecordsError::validation(
                "Please select at least one assessment component to include.",
            ));
        }

        Ok(ReportRequest {
            session: self.session.clone(),
            weighting: ClassTier::for_class(&class_name).weighting(),
            class_name,
            term: self.term.clone(),
            components: self.components.clone(),
        })
    }

    pub fn start(&mut self, roster_students: &[Student]) -> Result<GenerationHandle> {
        let request = self.request()?;
        let students: Vec<Student> = roster::in_class(roster_students, &request.class_name)
            .into_iter()
            .cloned()
            .collect();
        if students.is_empty() {
            return Err(RecordsError::validation(format!(
                "No students are enrolled in {}.",
                request.class_name
            )));
        }

        info!(
            class = %request.class_name,
            students = students.len(),
            ca = request.weighting.continuous_assessment_weight,
            exam = request.weighting.examination_weight,
            "report generation started"
        );
        let handle = spawn_generation(request, students);
        self.running = Arc::downgrade(&handle.lease);
        self.state = WorkflowState::Generating;
        Ok(handle)
    }

    /// Waits for the run, records it and hands the documents to the caller.
    pub async fn finish(&mut self, handle: GenerationHandle) -> Result<GenerationOutcome> {
        match handle.wait().await {
            Ok(outcome) => {
                info!(
                    run_id = %outcome.record.run_id,
                    reports = outcome.documents.len(),
                    "report generation complete"
                );
                self.history.insert(0, outcome.record.clone());
                self.components.clear();
                self.state = WorkflowState::Complete;
                Ok(outcome)
            }
            Err(err) => {
                warn!(error = %err, "report generation did not complete");
                self.state = WorkflowState::Idle;
                Err(err)
            }
        }
    }

    fn touch(&mut self) {
        self.state = self.state();
        if matches!(self.state, WorkflowState::ValidationWarning | WorkflowState::Complete) {
            self.state = WorkflowState::Idle;
        }
    }
}
