use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod capability;
mod error;
mod grading;
mod models;
mod normalize;
mod report;
mod roster;
mod stats;
mod summary;
mod workflow;

use capability::CommandCapability;
use models::{AssessmentWeighting, ClassTier, Student};
use normalize::Normalizer;
use workflow::{AssessmentComponent, Workflow, WorkflowState};

#[derive(Parser)]
#[command(name = "school-records")]
#[command(about = "Academic records: grading, class statistics and report cards", long_about = None)]
struct Cli {
    /// Roster JSON file (array of students)
    #[arg(long, env = "RECORDS_ROSTER", global = true)]
    roster: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum TierArg {
    Junior,
    Senior,
}

#[derive(Clone, Copy, ValueEnum)]
enum ComponentArg {
    Ca40,
    Exam60,
    Ca30,
    Exam70,
}

impl From<ComponentArg> for AssessmentComponent {
    fn from(value: ComponentArg) -> Self {
        match value {
            ComponentArg::Ca40 => AssessmentComponent::Ca40,
            ComponentArg::Exam60 => AssessmentComponent::Exam60,
            ComponentArg::Ca30 => AssessmentComponent::Ca30,
            ComponentArg::Exam70 => AssessmentComponent::Exam70,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show class dashboard statistics
    Dashboard {
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Compile one student's report card
    Report {
        #[arg(long)]
        student: String,
        /// Defaults to the weighting of the student's class tier
        #[arg(long, value_enum)]
        tier: Option<TierArg>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Write the compiled document as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
    /// Generate mid-term reports for a whole class
    Generate {
        #[arg(long)]
        class: String,
        #[arg(long, default_value = "2025/2026")]
        session: String,
        #[arg(long, default_value = "First Term")]
        term: String,
        #[arg(long = "component", value_enum)]
        components: Vec<ComponentArg>,
        #[arg(long, default_value = "reports")]
        out_dir: PathBuf,
    },
    /// Build a student record from free text
    #[command(group(
        ArgGroup::new("input")
            .args(["text", "file"])
            .required(true)
            .multiple(false)
    ))]
    Normalize {
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, env = "RECORDS_EXTRACTOR_CMD")]
        extractor_cmd: String,
        #[arg(long, env = "RECORDS_CAPABILITY_TIMEOUT_SECS", default_value_t = 30)]
        timeout_secs: u64,
        /// Append the new record to the roster
        #[arg(long)]
        save: bool,
    },
    /// Request a narrative performance summary for a student
    Summarize {
        #[arg(long)]
        student: String,
        #[arg(long, env = "RECORDS_SUMMARIZER_CMD")]
        summarizer_cmd: String,
        /// Store the summary on the student's roster entry
        #[arg(long)]
        save: bool,
    },
    /// Apply bulk marks from a CSV file (student_id,subject,ca,exam)
    ImportMarks {
        #[arg(long)]
        csv: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let roster_path = cli.roster;

    match cli.command {
        Commands::Dashboard { class, json } => {
            let students = load_roster(roster_path.as_deref())?;
            let students: Vec<Student> = match class.as_deref() {
                Some(class) => roster::in_class(&students, class).into_iter().cloned().collect(),
                None => students,
            };
            let dashboard = stats::class_dashboard(&students);
            let subjects = stats::subject_statistics(&students);

            if json {
                let body = serde_json::json!({ "dashboard": dashboard, "subjects": subjects });
                println!("{}", serde_json::to_string_pretty(&body)?);
                return Ok(());
            }

            println!("Total students: {}", dashboard.total_students);
            println!("Class average: {}%", dashboard.class_average_percentage);
            println!(
                "Top performer: {} ({}%)",
                dashboard.top_performer.name, dashboard.top_performer.average
            );
            println!(
                "Top subject: {} ({}%)",
                dashboard.top_subject.name, dashboard.top_subject.average
            );
            if !subjects.is_empty() {
                println!("Subjects:");
                for subject in subjects.iter() {
                    let average = subject.average;
                    println!(
                        "- {}: high {} low {} mean {:.1} ({}, {} entries)",
                        subject.subject,
                        subject.highest,
                        subject.lowest,
                        average,
                        grading::grade_for(average),
                        subject.entries
                    );
                }
            }
        }
        Commands::Report {
            student,
            tier,
            out,
            json,
        } => {
            let students = load_roster(roster_path.as_deref())?;
            let found = find_student(&students, &student)?;
            let weighting = match tier {
                Some(TierArg::Junior) => AssessmentWeighting::JUNIOR,
                Some(TierArg::Senior) => AssessmentWeighting::SENIOR,
                None => ClassTier::for_class(&found.class_name).weighting(),
            };
            let document = report::compile(found, weighting);
            let body = if json {
                serde_json::to_string_pretty(&document)?
            } else {
                report::render_markdown(&document)
            };
            std::fs::write(&out, body)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("{}", document.overall_line());
            println!("Report written to {}.", out.display());
        }
        Commands::Generate {
            class,
            session,
            term,
            components,
            out_dir,
        } => {
            let students = load_roster(roster_path.as_deref())?;
            let mut workflow = Workflow::default();
            workflow.set_session(&session);
            workflow.set_term(&term);
            workflow.select_class(&class);
            for component in components {
                workflow.toggle_component(component.into(), true)?;
            }

            let handle = match workflow.start(&students) {
                Ok(handle) => handle,
                Err(err) => {
                    if workflow.state() == WorkflowState::ValidationWarning {
                        let offered: Vec<String> =
                            AssessmentComponent::for_tier(ClassTier::for_class(&class))
                                .iter()
                                .map(ToString::to_string)
                                .collect();
                        eprintln!("Offered for {class}: {}", offered.join(", "));
                        workflow.dismiss_warning();
                    }
                    if err.is_recoverable() {
                        eprintln!("Adjust the selection and run again.");
                    }
                    return Err(err.into());
                }
            };
            let mut progress = handle.progress();
            let printer = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let fraction = *progress.borrow_and_update();
                    eprintln!("Generating... {:.0}%", fraction * 100.0);
                }
            });
            let mut done = handle.progress();
            tokio::select! {
                _ = done.wait_for(|fraction| *fraction >= 1.0) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("interrupted, cancelling report generation");
                    handle.cancel();
                }
            }
            let outcome = workflow.finish(handle).await?;
            let _ = printer.await;
            tracing::debug!(state = ?workflow.state(), runs = workflow.history().len(), "workflow settled");

            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("failed to create {}", out_dir.display()))?;
            for document in outcome.documents.iter() {
                let path = out_dir.join(format!(
                    "report-card-{}-{}.md",
                    document.student().id,
                    document.student().name.split_whitespace().collect::<Vec<_>>().join("_")
                ));
                std::fs::write(&path, report::render_markdown(document))
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }

            let record = &outcome.record;
            println!(
                "Run {} for {} ({}, {}) with C.A {} / EXAM {}:",
                record.run_id,
                record.class_name,
                record.term,
                record.session,
                record.weighting.continuous_assessment_weight,
                record.weighting.examination_weight
            );
            for summary in record.reports.iter() {
                println!(
                    "- {} ({}) {}% grade {}",
                    summary.student_name,
                    summary.student_id,
                    summary.overall_percentage,
                    summary.overall_grade
                );
            }
            println!("Reports written to {}.", out_dir.display());
        }
        Commands::Normalize {
            text,
            file,
            extractor_cmd,
            timeout_secs,
            save,
        } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(file)) => std::fs::read_to_string(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?,
                (None, None) => anyhow::bail!("either --text or --file is required"),
            };
            let extractor = CommandCapability::from_command_line(&extractor_cmd)?;
            let normalizer = Normalizer::default().with_timeout(Duration::from_secs(timeout_secs));
            let student = normalizer.normalize(&text, &extractor).await?;
            println!("{}", serde_json::to_string_pretty(&student)?);

            if save {
                let path = require_roster(roster_path.as_deref())?;
                let mut students = if path.exists() {
                    roster::load(path)?
                } else {
                    Vec::new()
                };
                if students.iter().any(|existing| existing.id == student.id) {
                    anyhow::bail!("admission number {} is already on the roster", student.id);
                }
                students.push(student);
                roster::save(path, &students)?;
                println!("Roster updated at {}.", path.display());
            }
        }
        Commands::Summarize {
            student,
            summarizer_cmd,
            save,
        } => {
            let mut students = load_roster(roster_path.as_deref())?;
            let summarizer = CommandCapability::from_command_line(&summarizer_cmd)?;
            let text = summary::summarize(find_student(&students, &student)?, &summarizer).await?;
            println!("{text}");

            if save {
                let path = require_roster(roster_path.as_deref())?;
                if let Some(entry) = students.iter_mut().find(|entry| entry.id == student) {
                    entry.performance_summary = Some(text);
                }
                roster::save(path, &students)?;
                println!("Roster updated at {}.", path.display());
            }
        }
        Commands::ImportMarks { csv } => {
            let path = require_roster(roster_path.as_deref())?;
            let mut students = roster::load(path)?;
            let applied = roster::import_marks(&mut students, &csv)?;

            let mut classes: Vec<String> = students.iter().map(|s| s.class_name.clone()).collect();
            classes.sort();
            classes.dedup();
            for class in classes {
                let mut members: Vec<Student> = roster::in_class(&students, &class)
                    .into_iter()
                    .cloned()
                    .collect();
                stats::apply_class_statistics(&mut members);
                stats::assign_positions(&mut members);
                for member in members {
                    if let Some(entry) = students.iter_mut().find(|entry| entry.id == member.id) {
                        *entry = member;
                    }
                }
            }
            roster::save(path, &students)?;
            println!("Applied {applied} marks from {}.", csv.display());
        }
    }

    Ok(())
}

fn require_roster(path: Option<&Path>) -> anyhow::Result<&Path> {
    path.context("--roster or RECORDS_ROSTER must point at a roster JSON file")
}

fn load_roster(path: Option<&Path>) -> anyhow::Result<Vec<Student>> {
    let path = require_roster(path)?;
    roster::load(path).with_context(|| format!("failed to load roster {}", path.display()))
}

fn find_student<'a>(students: &'a [Student], id: &str) -> anyhow::Result<&'a Student> {
    students
        .iter()
        .find(|student| student.id == id)
        .with_context(|| format!("no student with admission number {id}"))
}
