//! Skillpath CLI - skill graphs and adaptive learning pathways.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use skillpath_analytics::{BroadcastHub, RealTimeAnalytics};
use skillpath_core::{
    AnalyticsEvent, ContentKind, Course, CourseId, Difficulty, LearnerProfile, LearningContent,
    LearningStyle, Pathway, PrerequisiteEdge, ProgressData, Skill, SkillId, SkillpathConfig, StudentId,
};
use skillpath_graph::SkillGraph;
use skillpath_pathway::{PathwayRequest, PathwayService};
use skillpath_storage::{ContentCatalog, JsonStorage, Storage};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skillpath")]
#[command(about = "Skill graphs and adaptive learning pathways", long_about = None)]
struct Cli {
    /// Data directory
    #[arg(long, default_value = ".skillpath")]
    data: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add or update a skill
    AddSkill {
        /// Skill ID
        id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Difficulty level
        #[arg(long, default_value = "0")]
        level: u32,
        /// Category
        #[arg(long, default_value = "general")]
        category: String,
        /// Also list the skill in this course
        #[arg(long)]
        course: Option<String>,
    },
    /// Declare that a skill requires another
    AddPrereq {
        /// Dependent skill
        skill: String,
        /// Required skill
        prerequisite: String,
    },
    /// Enroll a student in a course
    Enroll {
        /// Student ID
        student: String,
        /// Course ID
        course: String,
        /// Preferred learning style
        #[arg(long)]
        style: Option<String>,
        /// Preferred difficulty
        #[arg(long)]
        difficulty: Option<String>,
    },
    /// Attach learning content to a skill
    AddContent {
        /// Skill ID
        skill: String,
        /// Content kind (video, audio, text, exercise)
        #[arg(long)]
        kind: String,
        /// Title
        #[arg(long)]
        title: String,
        /// URL for video/audio, body reference for text, instructions for exercises
        #[arg(long, default_value = "")]
        source: String,
        /// Duration for video/audio
        #[arg(long, default_value = "0")]
        minutes: u32,
    },
    /// Show the learning pathway of a student
    Pathway {
        /// Student ID
        student: String,
        /// Course ID
        course: String,
        /// Target skills
        #[arg(long, value_delimiter = ',', required = true)]
        target: Vec<String>,
        /// Skills already held
        #[arg(long, value_delimiter = ',')]
        current: Vec<String>,
        /// Learning style
        #[arg(long, default_value = "reading")]
        style: String,
        /// Difficulty
        #[arg(long, default_value = "intermediate")]
        difficulty: String,
    },
    /// Recommend the next skill
    Next {
        /// Student ID
        student: String,
        /// Course ID
        course: String,
        /// Completed skills
        #[arg(long, value_delimiter = ',')]
        completed: Vec<String>,
    },
    /// Record learning progress
    Progress {
        /// Student ID
        student: String,
        /// Course ID
        course: String,
        /// Skill ID
        skill: String,
        /// Score in [0, 1]
        #[arg(long)]
        score: f64,
        /// Minutes spent
        #[arg(long, default_value = "0")]
        minutes: f64,
        /// Content kind used
        #[arg(long)]
        kind: Option<String>,
        /// Checkpoint completed
        #[arg(long)]
        completed: bool,
    },
    /// Show progress analytics
    Analytics {
        /// Student ID
        student: String,
        /// Course ID
        course: String,
        /// Skill for the learning rate
        #[arg(long)]
        skill: Option<String>,
    },
    /// Show pathway effectiveness for a course
    Effectiveness {
        /// Course ID
        course: String,
        /// Window in days
        #[arg(long, default_value = "30")]
        days: i64,
    },
    /// Show learning patterns
    Patterns {
        /// Student ID
        student: String,
        /// Course ID
        course: String,
    },
    /// Show insights
    Insights {
        /// Student ID
        student: String,
        /// Course ID
        course: String,
    },
    /// Stream periodic analytics for a course
    Watch {
        /// Course ID
        course: String,
        /// Seconds between rounds (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many rounds
        #[arg(long)]
        rounds: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SkillpathConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SkillpathConfig::default(),
    };

    // Open storage
    let storage = Arc::new(JsonStorage::new(&cli.data).await?);
    let graph = Arc::new(SkillGraph::from_storage(storage.as_ref()).await?);

    match cli.command {
        Commands::AddSkill { id, name, level, category, course } => {
            let skill = Skill::new(id, name, level, category);
            graph.add_skill(skill.clone())?;
            storage.save_skill(&skill).await?;

            if let Some(course_id) = course {
                let course_id = CourseId::from(course_id);
                let mut course = load_or_new_course(storage.as_ref(), &course_id).await?;
                course.add_skill(skill.id.clone());
                storage.save_course(&course).await?;
            }
            println!("Saved skill: {} (level {})", skill.id, skill.level);
        }
        Commands::AddPrereq { skill, prerequisite } => {
            let (skill, prerequisite) = (SkillId::from(skill), SkillId::from(prerequisite));
            graph.add_prerequisite(&skill, &prerequisite)?;
            storage
                .save_prerequisite(&PrerequisiteEdge::new(skill.clone(), prerequisite.clone()))
                .await?;
            println!("{} now requires {}", skill, prerequisite);
        }
        Commands::Enroll { student, course, style, difficulty } => {
            let (student, course_id) = (StudentId::from(student), CourseId::from(course));
            let mut course = load_or_new_course(storage.as_ref(), &course_id).await?;
            course.enroll(student.clone());
            storage.save_course(&course).await?;

            if style.is_some() || difficulty.is_some() {
                let existing = storage.load_profile(&student).await?;
                let learning_style = match style {
                    Some(s) => s.parse::<LearningStyle>()?,
                    None => existing.as_ref().map_or(LearningStyle::Reading, |p| p.learning_style),
                };
                let difficulty = match difficulty {
                    Some(d) => d.parse::<Difficulty>()?,
                    None => existing.as_ref().map_or(Difficulty::Intermediate, |p| p.difficulty),
                };
                storage
                    .save_profile(&LearnerProfile::new(student.clone(), learning_style, difficulty))
                    .await?;
            }
            println!("Enrolled {} in {}", student, course_id);
        }
        Commands::AddContent { skill, kind, title, source, minutes } => {
            let skill = SkillId::from(skill);
            if !graph.contains(&skill) {
                bail!("unknown skill: {}", skill);
            }
            let content = match kind.parse::<ContentKind>()? {
                ContentKind::Video => LearningContent::Video { title, url: source, duration_minutes: minutes },
                ContentKind::Audio => LearningContent::Audio { title, url: source, duration_minutes: minutes },
                ContentKind::Text => LearningContent::Text { title, body_ref: source },
                ContentKind::Exercise => LearningContent::Exercise { title, instructions: source },
            };
            storage.add_content(&skill, content).await?;
            println!("Added {} content to {}", kind, skill);
        }
        Commands::Pathway { student, course, target, current, style, difficulty } => {
            let service = PathwayService::new(graph.clone(), storage.clone(), storage.clone(), &config.pathway);
            let request = PathwayRequest::new(student, course, to_ids(target), style, difficulty)
                .with_current_skills(to_ids(current));
            let pathway = service.pathway_for(&request).await?;
            print_pathway(&pathway);
        }
        Commands::Next { student, course, completed } => {
            let service = PathwayService::new(graph.clone(), storage.clone(), storage.clone(), &config.pathway);
            let next = service
                .generator()
                .get_next_recommended_step(&StudentId::from(student), &CourseId::from(course), &to_ids(completed))
                .await?;
            match next {
                Some(step) => println!(
                    "Next: {} - {} (level {}, ~{} min)",
                    step.skill.id, step.skill.name, step.skill.level, step.estimated_minutes
                ),
                None => println!("Nothing left to learn"),
            }
        }
        Commands::Progress { student, course, skill, score, minutes, kind, completed } => {
            let (analytics, _) = analytics(&config, &graph, &storage);
            let progress = ProgressData {
                score,
                time_spent_minutes: minutes,
                content_kind: kind.map(|k| k.parse::<ContentKind>()).transpose()?,
                completed,
            };
            let record = analytics
                .track_student_progress(
                    &StudentId::from(student),
                    &CourseId::from(course),
                    &SkillId::from(skill),
                    progress,
                )
                .await?;
            println!("{} mastery: {:.2} (version {})", record.skill, record.level, record.version);
        }
        Commands::Analytics { student, course, skill } => {
            let (analytics, _) = analytics(&config, &graph, &storage);
            let skill = skill.map(SkillId::from);
            let snapshot = analytics
                .calculate_progress_analytics(&StudentId::from(student), &CourseId::from(course), skill.as_ref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Effectiveness { course, days } => {
            let (analytics, _) = analytics(&config, &graph, &storage);
            let report = analytics
                .analyze_pathway_effectiveness(&CourseId::from(course), chrono::Duration::days(days))
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Patterns { student, course } => {
            let (analytics, _) = analytics(&config, &graph, &storage);
            let report = analytics
                .detect_learning_patterns(&StudentId::from(student), &CourseId::from(course))
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Insights { student, course } => {
            let (analytics, _) = analytics(&config, &graph, &storage);
            let insights = analytics
                .generate_insights(&StudentId::from(student), &CourseId::from(course))
                .await?;
            if insights.is_empty() {
                println!("No insights");
            }
            for insight in insights {
                println!("[{:?}] {}", insight.kind, insight.message);
            }
        }
        Commands::Watch { course, interval, rounds } => {
            let (analytics, hub) = analytics(&config, &graph, &storage);
            let course = CourseId::from(course);
            let students = storage
                .load_course(&course)
                .await?
                .map(|c| c.students.len())
                .unwrap_or(0);
            if students == 0 {
                bail!("course {} has no enrolled students", course);
            }

            let period = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.analytics.broadcast_interval());
            let mut events = hub.subscribe();
            let handle = analytics.start_analytics_broadcast(course.clone(), period);
            let limit = rounds.map(|r| r * students);
            let mut seen = 0usize;
            let shutdown = tokio::signal::ctrl_c();
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        info!("interrupted");
                        break;
                    }
                    event = events.recv() => match event {
                        Ok(event @ AnalyticsEvent::Snapshot(_)) => {
                            println!("{}", serde_json::to_string(&event)?);
                            seen += 1;
                            if limit.is_some_and(|l| seen >= l) {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(count)) => warn!(count, "watcher lagged behind"),
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            handle.cancel().await;
        }
    }

    Ok(())
}

fn to_ids(raw: Vec<String>) -> Vec<SkillId> {
    raw.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(SkillId::from)
        .collect()
}

async fn load_or_new_course(storage: &dyn Storage, id: &CourseId) -> Result<Course> {
    Ok(storage
        .load_course(id)
        .await?
        .unwrap_or_else(|| Course::new(id.clone(), id.as_str())))
}

/// Analytics wired to a fresh hub. Progress events only reach subscribers
/// of this process.
fn analytics(
    config: &SkillpathConfig,
    graph: &Arc<SkillGraph>,
    storage: &Arc<JsonStorage>,
) -> (Arc<RealTimeAnalytics>, Arc<BroadcastHub>) {
    let hub = Arc::new(BroadcastHub::new(config.analytics.channel_capacity));
    let service = PathwayService::new(graph.clone(), storage.clone(), storage.clone(), &config.pathway);
    let analytics = RealTimeAnalytics::new(
        storage.clone(),
        graph.clone(),
        service.cache().clone(),
        hub.clone(),
        config.analytics.clone(),
    );
    (Arc::new(analytics), hub)
}

fn print_pathway(pathway: &Pathway) {
    println!(
        "Pathway {} for {} in {} ({}, {}, ~{} min)",
        pathway.id,
        pathway.student_id,
        pathway.course_id,
        pathway.metadata.learning_style,
        pathway.metadata.difficulty,
        pathway.metadata.estimated_total_minutes,
    );
    if pathway.is_empty() {
        println!("  (nothing to learn)");
        return;
    }
    for (index, step) in pathway.steps.iter().enumerate() {
        println!("  Step {} (~{} min)", index + 1, step.estimated_minutes());
        for planned in &step.skills {
            println!(
                "    {} - {} (level {}, ~{} min, {:?} at {:.2})",
                planned.skill.id,
                planned.skill.name,
                planned.skill.level,
                planned.estimated_minutes,
                planned.checkpoint.kind,
                planned.checkpoint.pass_threshold,
            );
            for item in &planned.content {
                println!("      [{}] {}", item.content.kind(), item.content.title());
            }
        }
    }
}
