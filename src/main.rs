use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

mod config;
mod db;
mod input;
mod models;
mod planner;
mod report;

use config::Settings;
use db::StudentStore;
use models::StudentRecord;

#[derive(Parser)]
#[command(name = "study-planner")]
#[command(about = "Student performance records and weekly study timetables", long_about = None)]
struct Cli {
    /// Overrides DATABASE_URL.
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Markdown,
    Json,
}

#[derive(clap::Args)]
struct TimetableArgs {
    /// Comma-separated subjects, e.g. "Math, Physics, Chemistry"
    #[arg(long)]
    subjects: String,
    /// Comma-separated marks in the same order, e.g. "75, 60, 90"
    #[arg(long)]
    marks: String,
    /// Total available study hours for the week
    #[arg(long)]
    hours: f64,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the timetable to a file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load example student records
    Seed,
    /// Add one student's performance data
    Add {
        #[arg(long)]
        student_id: i64,
        #[arg(long)]
        attendance: f64,
        #[arg(long)]
        assignment: f64,
        #[arg(long)]
        mid_term: f64,
        #[arg(long)]
        study_hours: f64,
        #[arg(long)]
        quiz: f64,
        #[arg(long)]
        final_exam: f64,
    },
    /// Show a student's stored performance data
    Fetch { student_id: i64 },
    /// Import student records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Fetch a student and generate their weekly study timetable
    Plan {
        #[arg(long)]
        student_id: i64,
        #[command(flatten)]
        timetable: TimetableArgs,
    },
    /// Generate a weekly study timetable without a student lookup
    Timetable {
        #[command(flatten)]
        timetable: TimetableArgs,
    },
}

impl Commands {
    fn needs_storage(&self) -> bool {
        !matches!(self, Commands::Timetable { .. })
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn render_plan(
    student: Option<&StudentRecord>,
    args: &TimetableArgs,
) -> anyhow::Result<Option<String>> {
    let subjects = input::parse_subjects(&args.subjects);
    let marks = match input::parse_marks(&args.marks) {
        Ok(marks) => marks,
        Err(err) => {
            debug!(error = %err, "rejected timetable input");
            println!("Warning: {err}");
            return Ok(None);
        }
    };

    let plan = match planner::generate_from_lists(&subjects, &marks, args.hours) {
        Ok(plan) => plan,
        Err(err) => {
            debug!(error = %err, "timetable not generated");
            println!("Warning: {err}");
            return Ok(None);
        }
    };

    let rendered = match args.format {
        OutputFormat::Text => {
            let mut text = String::from("Generated Weekly Study Timetable:\n");
            text.push_str(&report::render_timetable(&plan.timetable));
            for warning in &plan.warnings {
                text.push_str(&format!("Warning: {warning}\n"));
            }
            text
        }
        OutputFormat::Markdown => {
            report::build_report(student, Local::now().date_naive(), &plan)
        }
        OutputFormat::Json => report::to_json(&plan).context("failed to serialize timetable")?,
    };

    Ok(Some(rendered))
}

fn emit(rendered: &str, out: Option<&PathBuf>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Timetable written to {}.", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn require(store: Option<&StudentStore>) -> anyhow::Result<&StudentStore> {
    store.context("storage unavailable; check DATABASE_URL")
}

async fn run(command: Commands, store: Option<&StudentStore>) -> anyhow::Result<()> {
    match command {
        Commands::Timetable { timetable } => {
            if let Some(rendered) = render_plan(None, &timetable)? {
                emit(&rendered, timetable.out.as_ref())?;
            }
        }
        Commands::InitDb => {
            require(store)?.init_db().await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = require(store)?.seed().await?;
            println!("Inserted {inserted} example students.");
        }
        Commands::Add {
            student_id,
            attendance,
            assignment,
            mid_term,
            study_hours,
            quiz,
            final_exam,
        } => {
            let record = StudentRecord {
                student_id,
                attendance_percentage: attendance,
                assignment_score: assignment,
                mid_term_score: mid_term,
                study_hours,
                quiz_score: quiz,
                final_exam_score: final_exam,
            };
            require(store)?
                .insert_student(&record)
                .await
                .context("error saving data")?;
            println!("Student data saved successfully!");
        }
        Commands::Fetch { student_id } => {
            match require(store)?
                .fetch_student(student_id)
                .await
                .context("error fetching data")?
            {
                Some(record) => print!("{}", report::render_student(&record)),
                None => println!("Warning: No student found with this ID."),
            }
        }
        Commands::Import { csv } => {
            let inserted = require(store)?.import_csv(&csv).await?;
            println!("Inserted {inserted} students from {}.", csv.display());
        }
        Commands::Plan {
            student_id,
            timetable,
        } => {
            let Some(student) = require(store)?
                .fetch_student(student_id)
                .await
                .context("error fetching data")?
            else {
                println!("Warning: No student found with this ID.");
                return Ok(());
            };

            if matches!(timetable.format, OutputFormat::Text) {
                println!("Student Data:");
                print!("{}", report::render_student(&student));
            }
            if let Some(rendered) = render_plan(Some(&student), &timetable)? {
                emit(&rendered, timetable.out.as_ref())?;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let settings = Settings::from_env()?.with_database_url(cli.database_url);

    let store = if cli.command.needs_storage() {
        match StudentStore::connect(&settings).await {
            Ok(store) => Some(store),
            Err(err) => {
                debug!(error = %err, "storage unavailable");
                eprintln!("Failed to connect to the database: {err}");
                None
            }
        }
    } else {
        info!("skipping database connection");
        None
    };

    let result = run(cli.command, store.as_ref()).await;

    if let Some(store) = store {
        store.close().await;
    }

    result
}
