//! evalua CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "evalua", version, about = "Exam authoring, submission and scoring")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and example catalog
    Init,

    /// Validate a catalog TOML file
    Validate {
        /// Path to the catalog file
        #[arg(long)]
        catalog: PathBuf,
    },

    /// Import a catalog into the state file
    Load {
        /// Path to the catalog file
        #[arg(long)]
        catalog: PathBuf,

        /// State file (defaults to `state_path` from the config)
        #[arg(long)]
        state: Option<PathBuf>,

        /// Admin to import as; required once the state has users
        #[arg(long = "as")]
        as_user: Option<String>,
    },

    /// List exams
    Exams {
        #[arg(long)]
        state: Option<PathBuf>,

        /// Only exams open at this RFC 3339 instant
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Show the questions of an exam
    Paper {
        #[arg(long)]
        state: Option<PathBuf>,

        #[arg(long = "as")]
        as_user: String,

        /// Exam id or title
        #[arg(long)]
        exam: String,
    },

    /// Submit answers to an exam
    Submit {
        #[arg(long)]
        state: Option<PathBuf>,

        /// Student submitting
        #[arg(long = "as")]
        as_user: String,

        /// Exam id or title
        #[arg(long)]
        exam: String,

        /// JSON file mapping question numbers to answers
        #[arg(long)]
        answers: PathBuf,

        /// Submission time (RFC 3339, default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// List graded submissions visible to the caller
    Results {
        #[arg(long)]
        state: Option<PathBuf>,

        #[arg(long = "as")]
        as_user: String,

        /// Exam id or title
        #[arg(long)]
        exam: Option<String>,

        /// Student username
        #[arg(long)]
        student: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Show dashboard statistics
    Stats {
        #[arg(long)]
        state: Option<PathBuf>,

        #[arg(long = "as")]
        as_user: String,

        /// Per-exam score summary instead of the dashboard
        #[arg(long)]
        exam: Option<String>,
    },

    /// List users
    Users {
        #[arg(long)]
        state: Option<PathBuf>,

        #[arg(long = "as")]
        as_user: String,
    },

    /// Show the audit log
    Audit {
        #[arg(long)]
        state: Option<PathBuf>,

        #[arg(long = "as")]
        as_user: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("evalua=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { catalog } => commands::validate::execute(catalog),
        Commands::Load {
            catalog,
            state,
            as_user,
        } => commands::load::execute(catalog, state, as_user, config).await,
        Commands::Exams { state, as_of } => commands::exams::execute(state, as_of, config).await,
        Commands::Paper {
            state,
            as_user,
            exam,
        } => commands::paper::execute(state, as_user, exam, config).await,
        Commands::Submit {
            state,
            as_user,
            exam,
            answers,
            at,
        } => commands::submit::execute(state, as_user, exam, answers, at, config).await,
        Commands::Results {
            state,
            as_user,
            exam,
            student,
            format,
        } => commands::results::execute(state, as_user, exam, student, format, config).await,
        Commands::Stats {
            state,
            as_user,
            exam,
        } => commands::stats::execute(state, as_user, exam, config).await,
        Commands::Users { state, as_user } => {
            commands::users::execute(state, as_user, config).await
        }
        Commands::Audit { state, as_user } => {
            commands::audit::execute(state, as_user, config).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
