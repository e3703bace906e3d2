use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use quiz_core::model::{AttemptId, QuestionDraft, QuizDraft, QuizId, TimerType};
use services::{AppServices, Clock, LiveQuery, QuizServiceError};
use storage::FileSessionStore;
use storage::repository::{StoredAttempt, StoredQuiz};
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, normalize_sqlite_url, prepare_sqlite_file};
use crate::terminal::{TerminalPrompt, stdin_lines};

mod config;
mod take;
mod terminal;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { command: &'static str, flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { command, flag } => write!(f, "{command} requires {flag}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz seed                                   # store a sample quiz");
    eprintln!("  quiz create   --file <draft.json>");
    eprintln!("  quiz import   --quiz <id> --file <questions.json>");
    eprintln!("  quiz list     [--watch]");
    eprintln!("  quiz link     --quiz <id>");
    eprintln!("  quiz take     (--quiz <id> | --link <url>)");
    eprintln!("  quiz attempts --quiz <id> [--watch]");
    eprintln!("  quiz review   --attempt <id>");
    eprintln!("  quiz delete   --quiz <id>");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>  --session-dir <dir>  --base-url <url>  --owner <name>");
    eprintln!();
    eprintln!("Environment (also read from .env):");
    eprintln!("  QUIZ_DB_URL, QUIZ_SESSION_DIR, QUIZ_BASE_URL, QUIZ_OWNER, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Create,
    Import,
    List,
    Link,
    Take,
    Attempts,
    Review,
    Delete,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "create" => Some(Self::Create),
            "import" => Some(Self::Import),
            "list" => Some(Self::List),
            "link" => Some(Self::Link),
            "take" => Some(Self::Take),
            "attempts" => Some(Self::Attempts),
            "review" => Some(Self::Review),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Create => "create",
            Self::Import => "import",
            Self::List => "list",
            Self::Link => "link",
            Self::Take => "take",
            Self::Attempts => "attempts",
            Self::Review => "review",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug)]
struct Args {
    command: Command,
    config: Config,
    quiz: Option<QuizId>,
    attempt: Option<AttemptId>,
    link: Option<String>,
    file: Option<PathBuf>,
    watch: bool,
}

impl Args {
    fn parse(
        command: Command,
        mut config: Config,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut quiz = None;
        let mut attempt = None;
        let mut link = None;
        let mut file = None;
        let mut watch = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    config.db_url = normalize_sqlite_url(value);
                }
                "--session-dir" => {
                    config.session_dir = PathBuf::from(require_value(args, "--session-dir")?);
                }
                "--base-url" => config.base_url = require_value(args, "--base-url")?,
                "--owner" => config.owner = require_value(args, "--owner")?,
                "--quiz" => {
                    let value = require_value(args, "--quiz")?;
                    let id = value.parse::<QuizId>().map_err(|_| ArgsError::InvalidId {
                        flag: "--quiz",
                        raw: value.clone(),
                    })?;
                    quiz = Some(id);
                }
                "--attempt" => {
                    let value = require_value(args, "--attempt")?;
                    let id = value.parse::<AttemptId>().map_err(|_| ArgsError::InvalidId {
                        flag: "--attempt",
                        raw: value.clone(),
                    })?;
                    attempt = Some(id);
                }
                "--link" => link = Some(require_value(args, "--link")?),
                "--file" => file = Some(PathBuf::from(require_value(args, "--file")?)),
                "--watch" => watch = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            command,
            config,
            quiz,
            attempt,
            link,
            file,
            watch,
        })
    }

    fn quiz(&self) -> Result<QuizId, ArgsError> {
        self.quiz.ok_or(ArgsError::MissingFlag {
            command: self.command.name(),
            flag: "--quiz",
        })
    }

    fn attempt(&self) -> Result<AttemptId, ArgsError> {
        self.attempt.ok_or(ArgsError::MissingFlag {
            command: self.command.name(),
            flag: "--attempt",
        })
    }

    fn file(&self) -> Result<&PathBuf, ArgsError> {
        self.file.as_ref().ok_or(ArgsError::MissingFlag {
            command: self.command.name(),
            flag: "--file",
        })
    }
}

fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let command = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let config = Config::from_env();
    init_tracing(&config.rust_log);

    let args = Args::parse(command, config, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&args.config.db_url)?;
    let input = stdin_lines();
    let session_store = Arc::new(FileSessionStore::open(&args.config.session_dir)?);
    let app = AppServices::new_sqlite(
        &args.config.db_url,
        Clock::default_clock(),
        &args.config.base_url,
        session_store,
        Arc::new(TerminalPrompt::new(Arc::clone(&input))),
    )
    .await?;
    tracing::debug!(db = %args.config.db_url, command = args.command.name(), "services ready");

    match args.command {
        Command::Seed => seed(&app, &args.config.owner).await,
        Command::Create => {
            let raw = std::fs::read_to_string(args.file()?)?;
            let draft: QuizDraft = serde_json::from_str(&raw)?;
            let id = report_validation(app.quizzes().create_quiz(&args.config.owner, draft).await)?;
            println!("Quiz {id} created.");
            println!("Share link: {}", app.quizzes().share_link(id)?);
            Ok(())
        }
        Command::Import => {
            let quiz_id = args.quiz()?;
            let raw = std::fs::read_to_string(args.file()?)?;
            let quizzes = app.quizzes();
            let quiz = quizzes
                .get_quiz(quiz_id)
                .await?
                .ok_or(QuizServiceError::NotFound)?;
            let mut draft = QuizDraft::from(&quiz);
            let report = quizzes.import_questions(&mut draft, &raw)?;
            println!("{}", report.summary());
            for item in &report.rejected {
                println!("  item #{}: {}", item.position, item.reasons());
            }
            if !report.imported.is_empty() {
                report_validation(quizzes.update_quiz(quiz_id, draft).await)?;
            }
            Ok(())
        }
        Command::List => {
            if args.watch {
                watch(app.quizzes().watch_quizzes(&args.config.owner), print_quizzes).await
            } else {
                print_quizzes(&app.quizzes().list_quizzes(&args.config.owner).await?);
                Ok(())
            }
        }
        Command::Link => {
            let quiz_id = args.quiz()?;
            app.quizzes()
                .get_quiz(quiz_id)
                .await?
                .ok_or(QuizServiceError::NotFound)?;
            println!("{}", app.quizzes().share_link(quiz_id)?);
            Ok(())
        }
        Command::Take => {
            let sessions = app.sessions();
            let engine = match (&args.link, args.quiz) {
                (Some(link), _) => sessions.load_from_link(link).await?,
                (None, Some(quiz_id)) => sessions.load_quiz(quiz_id).await?,
                (None, None) => {
                    return Err(ArgsError::MissingFlag {
                        command: "take",
                        flag: "--quiz or --link",
                    }
                    .into());
                }
            };
            take::run_session(engine, input).await
        }
        Command::Attempts => {
            let quiz_id = args.quiz()?;
            if args.watch {
                watch(app.attempts().watch_attempts(quiz_id), print_attempts).await
            } else {
                print_attempts(&app.attempts().list_attempts(quiz_id).await?);
                Ok(())
            }
        }
        Command::Review => {
            let review = app.attempts().review_attempt(args.attempt()?).await?;
            let attempt = &review.attempt;
            println!(
                "{} ({}) on \"{}\": {} / {}",
                attempt.student_info().display_name(),
                attempt.student_info().email,
                attempt.quiz_title(),
                attempt.score(),
                attempt.total_points()
            );
            for item in &review.items {
                let mark = if item.is_correct { "correct" } else { "wrong" };
                println!("{}. {} [{mark}]", item.number, item.question);
                println!("   student answer: {}", item.student_choice_label());
                println!("   correct answer: {}", item.correct_choice);
            }
            Ok(())
        }
        Command::Delete => {
            let quiz_id = args.quiz()?;
            let removed = app.quizzes().delete_quiz(quiz_id).await?;
            println!("Deleted quiz {quiz_id} and {removed} attempt(s).");
            Ok(())
        }
    }
}

/// Print validation issues one per line before failing.
fn report_validation<T>(result: Result<T, QuizServiceError>) -> Result<T, QuizServiceError> {
    if let Err(QuizServiceError::Validation(err)) = &result {
        for issue in &err.issues {
            eprintln!("  - {issue}");
        }
    }
    result
}

async fn watch<T>(
    mut live: LiveQuery<T>,
    print: fn(&[T]),
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        tokio::select! {
            snapshot = live.next() => match snapshot {
                Some(rows) => {
                    println!("---");
                    print(&rows?);
                }
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

fn print_quizzes(rows: &[StoredQuiz]) {
    if rows.is_empty() {
        println!("No quizzes yet.");
    }
    for row in rows {
        let settings = row.quiz.settings();
        let timer = match settings.timer().kind() {
            TimerType::None => "no timer".to_string(),
            TimerType::PerItem => format!("{}s per question", settings.timer().value().unwrap_or(0)),
            TimerType::Total => format!("{} min total", settings.timer().value().unwrap_or(0)),
        };
        println!(
            "#{}  {}  ({} questions, {}, created {})",
            row.id,
            row.quiz.title(),
            row.quiz.question_count(),
            timer,
            row.quiz.created_at().format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_attempts(rows: &[StoredAttempt]) {
    if rows.is_empty() {
        println!("No attempts yet.");
    }
    for row in rows {
        let attempt = &row.attempt;
        println!(
            "#{}  {}  {} / {}  {}",
            row.id,
            attempt.student_info().display_name(),
            attempt.score(),
            attempt.total_points(),
            attempt.submitted_at().format("%Y-%m-%d %H:%M:%S")
        );
    }
}

async fn seed(app: &AppServices, owner: &str) -> Result<(), Box<dyn std::error::Error>> {
    let question = |text: &str, options: [&str; 4], answer: i64| QuestionDraft {
        text: text.to_string(),
        options: options.iter().map(|o| (*o).to_string()).collect(),
        answer: Some(answer),
    };
    let draft = QuizDraft {
        title: "Sample Quiz".into(),
        timer_type: TimerType::PerItem,
        timer_value: Some(30),
        points_per_item: Some(1),
        questions: vec![
            question("What is 2 + 2?", ["3", "4", "5", "22"], 1),
            question("Which planet is largest?", ["Mars", "Earth", "Jupiter", "Venus"], 2),
            question("Which is a primary color?", ["Red", "Green", "Purple", "Orange"], 0),
        ],
    };
    let id = app.quizzes().create_quiz(owner, draft).await?;
    println!("Seeded quiz {id} for {owner}.");
    println!("Share link: {}", app.quizzes().share_link(id)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
