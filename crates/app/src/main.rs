use std::fmt;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use quiz_core::Session;
use quiz_core::model::{OptionMark, SessionMode, SessionSettings};
use services::{AppServices, Clock, QuizLoopService, SessionCompletion};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCount { raw: String },
    InvalidLimit { raw: String },
    InvalidMode { raw: String },
    InvalidDbUrl { raw: String },
    NoThemes,
    HelpRequested,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidMode { raw } => {
                write!(f, "invalid --mode value (expected exam or training): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::NoThemes => write!(f, "train needs at least one --theme"),
            ArgsError::HelpRequested => write!(f, "help requested"),
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
    eprintln!("  cargo run -p app -- themes  [--bank <path>]");
    eprintln!("  cargo run -p app -- train   --theme <name> [--theme <name>...] [--count <n>]");
    eprintln!("  cargo run -p app -- exam    [--db <sqlite_url>] [--bank <path>]");
    eprintln!("  cargo run -p app -- history [--mode exam|training] [--limit <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  --bank data/questions.json");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_BANK_PATH, RUST_LOG");
    eprintln!();
    eprintln!("During a session: option numbers toggle answers, n = next, f = finish, q = quit");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Themes,
    Train,
    Exam,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "themes" => Some(Self::Themes),
            "train" => Some(Self::Train),
            "exam" => Some(Self::Exam),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

const DEFAULT_DB_URL: &str = "sqlite:quiz.sqlite3";
const DEFAULT_BANK_PATH: &str = "data/questions.json";

/// Values flags fall back to when absent.
struct Defaults {
    db_url: String,
    bank_path: String,
}

impl Defaults {
    fn from_env() -> Self {
        Self {
            db_url: std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into()),
            bank_path: std::env::var("QUIZ_BANK_PATH").unwrap_or_else(|_| DEFAULT_BANK_PATH.into()),
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.into(),
            bank_path: DEFAULT_BANK_PATH.into(),
        }
    }
}

struct Args {
    db: DbLocation,
    bank_path: String,
    themes: Vec<String>,
    count: Option<u32>,
    mode: Option<SessionMode>,
    limit: Option<u32>,
}

impl Args {
    fn parse(
        cmd: Command,
        defaults: Defaults,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db: DbLocation::parse(&defaults.db_url)?,
            bank_path: defaults.bank_path,
            themes: Vec::new(),
            count: None,
            mode: None,
            limit: None,
        };

        while let Some(arg) = args.next() {
            match (cmd, arg.as_str()) {
                (_, "--db") => {
                    parsed.db = DbLocation::parse(&require_value(args, "--db")?)?;
                }
                (_, "--bank") => parsed.bank_path = require_value(args, "--bank")?,
                (Command::Train, "--theme") => parsed.themes.push(require_value(args, "--theme")?),
                (Command::Train, "--count") => {
                    let value = require_value(args, "--count")?;
                    let count = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                    parsed.count = Some(count);
                }
                (Command::History, "--mode") => {
                    let value = require_value(args, "--mode")?;
                    let mode = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidMode { raw: value.clone() })?;
                    parsed.mode = Some(mode);
                }
                (Command::History, "--limit") => {
                    let value = require_value(args, "--limit")?;
                    let limit = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                    parsed.limit = Some(limit);
                }
                (_, "--help" | "-h") => return Err(ArgsError::HelpRequested),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Train && parsed.themes.is_empty() {
            return Err(ArgsError::NoThemes);
        }

        Ok(parsed)
    }
}

/// Where the result store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DbLocation {
    Memory,
    File(PathBuf),
}

impl DbLocation {
    /// Accepts `sqlite::memory:`, `sqlite://<path>`, `sqlite:<path>` or a bare
    /// path. Relative paths resolve against the working directory.
    fn parse(raw: &str) -> Result<Self, ArgsError> {
        let raw = raw.trim();
        if raw == "sqlite::memory:" {
            return Ok(Self::Memory);
        }

        let path = raw
            .strip_prefix("sqlite://")
            .or_else(|| raw.strip_prefix("sqlite:"))
            .unwrap_or(raw);
        let path = path.split('?').next().unwrap_or_default();
        if path.is_empty() {
            return Err(ArgsError::InvalidDbUrl {
                raw: raw.to_string(),
            });
        }

        let path = Path::new(path);
        if path.is_absolute() {
            return Ok(Self::File(path.to_path_buf()));
        }
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Ok(Self::File(cwd.join(path)))
    }

    fn url(&self) -> String {
        match self {
            Self::Memory => "sqlite::memory:".to_string(),
            Self::File(path) => format!("sqlite://{}", path.display()),
        }
    }

    /// `SQLite` refuses to open a missing file without `mode=rwc`, so create it up front.
    fn ensure_exists(&self) -> std::io::Result<()> {
        let Self::File(path) = self else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map(drop)
    }
}

//
// ─── SESSION SCREEN ────────────────────────────────────────────────────────────
//

enum Input {
    Toggle(usize),
    Next,
    Finish,
    Quit,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "n" => Input::Next,
        "f" => Input::Finish,
        "q" => Input::Quit,
        other => other
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map_or(Input::Unknown, |n| Input::Toggle(n - 1)),
    }
}

fn format_remaining(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn print_question(quiz: &QuizLoopService, session: &Session) {
    let (Some(question), Some(selected)) = (session.current_question(), session.current_selection())
    else {
        return;
    };

    println!();
    let position = format!("Question {}/{}", session.current_index() + 1, session.len());
    match quiz.remaining_seconds(session) {
        Some(secs) => println!("{position}  [{}]  time left {}", question.theme_name(), format_remaining(secs)),
        None => println!("{position}  [{}]", question.theme_name()),
    }
    println!("{}", question.text());
    for (i, option) in question.options().iter().enumerate() {
        let mark = if selected.contains(option) { "x" } else { " " };
        println!("  {}. [{mark}] {option}", i + 1);
    }
}

fn print_result(completion: &SessionCompletion) {
    let result = &completion.result;
    println!();
    println!(
        "{} finished: {} correct, {} incorrect out of {}",
        result.mode(),
        result.correct_count(),
        result.incorrect_count(),
        result.total_questions()
    );

    for (i, record) in result.records().iter().enumerate() {
        let verdict = match (record.was_correct, record.is_unanswered()) {
            (true, _) => "correct",
            (false, true) => "unanswered",
            (false, false) => "wrong",
        };
        println!();
        println!("{}. {} ({verdict})", i + 1, record.question.text());
        for (option, mark) in record.option_marks() {
            let line = match mark {
                OptionMark::SelectedCorrect => format!("  [x] {option}  <- correct"),
                OptionMark::SelectedWrong => format!("  [x] {option}  <- not correct"),
                OptionMark::MissedCorrect => format!("  [ ] {option}  <- missed"),
                OptionMark::Unselected => format!("  [ ] {option}"),
            };
            println!("{line}");
        }
    }

    if let Some(err) = completion.warning() {
        eprintln!();
        eprintln!("warning: the result could not be saved to history: {err}");
    }
}

async fn run_session(
    quiz: &QuizLoopService,
    mut session: Session,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        // The host owns the tick: the deadline is checked before every prompt.
        if let Some(completion) = quiz.expire_if_due(&mut session).await? {
            println!();
            println!("Time is up.");
            print_result(&completion);
            return Ok(());
        }

        print_question(quiz, &session);
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            println!("Session abandoned.");
            return Ok(());
        };

        match parse_input(&line) {
            Input::Toggle(index) => {
                let option = session
                    .current_question()
                    .and_then(|q| q.options().get(index))
                    .cloned();
                match option {
                    Some(option) => {
                        session.toggle_answer(&option)?;
                    }
                    None => println!("No option {}.", index + 1),
                }
            }
            Input::Next => {
                let step = quiz.advance(&mut session).await?;
                if let Some(completion) = step.completion {
                    print_result(&completion);
                    return Ok(());
                }
            }
            Input::Finish => {
                let completion = quiz.finish(&mut session).await?;
                print_result(&completion);
                return Ok(());
            }
            Input::Quit => {
                println!("Session abandoned.");
                return Ok(());
            }
            Input::Unknown => println!("Type an option number, n, f or q."),
        }
    }
}

//
// ─── ENTRY ─────────────────────────────────────────────────────────────────────
//

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
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
            ArgsError::UnknownArg(first.clone())
        })?,
    };

    let parsed = match Args::parse(cmd, Defaults::from_env(), &mut argv) {
        Ok(parsed) => parsed,
        Err(ArgsError::HelpRequested) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return Err(e.into());
        }
    };

    parsed.db.ensure_exists()?;
    let db_url = parsed.db.url();
    tracing::debug!(db_url = %db_url, bank = %parsed.bank_path, "opening app services");
    let app = AppServices::new_sqlite(
        &db_url,
        &parsed.bank_path,
        Clock::default_clock(),
        SessionSettings::default(),
    )
    .await?;

    let outcome = dispatch(cmd, parsed, &app).await;
    app.close().await;
    outcome
}

async fn dispatch(
    cmd: Command,
    parsed: Args,
    app: &AppServices,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Themes => {
            for theme in app.bank().theme_overview() {
                println!("{:>3}  {}", theme.question_count, theme.name);
            }
            Ok(())
        }
        Command::Train => {
            let quiz = app.quiz_loop();
            let session = quiz.start_training(parsed.themes, parsed.count)?;
            run_session(&quiz, session).await
        }
        Command::Exam => {
            let quiz = app.quiz_loop();
            let session = quiz.start_exam()?;
            run_session(&quiz, session).await
        }
        Command::History => {
            let history = app.history();
            for item in history.list_recent(parsed.mode, parsed.limit).await? {
                println!(
                    "#{:<4} {:<8} {}  {}/{} ({}%)",
                    item.id,
                    item.mode.as_str(),
                    item.completed_at.format("%Y-%m-%d %H:%M"),
                    item.correct,
                    item.total,
                    item.score_percent
                );
            }
            for mode in [SessionMode::Exam, SessionMode::Training] {
                let stats = history.stats(mode).await?;
                if stats.sessions > 0 {
                    println!(
                        "{mode}: {} sessions, average {}%, best {}%",
                        stats.sessions,
                        stats.average_percent(),
                        stats.best_score_percent.unwrap_or(0)
                    );
                }
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
