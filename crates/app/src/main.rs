use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use fsl_core::model::{TopicId, UserId};
use services::{AppServices, Clock, ReconcilePolicy, SyncSettings};
use storage::{JsonFileSessionStore, SessionStore};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

const DEFAULT_QUESTIONS: usize = 10;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingTopic,
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
    InvalidPolicy { raw: String },
    InvalidQuestionCount { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingTopic => write!(f, "a topic id is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidPolicy { raw } => {
                write!(f, "invalid --policy value: {raw} (expected remote-wins or merge-newest)")
            }
            ArgsError::InvalidQuestionCount { raw } => write!(f, "invalid --questions value: {raw}"),
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
    eprintln!("  cargo run -p app -- topics   [options]");
    eprintln!("  cargo run -p app -- lesson   <topic> [options]");
    eprintln!("  cargo run -p app -- quiz     <topic> [--questions <n>] [options]");
    eprintln!("  cargo run -p app -- overview [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>            default sqlite://fsl.sqlite3");
    eprintln!("  --user <uid>                 signed-in user; omit for local-only mode");
    eprintln!("  --session-file <path>        persist the session cache between runs");
    eprintln!("  --policy <remote-wins|merge-newest>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  FSL_DB_URL, FSL_USER, FSL_SESSION_FILE, FSL_RECONCILE_POLICY, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Topics,
    Lesson(TopicId),
    Quiz { topic: TopicId, questions: usize },
    Overview,
}

struct Args {
    command: Command,
    db_url: String,
    user: Option<UserId>,
    session_file: Option<PathBuf>,
    policy: ReconcilePolicy,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let subcommand = args.next();

        let mut db_url = std::env::var("FSL_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://fsl.sqlite3".into(), normalize_sqlite_url);
        let mut user = match std::env::var("FSL_USER") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_user(raw)?),
            _ => None,
        };
        let mut session_file = std::env::var("FSL_SESSION_FILE").ok().map(PathBuf::from);
        let mut policy = match std::env::var("FSL_RECONCILE_POLICY") {
            Ok(raw) => parse_policy(raw)?,
            Err(_) => ReconcilePolicy::default(),
        };
        let mut topic: Option<TopicId> = None;
        let mut questions = DEFAULT_QUESTIONS;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => user = Some(parse_user(require_value(&mut args, "--user")?)?),
                "--session-file" => {
                    session_file = Some(PathBuf::from(require_value(&mut args, "--session-file")?));
                }
                "--policy" => policy = parse_policy(require_value(&mut args, "--policy")?)?,
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    questions = match value.parse::<usize>() {
                        Ok(n) if n > 0 => n,
                        _ => return Err(ArgsError::InvalidQuestionCount { raw: value }),
                    };
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if !other.starts_with("--") && topic.is_none() => {
                    topic = Some(TopicId::new(other));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match subcommand.as_deref() {
            Some("topics") | None => Command::Topics,
            Some("overview") => Command::Overview,
            Some("lesson") => Command::Lesson(topic.ok_or(ArgsError::MissingTopic)?),
            Some("quiz") => Command::Quiz {
                topic: topic.ok_or(ArgsError::MissingTopic)?,
                questions,
            },
            Some("--help" | "-h") => {
                print_usage();
                std::process::exit(0);
            }
            Some(other) => return Err(ArgsError::UnknownArg(other.to_string())),
        };

        Ok(Self {
            command,
            db_url,
            user,
            session_file,
            policy,
        })
    }
}

fn parse_user(raw: String) -> Result<UserId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidUser { raw })
}

fn parse_policy(raw: String) -> Result<ReconcilePolicy, ArgsError> {
    ReconcilePolicy::parse(raw.trim()).ok_or(ArgsError::InvalidPolicy { raw })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info,storage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite here so services never touch the filesystem.
    prepare_sqlite_file(&args.db_url)?;
    let session = args.session_file.as_ref().map(|path| {
        debug!(path = %path.display(), "using file-backed session cache");
        Arc::new(JsonFileSessionStore::open(path.clone())) as Arc<dyn SessionStore>
    });
    let settings = SyncSettings {
        policy: args.policy,
    };
    let services = AppServices::new_sqlite(&args.db_url, session, Clock::default_clock(), settings).await?;

    match args.command {
        Command::Topics => commands::topics(&services),
        Command::Lesson(topic) => commands::lesson(&services, &topic, args.user).await?,
        Command::Quiz { topic, questions } => {
            commands::quiz(&services, &topic, questions, args.user).await?;
        }
        Command::Overview => commands::overview(&services, args.user).await,
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
