use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use app::{AppState, router};
use services::{Clock, PoolHandle, TestGenerator};
use storage::repository::Storage;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidBank { raw: String },
    InvalidAddr { raw: String },
    InvalidTtl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidBank { raw } => write!(f, "invalid --bank value: {raw}"),
            ArgsError::InvalidAddr { raw } => write!(f, "invalid --addr value: {raw}"),
            ArgsError::InvalidTtl { raw } => write!(f, "invalid --session-ttl-secs value: {raw}"),
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

#[derive(Debug, Clone, PartialEq, Eq)]
enum Bank {
    Csv(std::path::PathBuf),
    Sqlite(String),
}

impl Bank {
    fn parse(raw: String) -> Result<Self, ArgsError> {
        if raw.trim().is_empty() {
            return Err(ArgsError::InvalidBank { raw });
        }
        if raw.starts_with("sqlite:") {
            Ok(Self::Sqlite(normalize_sqlite_url(raw)))
        } else {
            Ok(Self::Csv(raw.trim().into()))
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bank::Csv(path) => write!(f, "{}", path.display()),
            Bank::Sqlite(url) => f.write_str(url),
        }
    }
}

struct Args {
    bank: Bank,
    addr: SocketAddr,
    session_ttl: chrono::Duration,
}

fn parse_addr(raw: String) -> Result<SocketAddr, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidAddr { raw })
}

fn parse_ttl(raw: String) -> Result<chrono::Duration, ArgsError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|secs| *secs > 0)
        .and_then(chrono::Duration::try_seconds)
        .ok_or(ArgsError::InvalidTtl { raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--bank <csv_path|sqlite_url>] [--addr <host:port>]");
    eprintln!("                      [--session-ttl-secs <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --bank data/questions.csv");
    eprintln!("  --addr 127.0.0.1:8080");
    eprintln!("  --session-ttl-secs 3600");
    eprintln!();
    eprintln!("A bank starting with sqlite: is read from SQLite (see the storage seed binary).");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZGEN_BANK, QUIZGEN_ADDR, QUIZGEN_SESSION_TTL_SECS, RUST_LOG");
}

impl Args {
    /// Parse flags over defaults taken from `env` (`QUIZGEN_*` keys).
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut bank =
            Bank::parse(env("QUIZGEN_BANK").unwrap_or_else(|| "data/questions.csv".into()))?;
        let mut addr =
            parse_addr(env("QUIZGEN_ADDR").unwrap_or_else(|| "127.0.0.1:8080".into()))?;
        let mut session_ttl = match env("QUIZGEN_SESSION_TTL_SECS") {
            Some(raw) => parse_ttl(raw)?,
            None => chrono::Duration::hours(1),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--bank" => bank = Bank::parse(require_value(args, "--bank")?)?,
                "--addr" => addr = parse_addr(require_value(args, "--addr")?)?,
                "--session-ttl-secs" => {
                    session_ttl = parse_ttl(require_value(args, "--session-ttl-secs")?)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            bank,
            addr,
            session_ttl,
        })
    }
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
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
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
        .ok_or_else(|| ArgsError::InvalidBank {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidBank {
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

fn spawn_idle_sweeper(generator: Arc<TestGenerator>, ttl: chrono::Duration) {
    let period = ttl
        .to_std()
        .map_or(Duration::from_secs(60), |ttl| ttl / 2)
        .max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match generator.evict_idle(ttl).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "evicted idle sessions"),
                Err(err) => warn!(error = %err, "idle session sweep failed"),
            }
        }
    });
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = match &args.bank {
        Bank::Csv(path) => Storage::csv(path.clone()),
        Bank::Sqlite(url) => {
            prepare_sqlite_file(url)?;
            Storage::sqlite(url).await?
        }
    };

    let pool = Arc::new(PoolHandle::load(storage.questions.as_ref()).await?);
    let snapshot = pool.snapshot();
    if snapshot.is_empty() {
        warn!(bank = %args.bank, "question bank is empty; generation requests will fail");
    }
    info!(
        bank = %args.bank,
        questions = snapshot.len(),
        categories = snapshot.domains().categories.len(),
        "question bank loaded"
    );
    drop(snapshot);

    let generator = Arc::new(TestGenerator::new(Clock::default(), storage.usage.clone()));
    spawn_idle_sweeper(Arc::clone(&generator), args.session_ttl);

    let app = router(AppState::new(generator, pool, storage.questions));
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_kind_follows_prefix() {
        assert_eq!(
            Bank::parse("data/q.csv".into()).unwrap(),
            Bank::Csv("data/q.csv".into())
        );
        assert_eq!(
            Bank::parse("sqlite::memory:".into()).unwrap(),
            Bank::Sqlite("sqlite::memory:".into())
        );
        assert!(matches!(
            Bank::parse("sqlite:bank.db".into()).unwrap(),
            Bank::Sqlite(url) if url.starts_with("sqlite://") && url.ends_with("bank.db")
        ));
        assert!(Bank::parse("  ".into()).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let mut argv = ["--addr", "0.0.0.0:9000", "--session-ttl-secs", "60"]
            .into_iter()
            .map(String::from);
        let args = Args::parse(&mut argv, |_| None).unwrap();
        assert_eq!(args.addr, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(args.session_ttl, chrono::Duration::seconds(60));
    }

    #[test]
    fn env_supplies_defaults_and_flags_win() {
        let env = |key: &str| match key {
            "QUIZGEN_BANK" => Some("sqlite::memory:".to_owned()),
            "QUIZGEN_SESSION_TTL_SECS" => Some("120".to_owned()),
            _ => None,
        };

        let args = Args::parse(&mut std::iter::empty(), env).unwrap();
        assert_eq!(args.bank, Bank::Sqlite("sqlite::memory:".into()));
        assert_eq!(args.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(args.session_ttl, chrono::Duration::minutes(2));

        let mut argv = ["--bank", "bank.csv"].into_iter().map(String::from);
        let args = Args::parse(&mut argv, env).unwrap();
        assert_eq!(args.bank, Bank::Csv("bank.csv".into()));
    }

    #[test]
    fn invalid_env_value_is_reported() {
        let env = |key: &str| (key == "QUIZGEN_ADDR").then(|| "not-an-addr".to_owned());
        assert!(matches!(
            Args::parse(&mut std::iter::empty(), env),
            Err(ArgsError::InvalidAddr { .. })
        ));
    }

    #[test]
    fn rejects_zero_ttl_and_dangling_flags() {
        assert!(matches!(
            parse_ttl("0".into()),
            Err(ArgsError::InvalidTtl { .. })
        ));
        let mut argv = ["--bank"].into_iter().map(String::from);
        assert!(matches!(
            Args::parse(&mut argv, |_| None),
            Err(ArgsError::MissingValue { flag: "--bank" })
        ));
    }
}
