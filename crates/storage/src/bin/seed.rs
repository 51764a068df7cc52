use std::fmt;
use std::path::PathBuf;

use storage::repository::{QuestionSource, Storage};
use storage::CsvQuestionSource;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    csv_path: PathBuf,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidCsvPath { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCsvPath { raw } => write!(f, "invalid --csv value: {raw}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZGEN_DB_URL").unwrap_or_else(|_| "sqlite:questions.sqlite3?mode=rwc".into());
        let mut csv_path = std::env::var("QUIZGEN_CSV")
            .map_or_else(|_| PathBuf::from("data/questions.csv"), PathBuf::from);

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if !value.starts_with("sqlite:") {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--csv" => {
                    let value = require_value(&mut args, "--csv")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidCsvPath { raw: value });
                    }
                    csv_path = PathBuf::from(value);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, csv_path })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Imports a question bank CSV into SQLite (upserting by id).");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>   SQLite URL (default: sqlite:questions.sqlite3?mode=rwc)");
    eprintln!("  --csv <path>        CSV with id,question,category,difficulty,type");
    eprintln!("                      (default: data/questions.csv)");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZGEN_DB_URL, QUIZGEN_CSV");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let questions = CsvQuestionSource::new(&args.csv_path)
        .load_questions()
        .await?;

    let storage = Storage::sqlite(&args.db_url).await?;
    for question in &questions {
        storage.questions.upsert_question(question).await?;
    }

    println!(
        "Seeded {} questions from {} into {}",
        questions.len(),
        args.csv_path.display(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
