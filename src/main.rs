use clap::Parser;
use env_logger::Env;
use log::debug;
use std::path::PathBuf;
use thiserror::Error;

mod cli;
mod libsansuu;

use crate::libsansuu::bank::{QuestionBank, DEFAULT_BANK_PATH};
use crate::libsansuu::error::QuizError;
use crate::libsansuu::session::{QuestionCount, Quiz};

#[derive(Parser, Debug)]
#[command(name = "算数練習 (Sansūrenshū)")]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_BANK_PATH)]
    bank: PathBuf,
    /// Asked interactively when left out.
    #[arg(short, long)]
    grade: Option<String>,
    /// A positive number, or `all`.
    #[arg(short, long, default_value = "all")]
    question_count: QuestionCount,
    /// Fixes the question order.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(short, long, default_value = "error")]
    log_level: String,
}

#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level.as_str())).init();
    debug!("[Setup] Args: {:?}", args);

    let bank = QuestionBank::load_or_default(&args.bank);
    let mut quiz = match args.seed {
        Some(seed) => Quiz::with_seed(bank, seed),
        None => Quiz::new(bank),
    };

    cli::cli_loop(&mut quiz, args.grade, args.question_count)?;
    Ok(())
}
