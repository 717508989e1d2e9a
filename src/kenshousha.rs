use colored::Colorize;
use env_logger::Env;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
mod libsansuu;
use crate::libsansuu::bank::{QuestionBank, DEFAULT_BANK_PATH};

#[derive(Parser, Debug)]
#[command(name = "検証者 (Kenshōsha)")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "info")]
    log_level: String,
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_BANK_PATH)]
    bank: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate every record in the bank file.
    Check,
    /// Print the built-in bank in the bank file format.
    ExportDefault,
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level)).init();

    match args.command {
        Commands::Check => check(&args.bank),
        Commands::ExportDefault => match QuestionBank::builtin().to_json_pretty() {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("{}", format!("Cannot serialize the built-in bank: {}", err).red());
                ExitCode::FAILURE
            }
        },
    }
}

fn check(path: &Path) -> ExitCode {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) => {
            error!("{}", format!("Cannot read {:?}: {}", path, err).red());
            return ExitCode::FAILURE;
        }
    };
    let (bank, rejected) = match QuestionBank::parse_checked(&json) {
        Ok(parsed) => parsed,
        Err(err) => {
            error!("{}", format!("{}!", err).red());
            return ExitCode::FAILURE;
        }
    };

    info!(
        "{}",
        format!("Checking {:?} ({} Grades)", path, bank.grades().len()).blue()
    );
    let mut empty_grades = 0;
    for grade in bank.grades() {
        let pool = bank.pool(grade).map(<[_]>::len).unwrap_or_default();
        if pool == 0 {
            empty_grades += 1;
            error!("{}", format!("├ ✘ Grade: {} (no usable questions)", grade).red());
        } else {
            info!("{}", format!("├ Grade: {} ({} Questions)", grade, pool).blue());
        }
        for r in rejected.iter().filter(|r| r.grade == grade) {
            error!(
                "{} {}",
                "│".blue(),
                format!("├ ✘ Question #{}: {}", r.position + 1, r.problem)
                    .red()
                    .strikethrough()
            );
        }
    }

    if rejected.is_empty() && empty_grades == 0 {
        info!("{}", "Question bank is valid.".green());
        ExitCode::SUCCESS
    } else {
        error!(
            "{}",
            format!(
                "{} invalid question(s), {} empty grade(s).",
                rejected.len(),
                empty_grades
            )
            .red()
        );
        ExitCode::FAILURE
    }
}
