use crate::libsansuu::bank::QuestionBank;
use crate::libsansuu::error::QuizError;
use crate::libsansuu::review::{Band, Completion, OptionTag, ReviewDetail};
use crate::libsansuu::session::{
    Feedback, QuestionCount, QuestionView, Quiz, Session, SessionState, Stats,
};
use crate::libsansuu::shitsumon::strip_markup;
use colored::Colorize;
use log::{debug, error};
use std::io::{self, BufRead, Read, Write};
use text_io::try_read;

#[derive(Debug, PartialEq)]
pub(crate) enum Choice {
    Option(usize),
    Nothing,
    Quit,
}

impl Choice {
    fn from_str(options_count: usize, input: &str) -> Choice {
        match input {
            "q" => Choice::Quit,
            input => match input.parse::<usize>() {
                Ok(num) if (1..=options_count).contains(&num) => Choice::Option(num - 1),
                Ok(_) => {
                    println!(
                        "{}",
                        format!("There are only {} options available!", options_count)
                            .bright_red()
                    );
                    Choice::Nothing
                }
                Err(_) => Choice::Nothing,
            },
        }
    }
}

/// Reads one trimmed line. `None` once stdin is exhausted.
fn ask(prompt: &str) -> Option<String> {
    print!("{} ", prompt.cyan());
    io::stdout().flush().ok()?;

    let mut stdin = io::stdin().lock();
    match stdin.fill_buf() {
        Ok([]) | Err(_) => return None,
        Ok(_) => {}
    }
    let line: String = try_read!("{}\n", stdin.bytes().map_while(Result::ok)).ok()?;
    Some(line.trim().to_string())
}

fn ask_grade(bank: &QuestionBank) -> Option<String> {
    println!("{} {}", "Grades:".cyan(), bank.grades().join(", "));
    match ask("Pick a grade (q to quit):")? {
        input if input == "q" => None,
        input => Some(input),
    }
}

fn ask_count() -> QuestionCount {
    ask("How many questions? (number, or enter for all):")
        .map(|input| input.parse::<QuestionCount>().unwrap_or_default())
        .unwrap_or_default()
}

pub fn cli_loop(
    quiz: &mut Quiz,
    mut grade: Option<String>,
    mut count: QuestionCount,
) -> Result<(), QuizError> {
    loop {
        let picked = match grade.take() {
            Some(g) => g,
            None => match ask_grade(quiz.bank()) {
                Some(g) => g,
                None => return Ok(()),
            },
        };

        match quiz.select_grade(&picked, count) {
            Ok(session) => println!("{}", session_banner(session).cyan()),
            Err(err @ (QuizError::UnknownGrade(_) | QuizError::EmptyPool)) => {
                debug!("[Setup] Grade {:?} rejected: {}", picked, err);
                println!("{}", format!("Cannot start grade {}: {}", picked, err).yellow());
                continue;
            }
            Err(err) => return Err(err),
        }

        if !play_session(quiz)? {
            println!("{}", "Quitting Early!".cyan());
            return Ok(());
        }
        show_completion(&quiz.completion()?);

        match ask("Play again? [y/N]:") {
            Some(answer) if answer.eq_ignore_ascii_case("y") => count = ask_count(),
            _ => return Ok(()),
        }
    }
}

/// Runs the live session to the end. `false` when the user quit early.
fn play_session(quiz: &mut Quiz) -> Result<bool, QuizError> {
    loop {
        let options_count = {
            let view = quiz.session()?.current_view()?;
            let leading = question_header(&view);
            println!(
                "\n{}{}",
                leading.cyan(),
                strip_markup(view.prompt).black().bold().on_white()
            );
            let indent = " ".repeat(leading.chars().count());
            if let Some(image) = view.image {
                println!("{}{}", indent, format!("[image: {}]", image).dimmed());
            }
            for (i, option) in view.options.iter().enumerate() {
                println!("{}{}. {}", indent, format!("{}", i + 1).bold(), strip_markup(option));
            }
            view.options.len()
        };

        let feedback = loop {
            let Some(input) = ask(&format!("Answer (1-{}, q to quit):", options_count)) else {
                return Ok(false);
            };
            let choice = Choice::from_str(options_count, &input);
            debug!("choice: {:?}", choice);

            match choice {
                Choice::Quit => return Ok(false),
                Choice::Option(idx) => quiz.select_option(idx)?,
                Choice::Nothing => {}
            }
            match quiz.submit() {
                Ok(feedback) => break feedback,
                Err(QuizError::NoSelection) => {
                    println!("{}", "Please select an answer first!".yellow())
                }
                Err(err) => {
                    error!("[Session] Submit rejected: {}", err);
                    return Err(err);
                }
            }
        };

        print_feedback(quiz, &feedback)?;
        print_stats(&quiz.stats());

        match quiz.advance()? {
            SessionState::Complete => return Ok(true),
            _ => {
                if ask("Press enter for the next question:").is_none() {
                    return Ok(false);
                }
            }
        }
    }
}

fn session_banner(session: &Session) -> String {
    format!(
        "==========> Grade {} ({} questions, {} requested) <==========",
        session.grade(),
        session.len(),
        session.requested()
    )
}

fn question_header(view: &QuestionView) -> String {
    format!(
        "Grade {} · Question #{}/{}. ",
        view.grade, view.number, view.total
    )
}

fn print_feedback(quiz: &Quiz, feedback: &Feedback) -> Result<(), QuizError> {
    if feedback.is_correct {
        println!("{}", "Correct! Well done! 🎉".bright_green());
    } else {
        println!(
            "{}",
            format!(
                "Incorrect. The correct answer is: {}",
                strip_markup(&feedback.correct_answer)
            )
            .bright_red()
        );
    }

    let question = quiz.current_question()?;
    for (i, (option, tag)) in question.options().iter().zip(&feedback.tags).enumerate() {
        println!("  {}", tagged_line(i, &strip_markup(option), *tag));
    }
    Ok(())
}

fn tagged_line(idx: usize, text: &str, tag: OptionTag) -> String {
    let line = format!("{}. {}", idx + 1, text);
    match tag {
        OptionTag::Correct => format!("✔ {}", line).green().to_string(),
        OptionTag::IncorrectSelected => format!("✘ {}", line).red().to_string(),
        OptionTag::Neutral => format!("  {}", line),
    }
}

fn print_stats(stats: &Stats) {
    println!(
        "{}",
        format!(
            "Answered: {}  Correct: {}  Accuracy: {}%",
            stats.answered, stats.correct, stats.accuracy
        )
        .blue()
    );
}

fn show_completion(completion: &Completion) {
    let verdict = format!(
        "{}% - {}",
        completion.stats.accuracy,
        completion.band.message()
    );
    println!("\n{}", "==========> Finished! <==========".cyan());
    println!(
        "{}",
        match completion.band {
            Band::VeryGood => verdict.bright_green(),
            Band::KeepItUp => verdict.yellow(),
            Band::TryHarder => verdict.bright_red(),
        }
        .bold()
    );
    println!("{}", format!("({})", completion.band.asset_key()).dimmed());
    print_stats(&completion.stats);

    println!(
        "\n{:>3}  {:<40}  {:<12}  {:<12}  {}",
        "#", "Question", "Your answer", "Correct", "Result"
    );
    for row in completion.review.rows() {
        let result = match row.is_correct {
            Some(true) => "✔".green(),
            Some(false) => "✘".red(),
            None => "-".normal(),
        };
        println!(
            "{:>3}  {:<40}  {:<12}  {:<12}  {}",
            row.ordinal,
            truncate(&row.prompt_text, 40),
            truncate(&strip_markup(&row.user_answer), 12),
            truncate(&strip_markup(&row.correct_answer), 12),
            result
        );
    }

    while let Some(input) = ask("Row number for details (enter to continue):") {
        let Ok(ordinal) = input.parse::<usize>() else {
            break;
        };
        match ordinal
            .checked_sub(1)
            .ok_or(QuizError::OutOfRange {
                index: 0,
                len: completion.review.len(),
            })
            .and_then(|idx| completion.review.detail(idx))
        {
            Ok(detail) => print_detail(detail),
            Err(err) => println!("{}", err.to_string().yellow()),
        }
    }
}

fn print_detail(detail: &ReviewDetail) {
    println!("\n{}", format!("Question {}", detail.ordinal).cyan().bold());
    println!("{}", detail.prompt);
    if let Some(image) = &detail.image {
        println!("{}", format!("[image: {}]", image).dimmed());
    }
    for (i, option) in detail.options.iter().enumerate() {
        println!("  {}", tagged_line(i, &option.text, option.tag));
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}
