use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("markup tag pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Why a record from the question bank cannot be asked.
#[derive(Debug, Error, PartialEq)]
pub enum RecordProblem {
    #[error("needs at least 2 options, has {0}")]
    TooFewOptions(usize),
    #[error("`correct` is {correct} but there are only {len} options")]
    CorrectOutOfRange { correct: i64, len: usize },
}

/// One multiple-choice question. Copies handed out by a session additionally
/// carry the option the user submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRecord {
    prompt: String,
    options: Vec<String>,
    correct_index: usize,
    topic: String,
    image: Option<String>,
    user_selected: Option<usize>,
}

impl QuestionRecord {
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct: i64,
        topic: impl Into<String>,
    ) -> Result<Self, RecordProblem> {
        if options.len() < 2 {
            return Err(RecordProblem::TooFewOptions(options.len()));
        }
        let correct_index = match usize::try_from(correct) {
            Ok(idx) if idx < options.len() => idx,
            _ => {
                return Err(RecordProblem::CorrectOutOfRange {
                    correct,
                    len: options.len(),
                })
            }
        };

        Ok(Self {
            prompt: prompt.into(),
            options,
            correct_index,
            topic: topic.into(),
            image: None,
            user_selected: None,
        })
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image.filter(|path| !path.is_empty());
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
    /// The prompt with markup tags removed, for one-line summaries.
    pub fn prompt_text(&self) -> String {
        strip_markup(&self.prompt)
    }
    pub fn options(&self) -> &[String] {
        &self.options
    }
    pub fn correct_index(&self) -> usize {
        self.correct_index
    }
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }
    pub fn topic(&self) -> &str {
        &self.topic
    }
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn user_selected(&self) -> Option<usize> {
        self.user_selected
    }
    pub fn selected_option(&self) -> Option<&str> {
        self.user_selected
            .and_then(|idx| self.options.get(idx))
            .map(String::as_str)
    }
    /// `None` while unanswered.
    pub fn is_correct(&self) -> Option<bool> {
        self.user_selected.map(|idx| idx == self.correct_index)
    }

    pub(crate) fn record_answer(&mut self, index: usize) {
        self.user_selected = Some(index);
    }
}

pub fn strip_markup(markup: &str) -> String {
    let without_tags = MARKUP_TAG.replace_all(markup, "");
    WHITESPACE
        .replace_all(without_tags.trim(), " ")
        .into_owned()
}
