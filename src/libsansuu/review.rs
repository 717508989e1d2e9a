use crate::libsansuu::error::QuizError;
use crate::libsansuu::session::Stats;
use crate::libsansuu::shitsumon::QuestionRecord;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionTag {
    Correct,
    IncorrectSelected,
    Neutral,
}

/// One tag per option: the correct one, the user's wrong pick if any, and
/// everything else neutral.
pub fn option_tags(question: &QuestionRecord) -> Vec<OptionTag> {
    (0..question.options().len())
        .map(|idx| {
            if idx == question.correct_index() {
                OptionTag::Correct
            } else if Some(idx) == question.user_selected() {
                OptionTag::IncorrectSelected
            } else {
                OptionTag::Neutral
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    /// 1-based.
    pub ordinal: usize,
    pub prompt_text: String,
    /// `"-"` when unanswered.
    pub user_answer: String,
    pub correct_answer: String,
    /// `None` when unanswered.
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedOption {
    pub text: String,
    pub tag: OptionTag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDetail {
    pub ordinal: usize,
    pub prompt: String,
    pub image: Option<String>,
    pub options: Vec<TaggedOption>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewTable {
    rows: Vec<ReviewRow>,
    details: Vec<ReviewDetail>,
}

impl ReviewTable {
    pub fn rows(&self) -> &[ReviewRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `index` is 0-based, the row's ordinal minus one.
    pub fn detail(&self, index: usize) -> Result<&ReviewDetail, QuizError> {
        self.details.get(index).ok_or(QuizError::OutOfRange {
            index,
            len: self.details.len(),
        })
    }
}

pub fn build_review(questions: &[QuestionRecord]) -> ReviewTable {
    let mut table = ReviewTable {
        rows: Vec::with_capacity(questions.len()),
        details: Vec::with_capacity(questions.len()),
    };

    for (idx, question) in questions.iter().enumerate() {
        let ordinal = idx + 1;
        if question.user_selected().is_none() {
            debug!("[Review] Question {} was never answered.", ordinal);
        }
        table.rows.push(ReviewRow {
            ordinal,
            prompt_text: question.prompt_text(),
            user_answer: question.selected_option().unwrap_or("-").to_string(),
            correct_answer: question.correct_option().to_string(),
            is_correct: question.is_correct(),
        });
        table.details.push(ReviewDetail {
            ordinal,
            prompt: question.prompt().to_string(),
            image: question.image().map(str::to_string),
            options: question
                .options()
                .iter()
                .zip(option_tags(question))
                .map(|(text, tag)| TaggedOption {
                    text: text.clone(),
                    tag,
                })
                .collect(),
        });
    }

    table
}

/// Qualitative verdict on a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    VeryGood,
    KeepItUp,
    TryHarder,
}

impl Band {
    pub fn from_accuracy(accuracy: u8) -> Self {
        match accuracy {
            80..=u8::MAX => Band::VeryGood,
            50..=79 => Band::KeepItUp,
            _ => Band::TryHarder,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Band::VeryGood => "Very good!",
            Band::KeepItUp => "Keep it up!",
            Band::TryHarder => "Try harder!",
        }
    }

    pub fn asset_key(self) -> &'static str {
        match self {
            Band::VeryGood => "images/very_good.gif",
            Band::KeepItUp => "images/keep_it_up.gif",
            Band::TryHarder => "images/try_harder.gif",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub stats: Stats,
    pub band: Band,
    pub review: ReviewTable,
}
