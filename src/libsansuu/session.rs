use crate::libsansuu::bank::QuestionBank;
use crate::libsansuu::error::QuizError;
use crate::libsansuu::review::{
    build_review, option_tags, Band, Completion, OptionTag, ReviewTable,
};
use crate::libsansuu::shitsumon::QuestionRecord;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// How many questions a session should ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuestionCount {
    #[default]
    All,
    /// Always at least 1.
    Limit(usize),
}

impl QuestionCount {
    /// Non-positive requests mean "all available".
    pub fn from_requested(requested: i64) -> Self {
        if requested <= 0 {
            QuestionCount::All
        } else {
            QuestionCount::Limit(usize::try_from(requested).unwrap_or(usize::MAX))
        }
    }

    pub fn effective(self, pool_len: usize) -> usize {
        match self {
            QuestionCount::All => pool_len,
            QuestionCount::Limit(n) => n.max(1).min(pool_len),
        }
    }
}

impl FromStr for QuestionCount {
    type Err = Infallible;

    /// Anything that is not a positive integer reads as "all".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<i64>() {
            Ok(n) => QuestionCount::from_requested(n),
            Err(_) => QuestionCount::All,
        })
    }
}

impl fmt::Display for QuestionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionCount::All => write!(f, "all"),
            QuestionCount::Limit(n) => write!(f, "{n}"),
        }
    }
}

/// Draws `count` questions from `pool` without repeats, in random order. The
/// returned records are copies, so answering them leaves the pool untouched.
pub fn build_session<R: Rng>(
    pool: &[QuestionRecord],
    count: QuestionCount,
    rng: &mut R,
) -> Result<Vec<QuestionRecord>, QuizError> {
    if pool.is_empty() {
        return Err(QuizError::EmptyPool);
    }
    let wanted = count.effective(pool.len());
    debug!(
        "[Setup] Drawing {} of {} questions (requested {}).",
        wanted,
        pool.len(),
        count
    );

    let mut remaining: Vec<&QuestionRecord> = pool.iter().collect();
    let mut picked = Vec::with_capacity(wanted);
    while picked.len() < wanted {
        let idx = rng.random_range(0..remaining.len());
        picked.push(remaining.remove(idx).clone());
    }

    Ok(picked)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingSelection,
    AnswerRecorded,
    Complete,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::AwaitingSelection => "awaiting an answer",
            SessionState::AnswerRecorded => "the answer is already recorded",
            SessionState::Complete => "the session is complete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub answered: usize,
    pub correct: usize,
    /// Rounded half up, 0 when nothing is answered yet.
    pub accuracy: u8,
}

impl Stats {
    pub fn new(answered: usize, correct: usize) -> Self {
        let accuracy = if answered == 0 {
            0
        } else {
            ((200 * correct + answered) / (2 * answered)).min(100) as u8
        };
        Stats {
            answered,
            correct,
            accuracy,
        }
    }
}

/// What the user sees right after submitting.
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub is_correct: bool,
    pub selected: usize,
    pub correct_index: usize,
    pub correct_answer: String,
    pub tags: Vec<OptionTag>,
}

/// Everything needed to draw the active question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuestionView<'a> {
    /// 1-based.
    pub number: usize,
    pub total: usize,
    pub grade: &'a str,
    pub prompt: &'a str,
    pub options: &'a [String],
    pub image: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Session {
    grade: String,
    requested: QuestionCount,
    questions: Vec<QuestionRecord>,
    position: usize,
    pending: Option<usize>,
    answered: usize,
    correct: usize,
}

impl Session {
    pub fn start<R: Rng>(
        grade: &str,
        pool: &[QuestionRecord],
        requested: QuestionCount,
        rng: &mut R,
    ) -> Result<Self, QuizError> {
        let questions = build_session(pool, requested, rng)?;
        info!(
            "[Session] Grade {} started with {} questions.",
            grade,
            questions.len()
        );
        Ok(Session {
            grade: grade.to_string(),
            requested,
            questions,
            position: 0,
            pending: None,
            answered: 0,
            correct: 0,
        })
    }

    pub fn state(&self) -> SessionState {
        match self.questions.get(self.position) {
            None => SessionState::Complete,
            Some(q) if q.user_selected().is_some() => SessionState::AnswerRecorded,
            Some(_) => SessionState::AwaitingSelection,
        }
    }

    fn expect_state(
        &self,
        operation: &'static str,
        wanted: SessionState,
    ) -> Result<(), QuizError> {
        let state = self.state();
        if state == wanted {
            Ok(())
        } else {
            Err(QuizError::InvalidState { operation, state })
        }
    }

    /// Overwrites any earlier pending choice for the current question.
    pub fn select_option(&mut self, index: usize) -> Result<(), QuizError> {
        self.expect_state("select_option", SessionState::AwaitingSelection)?;
        let len = self.questions[self.position].options().len();
        if index >= len {
            return Err(QuizError::NoSuchOption { index, len });
        }
        debug!(
            "[Session] Pending choice {} for question {}.",
            index,
            self.position + 1
        );
        self.pending = Some(index);
        Ok(())
    }

    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    pub fn submit(&mut self) -> Result<Feedback, QuizError> {
        self.expect_state("submit", SessionState::AwaitingSelection)?;
        let selected = self.pending.ok_or(QuizError::NoSelection)?;

        let question = &mut self.questions[self.position];
        question.record_answer(selected);
        let is_correct = selected == question.correct_index();
        self.answered += 1;
        if is_correct {
            self.correct += 1;
        }
        debug!(
            "[Session] Question {} answered with {} ({}).",
            self.position + 1,
            selected,
            if is_correct { "correct" } else { "incorrect" }
        );

        Ok(Feedback {
            is_correct,
            selected,
            correct_index: question.correct_index(),
            correct_answer: question.correct_option().to_string(),
            tags: option_tags(question),
        })
    }

    pub fn advance(&mut self) -> Result<SessionState, QuizError> {
        self.expect_state("advance", SessionState::AnswerRecorded)?;
        self.position += 1;
        self.pending = None;
        let state = self.state();
        if state == SessionState::Complete {
            info!(
                "[Session] Grade {} complete: {}/{} correct.",
                self.grade, self.correct, self.answered
            );
        }
        Ok(state)
    }

    pub fn current_question(&self) -> Result<&QuestionRecord, QuizError> {
        self.questions.get(self.position).ok_or(QuizError::OutOfRange {
            index: self.position,
            len: self.questions.len(),
        })
    }

    pub fn current_view(&self) -> Result<QuestionView<'_>, QuizError> {
        let question = self.current_question()?;
        Ok(QuestionView {
            number: self.position + 1,
            total: self.questions.len(),
            grade: &self.grade,
            prompt: question.prompt(),
            options: question.options(),
            image: question.image(),
        })
    }

    pub fn stats(&self) -> Stats {
        Stats::new(self.answered, self.correct)
    }

    pub fn grade(&self) -> &str {
        &self.grade
    }
    pub fn requested(&self) -> QuestionCount {
        self.requested
    }
    pub fn position(&self) -> usize {
        self.position
    }
    pub fn len(&self) -> usize {
        self.questions.len()
    }
    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn review(&self) -> Result<ReviewTable, QuizError> {
        self.expect_state("review", SessionState::Complete)?;
        Ok(build_review(&self.questions))
    }

    pub fn completion(&self) -> Result<Completion, QuizError> {
        let review = self.review()?;
        let stats = self.stats();
        Ok(Completion {
            stats,
            band: Band::from_accuracy(stats.accuracy),
            review,
        })
    }
}

/// Owns the question bank and the one live session. A new grade selection
/// replaces the session; a failed one leaves it as it was.
pub struct Quiz {
    bank: QuestionBank,
    session: Option<Session>,
    rng: StdRng,
}

impl Quiz {
    pub fn new(bank: QuestionBank) -> Self {
        Self::with_rng(bank, StdRng::from_os_rng())
    }

    pub fn with_seed(bank: QuestionBank, seed: u64) -> Self {
        Self::with_rng(bank, StdRng::seed_from_u64(seed))
    }

    fn with_rng(bank: QuestionBank, rng: StdRng) -> Self {
        Quiz {
            bank,
            session: None,
            rng,
        }
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn select_grade(
        &mut self,
        grade: &str,
        count: QuestionCount,
    ) -> Result<&Session, QuizError> {
        let pool = self.bank.pool(grade)?;
        let session = Session::start(grade, pool, count, &mut self.rng)?;
        Ok(self.session.insert(session))
    }

    pub fn session(&self) -> Result<&Session, QuizError> {
        self.session.as_ref().ok_or(QuizError::NoSession)
    }

    fn session_mut(&mut self) -> Result<&mut Session, QuizError> {
        self.session.as_mut().ok_or(QuizError::NoSession)
    }

    pub fn select_option(&mut self, index: usize) -> Result<(), QuizError> {
        self.session_mut()?.select_option(index)
    }

    pub fn submit(&mut self) -> Result<Feedback, QuizError> {
        self.session_mut()?.submit()
    }

    pub fn advance(&mut self) -> Result<SessionState, QuizError> {
        self.session_mut()?.advance()
    }

    pub fn current_question(&self) -> Result<&QuestionRecord, QuizError> {
        self.session()?.current_question()
    }

    /// Zeroes before any grade is selected.
    pub fn stats(&self) -> Stats {
        self.session
            .as_ref()
            .map(Session::stats)
            .unwrap_or_default()
    }

    pub fn completion(&self) -> Result<Completion, QuizError> {
        self.session()?.completion()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn question(prompt: &str, options: &[&str], correct: i64) -> QuestionRecord {
        QuestionRecord::new(
            prompt,
            options.iter().map(|o| o.to_string()).collect(),
            correct,
            "arithmetic",
        )
        .unwrap()
    }

    fn two_question_pool() -> Vec<QuestionRecord> {
        vec![
            question("7+5", &["10", "11", "12", "13"], 2),
            question("15-8", &["6", "7", "8", "9"], 1),
        ]
    }

    fn numbered_pool(n: usize) -> Vec<QuestionRecord> {
        (0..n)
            .map(|i| question(&format!("Q{i}"), &["a", "b", "c"], (i % 3) as i64))
            .collect()
    }

    fn answer_current(session: &mut Session, correctly: bool) -> Feedback {
        let q = session.current_question().unwrap();
        let idx = if correctly {
            q.correct_index()
        } else {
            (q.correct_index() + 1) % q.options().len()
        };
        session.select_option(idx).unwrap();
        session.submit().unwrap()
    }

    #[test]
    fn question_count_parsing() {
        assert_eq!("all".parse::<QuestionCount>(), Ok(QuestionCount::All));
        assert_eq!("".parse::<QuestionCount>(), Ok(QuestionCount::All));
        assert_eq!("ten".parse::<QuestionCount>(), Ok(QuestionCount::All));
        assert_eq!("0".parse::<QuestionCount>(), Ok(QuestionCount::All));
        assert_eq!("-3".parse::<QuestionCount>(), Ok(QuestionCount::All));
        assert_eq!(" 5 ".parse::<QuestionCount>(), Ok(QuestionCount::Limit(5)));
        assert_eq!(QuestionCount::Limit(5).to_string(), "5");
        assert_eq!(QuestionCount::All.to_string(), "all");
    }

    #[test]
    fn effective_count_is_clamped_to_pool() {
        assert_eq!(QuestionCount::All.effective(7), 7);
        assert_eq!(QuestionCount::Limit(3).effective(7), 3);
        assert_eq!(QuestionCount::Limit(10).effective(3), 3);
        assert_eq!(QuestionCount::Limit(usize::MAX).effective(3), 3);
    }

    #[test]
    fn build_length_matches_request() {
        let pool = numbered_pool(6);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for c in 1..=8 {
                let built = build_session(&pool, QuestionCount::Limit(c), &mut rng).unwrap();
                assert_eq!(built.len(), c.min(pool.len()));
            }
            let all = build_session(&pool, QuestionCount::All, &mut rng).unwrap();
            assert_eq!(all.len(), pool.len());
        }
    }

    #[test]
    fn build_never_repeats() {
        let pool = numbered_pool(12);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let built = build_session(&pool, QuestionCount::Limit(9), &mut rng).unwrap();
            let prompts: HashSet<&str> = built.iter().map(|q| q.prompt()).collect();
            assert_eq!(prompts.len(), built.len());
        }
    }

    #[test]
    fn build_reaches_every_ordering() {
        let pool = numbered_pool(3);
        let mut orders = HashSet::new();
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let built = build_session(&pool, QuestionCount::All, &mut rng).unwrap();
            orders.insert(
                built
                    .iter()
                    .map(|q| q.prompt().to_string())
                    .collect::<Vec<_>>(),
            );
        }
        assert_eq!(orders.len(), 6);
    }

    #[test]
    fn build_rejects_empty_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            build_session(&[], QuestionCount::All, &mut rng),
            Err(QuizError::EmptyPool)
        );
    }

    #[test]
    fn answering_does_not_touch_the_pool() {
        let pool = two_question_pool();
        let mut rng = StdRng::seed_from_u64(3);
        let mut session = Session::start("3", &pool, QuestionCount::All, &mut rng).unwrap();
        answer_current(&mut session, true);
        assert!(pool.iter().all(|q| q.user_selected().is_none()));
    }

    #[test]
    fn two_question_scenario() {
        let pool = two_question_pool();
        let mut rng = StdRng::seed_from_u64(42);
        let mut session = Session::start("3", &pool, QuestionCount::Limit(2), &mut rng).unwrap();
        assert_eq!(session.len(), 2);
        assert_ne!(session.questions()[0].prompt(), session.questions()[1].prompt());
        assert_eq!(session.state(), SessionState::AwaitingSelection);

        let first = answer_current(&mut session, true);
        assert!(first.is_correct);
        assert_eq!(session.state(), SessionState::AnswerRecorded);
        assert_eq!(session.advance(), Ok(SessionState::AwaitingSelection));

        let second = answer_current(&mut session, false);
        assert!(!second.is_correct);
        assert_eq!(session.advance(), Ok(SessionState::Complete));

        assert_eq!(
            session.stats(),
            Stats {
                answered: 2,
                correct: 1,
                accuracy: 50
            }
        );
    }

    #[test]
    fn oversized_request_uses_whole_pool() {
        let pool = numbered_pool(3);
        let mut rng = StdRng::seed_from_u64(9);
        let session = Session::start("5", &pool, QuestionCount::Limit(10), &mut rng).unwrap();
        assert_eq!(session.len(), 3);
        assert_eq!(session.requested(), QuestionCount::Limit(10));
    }

    #[test]
    fn submit_without_selection() {
        let pool = two_question_pool();
        let mut rng = StdRng::seed_from_u64(0);
        let mut session = Session::start("3", &pool, QuestionCount::All, &mut rng).unwrap();
        assert_eq!(session.submit(), Err(QuizError::NoSelection));
        assert_eq!(session.state(), SessionState::AwaitingSelection);
        assert_eq!(session.stats(), Stats::default());
    }

    #[test]
    fn reselecting_overwrites_pending_choice() {
        let pool = two_question_pool();
        let mut rng = StdRng::seed_from_u64(0);
        let mut session = Session::start("3", &pool, QuestionCount::All, &mut rng).unwrap();
        let correct = session.current_question().unwrap().correct_index();
        session.select_option((correct + 1) % 4).unwrap();
        session.select_option(correct).unwrap();
        assert_eq!(session.pending(), Some(correct));
        assert!(session.submit().unwrap().is_correct);
        assert_eq!(session.stats().correct, 1);
    }

    #[test]
    fn selecting_missing_option_is_rejected() {
        let pool = two_question_pool();
        let mut rng = StdRng::seed_from_u64(0);
        let mut session = Session::start("3", &pool, QuestionCount::All, &mut rng).unwrap();
        assert_eq!(
            session.select_option(4),
            Err(QuizError::NoSuchOption { index: 4, len: 4 })
        );
        assert_eq!(session.pending(), None);
    }

    #[test]
    fn double_submit_is_invalid() {
        let pool = two_question_pool();
        let mut rng = StdRng::seed_from_u64(0);
        let mut session = Session::start("3", &pool, QuestionCount::All, &mut rng).unwrap();
        answer_current(&mut session, true);
        assert_eq!(
            session.submit(),
            Err(QuizError::InvalidState {
                operation: "submit",
                state: SessionState::AnswerRecorded
            })
        );
        assert!(matches!(
            session.select_option(0),
            Err(QuizError::InvalidState { .. })
        ));
        assert_eq!(session.stats().answered, 1);
    }

    #[test]
    fn advance_before_submit_is_invalid() {
        let pool = two_question_pool();
        let mut rng = StdRng::seed_from_u64(0);
        let mut session = Session::start("3", &pool, QuestionCount::All, &mut rng).unwrap();
        session.select_option(0).unwrap();
        assert_eq!(
            session.advance(),
            Err(QuizError::InvalidState {
                operation: "advance",
                state: SessionState::AwaitingSelection
            })
        );
        assert_eq!(session.position(), 0);
    }

    #[test]
    fn pending_choice_resets_on_advance() {
        let pool = two_question_pool();
        let mut rng = StdRng::seed_from_u64(0);
        let mut session = Session::start("3", &pool, QuestionCount::All, &mut rng).unwrap();
        answer_current(&mut session, true);
        session.advance().unwrap();
        assert_eq!(session.pending(), None);
        assert_eq!(session.submit(), Err(QuizError::NoSelection));
    }

    #[test]
    fn complete_session_rejects_question_operations() {
        let pool = numbered_pool(1);
        let mut rng = StdRng::seed_from_u64(0);
        let mut session = Session::start("3", &pool, QuestionCount::All, &mut rng).unwrap();
        answer_current(&mut session, false);
        session.advance().unwrap();

        assert_eq!(
            session.current_question(),
            Err(QuizError::OutOfRange { index: 1, len: 1 })
        );
        assert!(matches!(session.current_view(), Err(QuizError::OutOfRange { .. })));
        assert!(matches!(session.advance(), Err(QuizError::InvalidState { .. })));
        assert!(matches!(session.submit(), Err(QuizError::InvalidState { .. })));
    }

    #[test]
    fn review_only_after_completion() {
        let pool = two_question_pool();
        let mut rng = StdRng::seed_from_u64(0);
        let mut session = Session::start("3", &pool, QuestionCount::All, &mut rng).unwrap();
        assert!(matches!(session.completion(), Err(QuizError::InvalidState { .. })));
        for _ in 0..2 {
            answer_current(&mut session, true);
            session.advance().unwrap();
        }
        let completion = session.completion().unwrap();
        assert_eq!(completion.stats.accuracy, 100);
        assert_eq!(completion.band, Band::VeryGood);
        assert_eq!(completion.review.len(), 2);
    }

    #[test]
    fn full_traversal_answers_everything() {
        let pool = numbered_pool(7);
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut session =
                Session::start("6", &pool, QuestionCount::Limit(5), &mut rng).unwrap();
            let mut i = 0;
            while session.state() != SessionState::Complete {
                answer_current(&mut session, (i + seed as usize) % 3 == 0);
                session.advance().unwrap();
                i += 1;
            }
            let stats = session.stats();
            assert_eq!(stats.answered, session.len());
            assert!(stats.correct <= stats.answered);
            assert!(stats.accuracy <= 100);
        }
    }

    #[test]
    fn accuracy_rounds_half_up() {
        assert_eq!(Stats::new(0, 0).accuracy, 0);
        assert_eq!(Stats::new(3, 2).accuracy, 67);
        assert_eq!(Stats::new(3, 1).accuracy, 33);
        assert_eq!(Stats::new(8, 1).accuracy, 13);
        assert_eq!(Stats::new(200, 1).accuracy, 1);
        assert_eq!(Stats::new(4, 4).accuracy, 100);
    }

    #[test]
    fn quiz_unknown_grade_keeps_current_session() {
        let mut quiz = Quiz::with_seed(QuestionBank::builtin(), 7);
        assert_eq!(quiz.submit(), Err(QuizError::NoSession));
        assert_eq!(quiz.stats(), Stats::default());

        quiz.select_grade("4", QuestionCount::All).unwrap();
        assert_eq!(
            quiz.select_grade("9", QuestionCount::All).err(),
            Some(QuizError::UnknownGrade("9".to_string()))
        );
        assert_eq!(quiz.session().unwrap().grade(), "4");
    }

    #[test]
    fn quiz_empty_grade_is_rejected() {
        let bank = QuestionBank::from_json_str(r#"{"3": []}"#).unwrap();
        let mut quiz = Quiz::with_seed(bank, 7);
        assert_eq!(
            quiz.select_grade("3", QuestionCount::All).err(),
            Some(QuizError::EmptyPool)
        );
        assert_eq!(quiz.session().err(), Some(QuizError::NoSession));
    }

    #[test]
    fn quiz_new_grade_replaces_session() {
        let mut quiz = Quiz::with_seed(QuestionBank::builtin(), 7);
        quiz.select_grade("3", QuestionCount::All).unwrap();
        quiz.select_option(0).unwrap();
        quiz.submit().unwrap();
        assert_eq!(quiz.stats().answered, 1);

        let session = quiz.select_grade("4", QuestionCount::Limit(5)).unwrap();
        assert_eq!(session.len(), 1);
        assert_eq!(quiz.stats(), Stats::default());
        assert_eq!(quiz.current_question().unwrap().prompt(), "What is 24 ÷ 6?");
    }

    #[test]
    fn same_seed_same_order() {
        let bank = QuestionBank::from_json_str(
            r#"{"1": [
                {"question": "a", "options": ["x", "y"], "correct": 0},
                {"question": "b", "options": ["x", "y"], "correct": 0},
                {"question": "c", "options": ["x", "y"], "correct": 0},
                {"question": "d", "options": ["x", "y"], "correct": 0}
            ]}"#,
        )
        .unwrap();
        let order = |seed| {
            let mut quiz = Quiz::with_seed(bank.clone(), seed);
            let session = quiz.select_grade("1", QuestionCount::All).unwrap();
            let prompts: Vec<String> = session
                .questions()
                .iter()
                .map(|q| q.prompt().to_string())
                .collect();
            prompts
        };
        assert_eq!(order(11), order(11));
    }
}
