use crate::libsansuu::error::{BankError, QuizError};
use crate::libsansuu::shitsumon::{QuestionRecord, RecordProblem};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

pub const DEFAULT_BANK_PATH: &str = "data/question_bank.json";

#[derive(Serialize, Deserialize, Debug, Clone)]
struct QuestionJson {
    question: String,
    options: Vec<String>,
    correct: i64,
    #[serde(default)]
    topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

impl From<&QuestionRecord> for QuestionJson {
    fn from(record: &QuestionRecord) -> Self {
        QuestionJson {
            question: record.prompt().to_string(),
            options: record.options().to_vec(),
            correct: record.correct_index() as i64,
            topic: record.topic().to_string(),
            image: record.image().map(str::to_string),
        }
    }
}

/// A record that was dropped while loading a bank.
#[derive(Debug, PartialEq)]
pub struct Rejected {
    pub grade: String,
    /// 0-based position within the grade's array.
    pub position: usize,
    pub problem: RecordProblem,
}

/// Questions per grade. Read-only once loaded; sessions draw copies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionBank {
    grades: BTreeMap<String, Vec<QuestionRecord>>,
}

impl QuestionBank {
    /// Parses a bank document, keeping every valid record and reporting the
    /// rest instead of failing the whole document.
    pub fn parse_checked(json: &str) -> Result<(Self, Vec<Rejected>), BankError> {
        let raw: BTreeMap<String, Vec<QuestionJson>> = serde_json::from_str(json)?;
        let mut rejected = Vec::new();
        let mut grades = BTreeMap::new();

        for (grade, questions) in raw {
            let mut records = Vec::with_capacity(questions.len());
            for (position, q) in questions.into_iter().enumerate() {
                match QuestionRecord::new(q.question, q.options, q.correct, q.topic) {
                    Ok(record) => records.push(record.with_image(q.image)),
                    Err(problem) => rejected.push(Rejected {
                        grade: grade.clone(),
                        position,
                        problem,
                    }),
                }
            }
            grades.insert(grade, records);
        }

        Ok((Self { grades }, rejected))
    }

    pub fn from_json_str(json: &str) -> Result<Self, BankError> {
        let (bank, rejected) = Self::parse_checked(json)?;
        for r in &rejected {
            warn!(
                "[Bank] Skipping grade {} question #{}: {}",
                r.grade,
                r.position + 1,
                r.problem
            );
        }
        Ok(bank)
    }

    pub fn load(path: &Path) -> Result<Self, BankError> {
        let now = Instant::now();
        let json = std::fs::read_to_string(path)?;
        let bank = Self::from_json_str(&json)?;
        debug!(
            "[Bank] Loading {:?} took {} ms.",
            path,
            now.elapsed().as_millis()
        );
        Ok(bank)
    }

    /// Never fails: any read or parse error is logged and the built-in bank
    /// is used instead.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(bank) => {
                info!(
                    "[Bank] Loaded {} questions in {} grades from {:?}",
                    bank.question_count(),
                    bank.grades.len(),
                    path
                );
                bank
            }
            Err(err) => {
                error!("[Bank] Error loading questions from {:?}: {}", path, err);
                warn!("[Bank] Falling back to the built-in question bank.");
                Self::builtin()
            }
        }
    }

    pub fn builtin() -> Self {
        macro_rules! question {
            ($prompt:expr, [$($opt:expr),+], $correct:expr, $topic:expr) => {
                QuestionRecord::new($prompt, vec![$($opt.to_string()),+], $correct, $topic)
                    .expect("built-in question is valid")
            };
        }

        let mut grades = BTreeMap::new();
        grades.insert(
            "3".to_string(),
            vec![
                question!("What is 7 + 5?", ["10", "11", "12", "13"], 2, "addition"),
                question!("What is 15 - 8?", ["6", "7", "8", "9"], 1, "subtraction"),
            ],
        );
        grades.insert(
            "4".to_string(),
            vec![question!("What is 24 ÷ 6?", ["3", "4", "5", "6"], 1, "division")],
        );
        Self { grades }
    }

    /// Grade keys, numeric keys in numeric order ahead of any others.
    pub fn grades(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.grades.keys().map(String::as_str).collect();
        keys.sort_by_key(|k| (k.parse::<u64>().unwrap_or(u64::MAX), *k));
        keys
    }

    pub fn pool(&self, grade: &str) -> Result<&[QuestionRecord], QuizError> {
        self.grades
            .get(grade)
            .map(Vec::as_slice)
            .ok_or_else(|| QuizError::UnknownGrade(grade.to_string()))
    }

    pub fn question_count(&self) -> usize {
        self.grades.values().map(Vec::len).sum()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        let raw: BTreeMap<&str, Vec<QuestionJson>> = self
            .grades
            .iter()
            .map(|(grade, qs)| (grade.as_str(), qs.iter().map(QuestionJson::from).collect()))
            .collect();
        serde_json::to_string_pretty(&raw)
    }
}
