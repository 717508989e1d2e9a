use crate::libsansuu::session::SessionState;
use std::io;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QuizError {
    #[error("grade {0:?} is not in the question bank")]
    UnknownGrade(String),
    #[error("the question pool is empty")]
    EmptyPool,
    #[error("no option selected")]
    NoSelection,
    #[error("option {index} does not exist, the question only has {len} options")]
    NoSuchOption { index: usize, len: usize },
    #[error("`{operation}` is not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
    #[error("index {index} is out of range for {len} questions")]
    OutOfRange { index: usize, len: usize },
    #[error("no session in progress, select a grade first")]
    NoSession,
}

#[derive(Debug, Error)]
pub enum BankError {
    #[error("cannot read question bank")]
    Read(#[from] io::Error),
    #[error("malformed question bank: {0}")]
    Parse(#[from] serde_json::Error),
}
