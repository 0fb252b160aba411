//! Trainer error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Illegal move '{0}'")]
    IllegalMove(String),

    #[error("Puzzle {0} has no solution moves")]
    EmptySolution(String),

    #[error("Puzzle {0} does not match any position in its game history")]
    PuzzleAlignment(String),

    #[error("Puzzle fetch failed: {0}")]
    Fetch(String),

    #[error("A puzzle fetch is already in progress")]
    FetchInProgress,

    #[error("No puzzle is active")]
    NoActivePuzzle,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
