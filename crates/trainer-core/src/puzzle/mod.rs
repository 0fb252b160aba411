/// Puzzle data model, alignment, and the visualization session

pub mod session;
pub mod setup;

use serde::{Deserialize, Serialize};

/// A tactic with the game it was taken from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Puzzle {
    /// Puzzle identifier
    pub id: String,
    /// Position before the opponent's move that sets up the tactic
    pub fen: String,
    /// [opponent_move, solver_move_1, opp_response_1, ...] in SAN or UCI
    pub moves: Vec<String>,
    /// Every move of the source game, from the standard start, in SAN
    pub all_moves: Vec<String>,
    pub rating: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_link: Option<String>,
}

/// A position where one of two candidate moves is a blunder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlunderPuzzle {
    pub id: String,
    pub fen: String,
    /// Engine's best move, SAN
    pub best_move: String,
    /// The move actually played, SAN
    pub blunder: String,
    pub centipawns_lost: u32,
}

/// Request body for a tactic fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleFetchOptions {
    pub rating_gte: u32,
    pub rating_lte: u32,
    pub max_ply: u32,
}

/// Request body for a blunder puzzle fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlunderFetchOptions {
    pub centipawn_loss_min: u32,
    pub centipawn_loss_max: u32,
    pub limit: u32,
}

/// Named rating presets offered for the free-mode rating range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PuzzleDifficulty {
    Beginner,
    Intermediate,
    Expert,
    Magnus,
}

impl PuzzleDifficulty {
    pub const ALL: [PuzzleDifficulty; 4] = [
        PuzzleDifficulty::Beginner,
        PuzzleDifficulty::Intermediate,
        PuzzleDifficulty::Expert,
        PuzzleDifficulty::Magnus,
    ];

    pub fn rating(self) -> u32 {
        match self {
            PuzzleDifficulty::Beginner => 0,
            PuzzleDifficulty::Intermediate => 1500,
            PuzzleDifficulty::Expert => 2000,
            PuzzleDifficulty::Magnus => 2500,
        }
    }

    /// Highest preset at or below `rating`.
    pub fn for_rating(rating: u32) -> Self {
        Self::ALL
            .into_iter()
            .rev()
            .find(|d| d.rating() <= rating)
            .unwrap_or(PuzzleDifficulty::Beginner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    Success,
    Error,
}

/// Inline feedback shown under the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressMessage {
    pub message: String,
    pub kind: ProgressKind,
}

impl ProgressMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ProgressKind::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ProgressKind::Error,
        }
    }
}
