#![allow(dead_code)]

use std::sync::Arc;

use trainer_core::puzzle::Puzzle;
use trainer_core::storage::{KeyValueStore, MemoryStore};

/// Fresh in-memory store for one test.
pub fn store() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
}

fn moves(line: &[&str]) -> Vec<String> {
    line.iter().map(|m| m.to_string()).collect()
}

/// White solves with Nf3 after 1.e4 e5; the recorded reply is Nc6.
pub fn nf3_puzzle() -> Puzzle {
    Puzzle {
        id: "nf3".into(),
        fen: "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".into(),
        moves: moves(&["e5", "Nf3", "Nc6"]),
        all_moves: moves(&["e4", "e5", "Nf3", "Nc6", "Bb5"]),
        rating: 1010,
        tags: vec!["opening".into()],
        game_link: None,
    }
}

/// Black to solve, two solver moves deep. Solution given in UCI as the
/// puzzle service sends it.
pub fn black_two_step_puzzle() -> Puzzle {
    Puzzle {
        id: "black2".into(),
        fen: "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2".into(),
        moves: moves(&["g1f3", "b8c6", "f1b5", "a7a6"]),
        all_moves: moves(&["e4", "e5", "Nf3", "Nc6", "Bb5", "a6", "Ba4"]),
        rating: 1020,
        tags: vec![],
        game_link: Some("https://lichess.org/abcdefgh".into()),
    }
}

/// Scholar's mate: the only solver move mates.
pub fn mate_puzzle() -> Puzzle {
    Puzzle {
        id: "mate".into(),
        fen: "r1bqkbnr/pppp1ppp/2n5/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 3 3".into(),
        moves: moves(&["Nf6", "Qxf7#"]),
        all_moves: moves(&["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6", "Qxf7#"]),
        rating: 990,
        tags: vec!["mateIn1".into()],
        game_link: None,
    }
}

/// Recorded line continues quietly with Qe2, but Qxf7# mates at once.
pub fn mate_shortcut_puzzle() -> Puzzle {
    Puzzle {
        id: "shortcut".into(),
        fen: "r1bqkbnr/pppp1ppp/2n5/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 3 3".into(),
        moves: moves(&["Nf6", "Qe2", "d6", "Qd1"]),
        all_moves: moves(&["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6", "Qe2", "d6", "Qd1"]),
        rating: 1000,
        tags: vec![],
        game_link: None,
    }
}
