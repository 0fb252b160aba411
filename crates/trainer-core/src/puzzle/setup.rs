/// Aligning a puzzle with its source game
///
/// A puzzle only carries the position before the opponent's setup move. To
/// show the player the board a few plies earlier, the game history is replayed
/// until its placement matches the puzzle, and the moves in between become the
/// hidden moves the player has to visualize.

use shakmaty::Color;
use tracing::{debug, warn};

use crate::error::TrainerError;
use crate::position::{placement_field, GamePosition, TrainingMove};

use super::Puzzle;

/// Everything a session needs to present one puzzle
#[derive(Debug, Clone)]
pub struct PuzzleSetup {
    /// Board the player sees: `hidden_moves` plies before the solving position
    pub current: GamePosition,
    /// Position after the opponent's setup move, where the solution starts
    pub future: GamePosition,
    /// Moves leading from `current` to `future`, oldest first
    pub hidden_moves: Vec<TrainingMove>,
    /// Solver moves interleaved with replies
    pub solution_moves: Vec<TrainingMove>,
    /// Board shown from Black's side
    pub flipped: bool,
}

/// Align `puzzle` against its game history and hide the last `hidden_move_count` plies.
pub fn setup_for_puzzle(
    puzzle: &Puzzle,
    hidden_move_count: usize,
) -> Result<PuzzleSetup, TrainerError> {
    let first_move = puzzle
        .moves
        .first()
        .ok_or_else(|| TrainerError::EmptySolution(puzzle.id.clone()))?;
    let target = placement_field(&puzzle.fen);

    let mut current = GamePosition::default();
    let mut future = GamePosition::default();

    for (ply, san) in puzzle.all_moves.iter().enumerate() {
        current.play_notation(san)?;
        future.play_notation(san)?;
        if current.board_fen() != target {
            continue;
        }

        debug!(puzzle_id = %puzzle.id, ply = ply + 1, "Puzzle aligned with game history");
        future.play_notation(first_move)?;
        current.play_notation(first_move)?;

        let history = current.history();
        let hidden_moves = history[history.len().saturating_sub(hidden_move_count)..].to_vec();

        let solution_moves = replay_solution(&future, &puzzle.moves)?;

        for _ in 0..hidden_move_count {
            current.undo();
        }

        let flipped = future.turn() == Color::Black;
        return Ok(PuzzleSetup {
            current,
            future,
            hidden_moves,
            solution_moves,
            flipped,
        });
    }

    warn!(puzzle_id = %puzzle.id, fen = %puzzle.fen, "Puzzle position never reached in game history");
    Err(TrainerError::PuzzleAlignment(puzzle.id.clone()))
}

/// Replay the whole solution from just before the setup move so every SAN is
/// computed in its real position, then drop the setup move itself.
fn replay_solution(
    future: &GamePosition,
    moves: &[String],
) -> Result<Vec<TrainingMove>, TrainerError> {
    let mut board = future.clone();
    board.undo();
    for mv in moves {
        board.play_notation(mv)?;
    }
    let history = board.history();
    let keep = moves.len().saturating_sub(1);
    Ok(history[history.len().saturating_sub(keep)..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Square;

    fn scholars_mate() -> Puzzle {
        Puzzle {
            id: "scholar".into(),
            fen: "r1bqkbnr/pppp1ppp/2n5/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 3 3".into(),
            moves: vec!["Nf6".into(), "Qxf7#".into()],
            all_moves: ["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6", "Qxf7#"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rating: 600,
            tags: vec![],
            game_link: None,
        }
    }

    #[test]
    fn test_hidden_moves_are_last_plies() {
        let setup = setup_for_puzzle(&scholars_mate(), 2).unwrap();
        let hidden: Vec<&str> = setup.hidden_moves.iter().map(|m| m.san.as_str()).collect();
        assert_eq!(hidden, vec!["Qh5", "Nf6"]);
        assert_eq!(setup.current.history().len(), 4);
        assert_eq!(setup.future.history().len(), 6);
        assert!(!setup.flipped);
    }

    #[test]
    fn test_solution_drops_setup_move() {
        let setup = setup_for_puzzle(&scholars_mate(), 1).unwrap();
        assert_eq!(setup.solution_moves.len(), 1);
        assert_eq!(setup.solution_moves[0].san, "Qxf7#");
        assert_eq!(setup.solution_moves[0].to, Square::F7);
    }

    #[test]
    fn test_uci_solution_moves() {
        let mut puzzle = scholars_mate();
        puzzle.moves = vec!["g8f6".into(), "h5f7".into()];
        let setup = setup_for_puzzle(&puzzle, 1).unwrap();
        assert_eq!(setup.solution_moves[0].san, "Qxf7#");
    }

    #[test]
    fn test_black_to_solve_flips_board() {
        let puzzle = Puzzle {
            id: "black".into(),
            fen: "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2".into(),
            moves: vec!["Nf3".into(), "Nc6".into(), "Bb5".into()],
            all_moves: ["e4", "e5", "Nf3", "Nc6", "Bb5"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rating: 800,
            tags: vec![],
            game_link: None,
        };
        let setup = setup_for_puzzle(&puzzle, 1).unwrap();
        assert!(setup.flipped);
        let sans: Vec<&str> = setup.solution_moves.iter().map(|m| m.san.as_str()).collect();
        assert_eq!(sans, vec!["Nc6", "Bb5"]);
    }

    #[test]
    fn test_misaligned_puzzle_is_an_error() {
        let mut puzzle = scholars_mate();
        puzzle.fen = "8/8/8/8/8/8/8/K6k w - - 0 1".into();
        assert!(matches!(
            setup_for_puzzle(&puzzle, 2),
            Err(TrainerError::PuzzleAlignment(id)) if id == "scholar"
        ));
    }

    #[test]
    fn test_empty_solution_is_an_error() {
        let mut puzzle = scholars_mate();
        puzzle.moves.clear();
        assert!(matches!(
            setup_for_puzzle(&puzzle, 2),
            Err(TrainerError::EmptySolution(_))
        ));
    }

    #[test]
    fn test_setup_is_deterministic() {
        let a = setup_for_puzzle(&scholars_mate(), 3).unwrap();
        let b = setup_for_puzzle(&scholars_mate(), 3).unwrap();
        assert_eq!(a.hidden_moves, b.hidden_moves);
        assert_eq!(a.solution_moves, b.solution_moves);
        assert_eq!(a.current.fen(), b.current.fen());
    }
}
