//! Mutable game position with undo and verbose history, backed by shakmaty.
//!
//! shakmaty positions are immutable-by-move values; training sessions need a
//! chess.js style board that can be stepped back, so every applied move keeps
//! the position it was played from.

use shakmaty::{
    fen::Fen, san::San, san::SanPlus, uci::UciMove, CastlingMode, Chess, Color, EnPassantMode,
    Move, Piece, Position, Role, Square,
};

use crate::error::TrainerError;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A move as the trainer sees it: squares, SAN with check suffix, and mover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingMove {
    pub from: Square,
    pub to: Square,
    pub san: String,
    pub color: Color,
    pub promotion: Option<Role>,
}

impl TrainingMove {
    /// Describe a legal `mv` in `pos` (the position before the move).
    fn describe(pos: &Chess, mv: &Move) -> Self {
        // Castling is reported with the king's destination, not the rook square.
        let (from, to, promotion) = match mv.to_uci(CastlingMode::Standard) {
            UciMove::Normal { from, to, promotion } => (from, to, promotion),
            _ => (mv.from().unwrap_or(mv.to()), mv.to(), mv.promotion()),
        };

        let san = San::from_move(pos, mv.clone());
        let mut after = pos.clone();
        after.play_unchecked(mv.clone());
        let suffix = if after.is_checkmate() {
            "#"
        } else if after.is_check() {
            "+"
        } else {
            ""
        };

        Self {
            from,
            to,
            san: format!("{san}{suffix}"),
            color: pos.turn(),
            promotion,
        }
    }

    /// UCI notation, e.g. `e7e8q`.
    pub fn uci(&self) -> String {
        match self.promotion {
            Some(role) => format!("{}{}{}", self.from, self.to, role.char()),
            None => format!("{}{}", self.from, self.to),
        }
    }

    fn matches(&self, mv: &Move) -> bool {
        match mv.to_uci(CastlingMode::Standard) {
            UciMove::Normal { from, to, promotion } => {
                from == self.from && to == self.to && promotion == self.promotion
            }
            _ => false,
        }
    }
}

/// Piece-placement field of a FEN (the part before the first space).
pub fn placement_field(fen: &str) -> &str {
    fen.split_whitespace().next().unwrap_or("")
}

#[derive(Debug, Clone)]
pub struct GamePosition {
    pos: Chess,
    previous: Vec<Chess>,
    history: Vec<TrainingMove>,
}

impl Default for GamePosition {
    fn default() -> Self {
        Self {
            pos: Chess::default(),
            previous: Vec::new(),
            history: Vec::new(),
        }
    }
}

impl GamePosition {
    pub fn from_fen(fen: &str) -> Result<Self, TrainerError> {
        let parsed: Fen = fen.trim().parse().map_err(|e| TrainerError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{e}"),
        })?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| TrainerError::InvalidFen {
                fen: fen.to_string(),
                reason: format!("{e}"),
            })?;
        Ok(Self {
            pos,
            previous: Vec::new(),
            history: Vec::new(),
        })
    }

    /// Independent copy made by FEN round trip. History is not carried over.
    pub fn detached(&self) -> Result<Self, TrainerError> {
        Self::from_fen(&self.fen())
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.pos, EnPassantMode::Legal).to_string()
    }

    /// Piece placement only, without side to move, castling or counters.
    pub fn board_fen(&self) -> String {
        self.pos.board().to_string()
    }

    pub fn turn(&self) -> Color {
        self.pos.turn()
    }

    pub fn is_checkmate(&self) -> bool {
        self.pos.is_checkmate()
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.pos.board().piece_at(square)
    }

    pub fn history(&self) -> &[TrainingMove] {
        &self.history
    }

    pub fn san_history(&self) -> Vec<String> {
        self.history.iter().map(|m| m.san.clone()).collect()
    }

    /// All legal moves starting on `square`.
    pub fn legal_moves_from(&self, square: Square) -> Vec<TrainingMove> {
        self.pos
            .legal_moves()
            .into_iter()
            .filter(|m| m.from() == Some(square))
            .map(|m| TrainingMove::describe(&self.pos, &m))
            .collect()
    }

    /// Whether playing `mv` here would checkmate the opponent.
    pub fn gives_checkmate(&self, mv: &TrainingMove) -> bool {
        match self.find_legal(mv) {
            Some(legal) => {
                let mut after = self.pos.clone();
                after.play_unchecked(legal);
                after.is_checkmate()
            }
            None => false,
        }
    }

    /// Play a move previously described by this or an equivalent position.
    pub fn play(&mut self, mv: &TrainingMove) -> Result<TrainingMove, TrainerError> {
        let legal = self
            .find_legal(mv)
            .ok_or_else(|| TrainerError::IllegalMove(mv.san.clone()))?;
        Ok(self.apply(legal))
    }

    /// Play a move given in SAN (`Nf3`, `exd8=Q+`) or UCI (`g1f3`).
    pub fn play_notation(&mut self, notation: &str) -> Result<TrainingMove, TrainerError> {
        let notation = notation.trim();
        let from_san = notation
            .parse::<SanPlus>()
            .ok()
            .and_then(|san| san.san.to_move(&self.pos).ok());
        let legal = match from_san {
            Some(m) => m,
            None => notation
                .parse::<UciMove>()
                .ok()
                .and_then(|uci| uci.to_move(&self.pos).ok())
                .ok_or_else(|| TrainerError::IllegalMove(notation.to_string()))?,
        };
        Ok(self.apply(legal))
    }

    /// Step back one move. Returns the undone move, or `None` at the root.
    pub fn undo(&mut self) -> Option<TrainingMove> {
        let previous = self.previous.pop()?;
        self.pos = previous;
        self.history.pop()
    }

    fn find_legal(&self, mv: &TrainingMove) -> Option<Move> {
        self.pos
            .legal_moves()
            .into_iter()
            .find(|legal| mv.matches(legal))
    }

    fn apply(&mut self, mv: Move) -> TrainingMove {
        let described = TrainingMove::describe(&self.pos, &mv);
        self.previous.push(self.pos.clone());
        self.pos.play_unchecked(mv);
        self.history.push(described.clone());
        described
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_and_undo() {
        let mut pos = GamePosition::default();
        let e4 = pos.play_notation("e4").unwrap();
        assert_eq!(e4.from, Square::E2);
        assert_eq!(e4.to, Square::E4);
        assert_eq!(e4.color, Color::White);
        assert_eq!(pos.turn(), Color::Black);

        let undone = pos.undo().unwrap();
        assert_eq!(undone.san, "e4");
        assert_eq!(pos.fen(), STANDARD_START_FEN);
        assert!(pos.undo().is_none());
    }

    #[test]
    fn test_uci_notation_is_accepted() {
        let mut pos = GamePosition::default();
        let mv = pos.play_notation("g1f3").unwrap();
        assert_eq!(mv.san, "Nf3");
        assert_eq!(mv.uci(), "g1f3");
    }

    #[test]
    fn test_san_carries_mate_suffix() {
        let mut pos = GamePosition::default();
        for san in ["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6"] {
            pos.play_notation(san).unwrap();
        }
        let mate = pos.play_notation("Qxf7").unwrap();
        assert_eq!(mate.san, "Qxf7#");
        assert!(pos.is_checkmate());
    }

    #[test]
    fn test_castling_reports_king_destination() {
        let pos = GamePosition::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let castle = pos
            .legal_moves_from(Square::E1)
            .into_iter()
            .find(|m| m.san == "O-O")
            .unwrap();
        assert_eq!(castle.to, Square::G1);
    }

    #[test]
    fn test_board_fen_ignores_counters() {
        let mut pos = GamePosition::default();
        pos.play_notation("e4").unwrap();
        assert_eq!(
            pos.board_fen(),
            placement_field("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
        );
    }

    #[test]
    fn test_detached_copy_is_independent() {
        let mut pos = GamePosition::default();
        pos.play_notation("d4").unwrap();
        let mut copy = pos.detached().unwrap();
        assert_eq!(copy.fen(), pos.fen());
        assert!(copy.history().is_empty());
        copy.play_notation("d5").unwrap();
        assert_eq!(pos.turn(), Color::Black);
        assert_eq!(pos.history().len(), 1);
    }

    #[test]
    fn test_invalid_fen_is_rejected() {
        assert!(matches!(
            GamePosition::from_fen("not a fen"),
            Err(TrainerError::InvalidFen { .. })
        ));
    }
}
