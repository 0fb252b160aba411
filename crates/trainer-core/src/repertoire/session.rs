//! Opening-builder session: play moves on a board, then save the new part of
//! the line into the active side's tree.

use std::sync::Arc;

use shakmaty::Square;
use tracing::{debug, info};

use crate::error::TrainerError;
use crate::position::{GamePosition, TrainingMove};
use crate::storage::{KeyValueStore, StorageItem};

use super::tree::{default_repertoire, Repertoire, RepertoireTree};
use super::{pgn_to_line, BySide, PendingLine, RepertoireGrade, Side};

pub const REPERTOIRE_KEY: &str = "repertoire_v1";

#[derive(Debug)]
pub struct RepertoireSession {
    repertoire: StorageItem<Repertoire>,
    grades: BySide<Option<RepertoireGrade>>,
    active_side: Side,
    position: GamePosition,
    available_moves: Vec<TrainingMove>,
}

impl RepertoireSession {
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            repertoire: StorageItem::open(store, REPERTOIRE_KEY, default_repertoire()),
            grades: BySide::default(),
            active_side: Side::White,
            position: GamePosition::default(),
            available_moves: Vec::new(),
        }
    }

    pub fn repertoire(&self) -> &Repertoire {
        self.repertoire.value()
    }

    pub fn active_side(&self) -> Side {
        self.active_side
    }

    pub fn set_active_side(&mut self, side: Side) {
        self.active_side = side;
    }

    pub fn active_tree(&self) -> &RepertoireTree {
        &self.repertoire.value()[self.active_side]
    }

    pub fn position(&self) -> &GamePosition {
        &self.position
    }

    pub fn available_moves(&self) -> &[TrainingMove] {
        &self.available_moves
    }

    pub fn grade(&self, side: Side) -> Option<&RepertoireGrade> {
        self.grades[side].as_ref()
    }

    /// Replace the board with the line in `pgn`.
    pub fn play_pgn(&mut self, pgn: &str) -> Result<(), TrainerError> {
        let mut position = GamePosition::default();
        for san in pgn_to_line(pgn) {
            position.play_notation(&san)?;
        }
        self.position = position;
        self.available_moves.clear();
        Ok(())
    }

    pub fn play_move(&mut self, notation: &str) -> Result<TrainingMove, TrainerError> {
        let mv = self.position.play_notation(notation)?;
        self.available_moves.clear();
        Ok(mv)
    }

    pub fn undo(&mut self) -> Option<TrainingMove> {
        self.available_moves.clear();
        self.position.undo()
    }

    /// Move the selected piece to `square`, or select the piece on it.
    pub fn on_square_press(&mut self, square: Square) -> Result<Option<TrainingMove>, TrainerError> {
        if let Some(mv) = self.available_moves.iter().find(|m| m.to == square).cloned() {
            self.available_moves.clear();
            return self.position.play(&mv).map(Some);
        }
        self.available_moves = self.position.legal_moves_from(square);
        Ok(None)
    }

    /// Part of the board's move history not yet in the active tree.
    pub fn pending_line(&self) -> Option<PendingLine> {
        self.active_tree().pending_line(&self.position.san_history())
    }

    /// Save the pending part of the current line. Returns the number of moves
    /// added; the caller should request a new grade when it is non-zero.
    pub fn add_pending_line(&mut self) -> usize {
        let Some(pending) = self.pending_line() else {
            debug!("No pending line to add");
            return 0;
        };
        let side = self.active_side;
        let mut added = 0;
        self.repertoire.update(|repertoire| {
            added = repertoire[side].add_pending_line(&pending);
        });
        info!(%side, added, known = pending.known_line.len(), "Saved repertoire line");
        added
    }

    /// Tree to send to the grader for `side`.
    pub fn grade_request(&self, side: Side) -> &RepertoireTree {
        &self.repertoire.value()[side]
    }

    pub fn set_grade(&mut self, side: Side, grade: RepertoireGrade) {
        info!(%side, expected_depth = grade.expected_depth, "Installed repertoire grade");
        self.grades[side] = Some(grade);
    }
}
