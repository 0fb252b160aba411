//! Timed drills: blunder recognition and square colours.
//!
//! Both are rounds against a clock. A wrong answer costs a fixed time penalty
//! instead of points; the round ends when the clock runs out (or, for
//! blunders, when the fetched puzzles are exhausted).

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use shakmaty::{Color, Square};
use tracing::{debug, info};

use crate::error::TrainerError;
use crate::position::GamePosition;
use crate::puzzle::{BlunderFetchOptions, BlunderPuzzle};
use crate::storage::{KeyValueStore, StorageItem};

pub const BLUNDER_DIFFICULTY_KEY: &str = "blunder-recognition-difficulty";
pub const BLUNDER_HIGH_SCORE_KEY: &str = "high-score-blunder-recognition";
pub const COLOR_HIGH_SCORE_KEY: &str = "high-score-color-trainer";

pub const BLUNDER_ROUND: Duration = Duration::from_secs(60);
pub const COLOR_ROUND: Duration = Duration::from_secs(30);
pub const WRONG_GUESS_PENALTY: Duration = Duration::from_secs(5);

/// Time left on a round clock started at `start`.
fn remaining(round: Duration, start: Instant, penalties: u32, now: Instant) -> Duration {
    round
        .saturating_sub(now.saturating_duration_since(start))
        .saturating_sub(WRONG_GUESS_PENALTY * penalties)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlunderDifficulty {
    Easy,
    Medium,
    Hard,
}

impl BlunderDifficulty {
    pub const ALL: [BlunderDifficulty; 3] = [
        BlunderDifficulty::Easy,
        BlunderDifficulty::Medium,
        BlunderDifficulty::Hard,
    ];

    /// Centipawn loss window, inclusive.
    pub fn centipawn_range(self) -> (u32, u32) {
        match self {
            BlunderDifficulty::Easy => (500, 10_000),
            BlunderDifficulty::Medium => (300, 500),
            BlunderDifficulty::Hard => (200, 300),
        }
    }

    pub fn fetch_options(self, limit: u32) -> BlunderFetchOptions {
        let (min, max) = self.centipawn_range();
        BlunderFetchOptions {
            centipawn_loss_min: min,
            centipawn_loss_max: max,
            limit,
        }
    }
}

/// A puzzle that has left the queue, with how it went.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedBlunderPuzzle {
    pub puzzle: BlunderPuzzle,
    pub showed_blunder: bool,
    /// `None` when the round ended before a guess was made
    pub correct: Option<bool>,
    pub time_taken: Duration,
}

#[derive(Debug, Clone)]
struct BlunderCard {
    puzzle: BlunderPuzzle,
    is_blunder: bool,
    position: GamePosition,
    shown_at: Instant,
}

#[derive(Debug)]
pub struct BlunderRecognition {
    difficulty: StorageItem<BlunderDifficulty>,
    high_scores: StorageItem<BTreeMap<BlunderDifficulty, u32>>,
    playing: bool,
    done_playing: bool,
    start: Option<Instant>,
    score: u32,
    last_round_score: Option<u32>,
    penalties: u32,
    puzzles: VecDeque<BlunderPuzzle>,
    current: Option<BlunderCard>,
    seen: Vec<FinishedBlunderPuzzle>,
}

impl BlunderRecognition {
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        let zeroes = BlunderDifficulty::ALL.iter().map(|&d| (d, 0)).collect();
        Self {
            difficulty: StorageItem::open(
                Arc::clone(&store),
                BLUNDER_DIFFICULTY_KEY,
                BlunderDifficulty::Easy,
            ),
            high_scores: StorageItem::open(store, BLUNDER_HIGH_SCORE_KEY, zeroes),
            playing: false,
            done_playing: false,
            start: None,
            score: 0,
            last_round_score: None,
            penalties: 0,
            puzzles: VecDeque::new(),
            current: None,
            seen: Vec::new(),
        }
    }

    pub fn difficulty(&self) -> BlunderDifficulty {
        *self.difficulty.value()
    }

    pub fn set_difficulty(&mut self, difficulty: BlunderDifficulty) {
        self.difficulty.set(difficulty);
    }

    pub fn fetch_options(&self, limit: u32) -> BlunderFetchOptions {
        self.difficulty().fetch_options(limit)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn done_playing(&self) -> bool {
        self.done_playing
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn last_round_score(&self) -> Option<u32> {
        self.last_round_score
    }

    pub fn high_score(&self, difficulty: BlunderDifficulty) -> u32 {
        self.high_scores.value().get(&difficulty).copied().unwrap_or(0)
    }

    /// Most recent first.
    pub fn seen_puzzles(&self) -> &[FinishedBlunderPuzzle] {
        &self.seen
    }

    pub fn passed(&self) -> impl Iterator<Item = &FinishedBlunderPuzzle> {
        self.seen.iter().filter(|p| p.correct == Some(true))
    }

    pub fn failed(&self) -> impl Iterator<Item = &FinishedBlunderPuzzle> {
        self.seen.iter().filter(|p| p.correct != Some(true))
    }

    /// The move on offer, in SAN.
    pub fn current_move(&self) -> Option<&str> {
        self.current.as_ref().map(|card| {
            if card.is_blunder {
                card.puzzle.blunder.as_str()
            } else {
                card.puzzle.best_move.as_str()
            }
        })
    }

    pub fn current_position(&self) -> Option<&GamePosition> {
        self.current.as_ref().map(|card| &card.position)
    }

    /// Board shown from Black's side when Black is to move.
    pub fn flipped(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|card| card.position.turn() == Color::Black)
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.start {
            Some(start) if self.playing => remaining(BLUNDER_ROUND, start, self.penalties, now),
            _ => Duration::ZERO,
        }
    }

    /// Begin a round over freshly fetched `puzzles`.
    pub fn start<R: Rng>(
        &mut self,
        puzzles: Vec<BlunderPuzzle>,
        now: Instant,
        rng: &mut R,
    ) -> Result<(), TrainerError> {
        info!(count = puzzles.len(), difficulty = ?self.difficulty(), "Starting blunder round");
        self.seen.clear();
        self.done_playing = false;
        self.playing = true;
        self.start = Some(now);
        self.score = 0;
        self.penalties = 0;
        self.puzzles = puzzles.into();
        self.current = None;
        self.setup_next_round(now, rng)
    }

    pub fn setup_next_round<R: Rng>(&mut self, now: Instant, rng: &mut R) -> Result<(), TrainerError> {
        let show_blunder = rng.gen_bool(0.5);
        self.setup_next_round_with(show_blunder, now)
    }

    /// Deal the next puzzle, offering its blunder or its best move.
    pub fn setup_next_round_with(&mut self, show_blunder: bool, now: Instant) -> Result<(), TrainerError> {
        let Some(puzzle) = self.puzzles.pop_front() else {
            self.current = None;
            self.stop_round(now);
            return Ok(());
        };
        let position = GamePosition::from_fen(&puzzle.fen)?;
        debug!(puzzle_id = %puzzle.id, show_blunder, "Next blunder puzzle");
        self.current = Some(BlunderCard {
            puzzle,
            is_blunder: show_blunder,
            position,
            shown_at: now,
        });
        Ok(())
    }

    /// Answer whether the move on offer is a blunder. Returns whether the
    /// guess was right, or `None` if no round is running.
    pub fn guess<R: Rng>(
        &mut self,
        is_blunder: bool,
        now: Instant,
        rng: &mut R,
    ) -> Result<Option<bool>, TrainerError> {
        let show_blunder = rng.gen_bool(0.5);
        self.guess_with(is_blunder, now, show_blunder)
    }

    pub fn guess_with(
        &mut self,
        is_blunder: bool,
        now: Instant,
        next_shows_blunder: bool,
    ) -> Result<Option<bool>, TrainerError> {
        if !self.playing {
            return Ok(None);
        }
        if self.tick(now) {
            return Ok(None);
        }
        let Some(card) = self.current.as_ref() else {
            return Ok(None);
        };
        let correct = card.is_blunder == is_blunder;
        if correct {
            self.score += 1;
        } else {
            self.penalties += 1;
        }
        self.finish_current(Some(correct), now);
        if self.tick(now) {
            return Ok(Some(correct));
        }
        self.setup_next_round_with(next_shows_blunder, now)?;
        Ok(Some(correct))
    }

    /// Ends the round if the clock ran out. Returns whether the round is over.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.playing && self.remaining(now).is_zero() {
            self.stop_round(now);
        }
        !self.playing
    }

    pub fn stop_round(&mut self, now: Instant) {
        if !self.playing {
            return;
        }
        self.playing = false;
        self.done_playing = true;
        self.last_round_score = Some(self.score);
        self.finish_current(None, now);
        let difficulty = self.difficulty();
        if self.score > self.high_score(difficulty) {
            let score = self.score;
            self.high_scores.update(|scores| {
                scores.insert(difficulty, score);
            });
        }
        self.penalties = 0;
        info!(score = self.score, ?difficulty, "Blunder round finished");
    }

    /// Back to the start screen after reviewing a round.
    pub fn play_again(&mut self) {
        self.done_playing = false;
    }

    fn finish_current(&mut self, correct: Option<bool>, now: Instant) {
        if let Some(card) = self.current.take() {
            self.seen.insert(
                0,
                FinishedBlunderPuzzle {
                    time_taken: now.saturating_duration_since(card.shown_at),
                    puzzle: card.puzzle,
                    showed_blunder: card.is_blunder,
                    correct,
                },
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquareShade {
    Light,
    Dark,
}

impl SquareShade {
    pub fn of(square: Square) -> Self {
        if square.is_light() {
            SquareShade::Light
        } else {
            SquareShade::Dark
        }
    }
}

#[derive(Debug)]
pub struct ColorTrainer {
    high_score: StorageItem<u32>,
    playing: bool,
    start: Option<Instant>,
    score: u32,
    last_round_score: Option<u32>,
    penalties: u32,
    current_square: Option<Square>,
}

impl ColorTrainer {
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            high_score: StorageItem::open(store, COLOR_HIGH_SCORE_KEY, 0),
            playing: false,
            start: None,
            score: 0,
            last_round_score: None,
            penalties: 0,
            current_square: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        *self.high_score.value()
    }

    pub fn last_round_score(&self) -> Option<u32> {
        self.last_round_score
    }

    pub fn current_square(&self) -> Option<Square> {
        self.current_square
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.start {
            Some(start) if self.playing => remaining(COLOR_ROUND, start, self.penalties, now),
            _ => Duration::ZERO,
        }
    }

    pub fn start<R: Rng>(&mut self, now: Instant, rng: &mut R) {
        self.start_with(Square::ALL[rng.gen_range(0..64)], now);
    }

    pub fn start_with(&mut self, square: Square, now: Instant) {
        self.playing = true;
        self.start = Some(now);
        self.score = 0;
        self.penalties = 0;
        self.current_square = Some(square);
        info!("Starting colour round");
    }

    pub fn guess<R: Rng>(&mut self, shade: SquareShade, now: Instant, rng: &mut R) -> Option<bool> {
        self.guess_with(shade, now, Square::ALL[rng.gen_range(0..64)])
    }

    /// Judge `shade` against the highlighted square, then highlight `next`.
    pub fn guess_with(&mut self, shade: SquareShade, now: Instant, next: Square) -> Option<bool> {
        if self.tick(now) {
            return None;
        }
        let square = self.current_square?;
        let correct = SquareShade::of(square) == shade;
        if correct {
            self.score += 1;
        } else {
            self.penalties += 1;
        }
        if !self.tick(now) {
            self.current_square = Some(next);
        }
        Some(correct)
    }

    /// Ends the round if the clock ran out. Returns whether the round is over.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.playing && self.remaining(now).is_zero() {
            self.stop_round();
        }
        !self.playing
    }

    pub fn stop_round(&mut self) {
        if !self.playing {
            return;
        }
        self.playing = false;
        self.last_round_score = Some(self.score);
        if self.score > self.high_score() {
            self.high_score.set(self.score);
        }
        info!(score = self.score, "Colour round finished");
        self.score = 0;
        self.penalties = 0;
        self.current_square = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rand::{rngs::StdRng, SeedableRng};

    fn blunder(id: &str) -> BlunderPuzzle {
        BlunderPuzzle {
            id: id.into(),
            fen: "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2".into(),
            best_move: "Nc6".into(),
            blunder: "f6".into(),
            centipawns_lost: 350,
        }
    }

    fn store() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_difficulty_ranges() {
        assert_eq!(BlunderDifficulty::Easy.centipawn_range(), (500, 10_000));
        let opts = BlunderDifficulty::Hard.fetch_options(20);
        assert_eq!(opts.centipawn_loss_min, 200);
        assert_eq!(opts.centipawn_loss_max, 300);
    }

    #[test]
    fn test_blunder_round_scores_and_logs() {
        let mut drill = BlunderRecognition::open(store());
        let now = Instant::now();
        drill.puzzles = vec![blunder("a"), blunder("b"), blunder("c")].into();
        drill.playing = true;
        drill.start = Some(now);
        drill.setup_next_round_with(true, now).unwrap();
        assert_eq!(drill.current_move(), Some("f6"));
        assert!(drill.flipped());

        assert_eq!(drill.guess_with(true, now, false).unwrap(), Some(true));
        assert_eq!(drill.current_move(), Some("Nc6"));
        assert_eq!(drill.guess_with(true, now, false).unwrap(), Some(false));
        assert_eq!(drill.score(), 1);
        assert_eq!(drill.remaining(now), Duration::from_secs(55));

        // Third guess empties the queue and ends the round.
        drill.guess_with(false, now, false).unwrap();
        assert!(!drill.is_playing());
        assert!(drill.done_playing());
        assert_eq!(drill.last_round_score(), Some(2));
        assert_eq!(drill.high_score(BlunderDifficulty::Easy), 2);
        assert_eq!(drill.seen_puzzles().len(), 3);
        assert_eq!(drill.seen_puzzles()[0].puzzle.id, "c");
        assert_eq!(drill.passed().count(), 2);
        assert_eq!(drill.failed().count(), 1);
    }

    #[test]
    fn test_blunder_round_times_out() {
        let mut drill = BlunderRecognition::open(store());
        let now = Instant::now();
        let mut rng = StdRng::seed_from_u64(7);
        drill.start(vec![blunder("a"), blunder("b")], now, &mut rng).unwrap();
        let late = now + Duration::from_secs(61);
        assert_eq!(drill.guess(true, late, &mut rng).unwrap(), None);
        assert!(!drill.is_playing());
        assert_eq!(drill.seen_puzzles()[0].correct, None);
    }

    #[test]
    fn test_high_scores_are_per_difficulty() {
        let store = store();
        let mut drill = BlunderRecognition::open(Arc::clone(&store));
        drill.set_difficulty(BlunderDifficulty::Hard);
        let now = Instant::now();
        drill.puzzles = vec![blunder("a")].into();
        drill.playing = true;
        drill.start = Some(now);
        drill.setup_next_round_with(false, now).unwrap();
        drill.guess_with(false, now, false).unwrap();

        let reopened = BlunderRecognition::open(store);
        assert_eq!(reopened.difficulty(), BlunderDifficulty::Hard);
        assert_eq!(reopened.high_score(BlunderDifficulty::Hard), 1);
        assert_eq!(reopened.high_score(BlunderDifficulty::Easy), 0);
    }

    #[test]
    fn test_color_guesses() {
        let mut trainer = ColorTrainer::open(store());
        let now = Instant::now();
        trainer.start_with(Square::A1, now);
        assert_eq!(trainer.guess_with(SquareShade::Dark, now, Square::H1), Some(true));
        assert_eq!(trainer.current_square(), Some(Square::H1));
        assert_eq!(trainer.guess_with(SquareShade::Dark, now, Square::E4), Some(false));
        assert_eq!(trainer.remaining(now), Duration::from_secs(25));
        assert_eq!(trainer.score(), 1);
    }

    #[test]
    fn test_color_penalties_end_round_early() {
        let store = store();
        let mut trainer = ColorTrainer::open(Arc::clone(&store));
        let now = Instant::now();
        trainer.start_with(Square::E4, now);
        assert_eq!(trainer.guess_with(SquareShade::Light, now, Square::A1), Some(true));
        for _ in 0..6 {
            trainer.guess_with(SquareShade::Light, now, Square::A1);
        }
        assert!(!trainer.is_playing());
        assert_eq!(trainer.last_round_score(), Some(1));
        assert_eq!(ColorTrainer::open(store).high_score(), 1);
    }

    #[test]
    fn test_square_shades() {
        assert_eq!(SquareShade::of(Square::A1), SquareShade::Dark);
        assert_eq!(SquareShade::of(Square::H1), SquareShade::Light);
        assert_eq!(SquareShade::of(Square::E4), SquareShade::Light);
    }
}
