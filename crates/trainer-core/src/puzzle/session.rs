/// Visualization session: fetch, set up, watch, solve, score
///
/// The engine owns both positions and every transient flag of the active
/// puzzle. It does no I/O itself: the caller performs the fetch between
/// [`PuzzleSessionEngine::begin_fetch`] and [`PuzzleSessionEngine::finish_fetch`]
/// and drives the ghost-move playback with [`crate::animation::play`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use shakmaty::{Role, Square};
use tracing::{debug, info, warn};

use crate::animation::{GhostMove, PlaybackSpeed};
use crate::climb::ClimbScore;
use crate::error::TrainerError;
use crate::position::{GamePosition, TrainingMove};
use crate::storage::{KeyValueStore, StorageItem};

use super::setup::{setup_for_puzzle, PuzzleSetup};
use super::{ProgressMessage, Puzzle, PuzzleDifficulty, PuzzleFetchOptions};

pub const PLY_KEY: &str = "visualization-ply";
pub const RATING_GTE_KEY: &str = "puzzle-rating-gte-v2";
pub const RATING_LTE_KEY: &str = "puzzle-rating-lte-v2";
pub const PLAYBACK_SPEED_KEY: &str = "playback-speed";
pub const SHOW_NOTATION_KEY: &str = "show-notation";

const DEFAULT_PLY: u32 = 2;
/// Minimum width of the free-mode rating window.
const MIN_RATING_SPREAD: u32 = 300;
/// Half-width of the rating window around a climb step.
const CLIMB_RATING_SPREAD: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Fetching,
    /// Puzzle installed, hidden moves not yet played back
    Ready,
    Solving,
    Solved,
    /// Last attempt was wrong; further attempts are still accepted
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Right move, more to find
    Correct { remaining: usize },
    /// Puzzle complete. `bonus` is the climb score gained, if any.
    Solved { bonus: Option<u32> },
    Incorrect { san: String },
}

/// Persisted free-mode preferences
#[derive(Debug)]
pub struct VisualizationSettings {
    pub ply: StorageItem<u32>,
    pub rating_gte: StorageItem<u32>,
    pub rating_lte: StorageItem<u32>,
    pub playback_speed: StorageItem<PlaybackSpeed>,
    pub show_notation: StorageItem<bool>,
}

impl VisualizationSettings {
    pub fn open(store: &Arc<dyn KeyValueStore>) -> Self {
        Self {
            ply: StorageItem::open(Arc::clone(store), PLY_KEY, DEFAULT_PLY),
            rating_gte: StorageItem::open(
                Arc::clone(store),
                RATING_GTE_KEY,
                PuzzleDifficulty::Beginner.rating(),
            ),
            rating_lte: StorageItem::open(
                Arc::clone(store),
                RATING_LTE_KEY,
                PuzzleDifficulty::Intermediate.rating(),
            ),
            playback_speed: StorageItem::open(
                Arc::clone(store),
                PLAYBACK_SPEED_KEY,
                PlaybackSpeed::Normal,
            ),
            show_notation: StorageItem::open(Arc::clone(store), SHOW_NOTATION_KEY, false),
        }
    }
}

#[derive(Debug)]
struct ClimbRun {
    score: ClimbScore,
    playing: bool,
    puzzle_start: Option<Instant>,
}

#[derive(Debug)]
pub struct PuzzleSessionEngine {
    state: SessionState,
    state_before_fetch: SessionState,
    settings: VisualizationSettings,
    climb: Option<ClimbRun>,
    puzzle: Option<Puzzle>,
    current: GamePosition,
    future: GamePosition,
    hidden_moves: Vec<TrainingMove>,
    solution_moves: Vec<TrainingMove>,
    flipped: bool,
    show_future_position: bool,
    available_moves: Vec<TrainingMove>,
    progress: Option<ProgressMessage>,
    finished_auto_playing: bool,
    current_puzzle_failed: bool,
}

impl PuzzleSessionEngine {
    /// Free mode: difficulty and ply come from the user's settings.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::build(&store, None)
    }

    /// Climb mode: difficulty and ply come from the ladder step for the current score.
    pub fn climb(store: Arc<dyn KeyValueStore>) -> Self {
        let run = ClimbRun {
            score: ClimbScore::open(Arc::clone(&store)),
            playing: false,
            puzzle_start: None,
        };
        Self::build(&store, Some(run))
    }

    fn build(store: &Arc<dyn KeyValueStore>, climb: Option<ClimbRun>) -> Self {
        Self {
            state: SessionState::Idle,
            state_before_fetch: SessionState::Idle,
            settings: VisualizationSettings::open(store),
            climb,
            puzzle: None,
            current: GamePosition::default(),
            future: GamePosition::default(),
            hidden_moves: Vec::new(),
            solution_moves: Vec::new(),
            flipped: false,
            show_future_position: false,
            available_moves: Vec::new(),
            progress: None,
            finished_auto_playing: false,
            current_puzzle_failed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_climb(&self) -> bool {
        self.climb.is_some()
    }

    pub fn climb_score(&self) -> Option<&ClimbScore> {
        self.climb.as_ref().map(|c| &c.score)
    }

    pub fn settings(&self) -> &VisualizationSettings {
        &self.settings
    }

    pub fn puzzle(&self) -> Option<&Puzzle> {
        self.puzzle.as_ref()
    }

    pub fn current_position(&self) -> &GamePosition {
        &self.current
    }

    pub fn future_position(&self) -> &GamePosition {
        &self.future
    }

    /// The position on the board right now: the future once it has been revealed.
    pub fn displayed_position(&self) -> &GamePosition {
        if self.show_future_position {
            &self.future
        } else {
            &self.current
        }
    }

    pub fn hidden_moves(&self) -> &[TrainingMove] {
        &self.hidden_moves
    }

    pub fn solution_moves(&self) -> &[TrainingMove] {
        &self.solution_moves
    }

    pub fn flipped(&self) -> bool {
        self.flipped
    }

    pub fn available_moves(&self) -> &[TrainingMove] {
        &self.available_moves
    }

    pub fn progress(&self) -> Option<&ProgressMessage> {
        self.progress.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.state == SessionState::Solved
    }

    pub fn playback_speed(&self) -> PlaybackSpeed {
        *self.settings.playback_speed.value()
    }

    pub fn show_notation(&self) -> bool {
        *self.settings.show_notation.value()
    }

    /// Number of plies hidden from the player.
    pub fn ply(&self) -> u32 {
        match &self.climb {
            Some(run) => run.score.current_step().hidden_moves,
            None => *self.settings.ply.value(),
        }
    }

    pub fn fetch_options(&self) -> PuzzleFetchOptions {
        match &self.climb {
            Some(run) => {
                let step = run.score.current_step();
                PuzzleFetchOptions {
                    rating_gte: step.puzzle_difficulty.saturating_sub(CLIMB_RATING_SPREAD),
                    rating_lte: step.puzzle_difficulty + CLIMB_RATING_SPREAD,
                    max_ply: step.hidden_moves,
                }
            }
            None => PuzzleFetchOptions {
                rating_gte: *self.settings.rating_gte.value(),
                rating_lte: *self.settings.rating_lte.value(),
                max_ply: *self.settings.ply.value(),
            },
        }
    }

    /// Enter `Fetching` and return the request to send.
    pub fn begin_fetch(&mut self) -> Result<PuzzleFetchOptions, TrainerError> {
        if self.state == SessionState::Fetching {
            return Err(TrainerError::FetchInProgress);
        }
        self.state_before_fetch = self.state;
        self.state = SessionState::Fetching;
        let options = self.fetch_options();
        debug!(?options, "Fetching puzzle");
        Ok(options)
    }

    /// Install the fetched puzzle. On any failure the previous puzzle and
    /// state are left exactly as they were.
    pub fn finish_fetch(&mut self, result: Result<Puzzle, TrainerError>) -> Result<(), TrainerError> {
        let restore = if self.state == SessionState::Fetching {
            self.state_before_fetch
        } else {
            self.state
        };

        let puzzle = match result {
            Ok(puzzle) => puzzle,
            Err(e) => {
                warn!(error = %e, "Puzzle fetch failed");
                self.state = restore;
                return Err(e);
            }
        };

        let setup = match setup_for_puzzle(&puzzle, self.ply() as usize) {
            Ok(setup) => setup,
            Err(e) => {
                warn!(puzzle_id = %puzzle.id, error = %e, "Discarding puzzle that could not be set up");
                self.state = restore;
                return Err(e);
            }
        };

        info!(puzzle_id = %puzzle.id, rating = puzzle.rating, ply = self.ply(), "Puzzle ready");
        self.reset_transient();
        self.install(setup);
        self.puzzle = Some(puzzle);
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Install a puzzle without going through a fetch.
    pub fn load_puzzle(&mut self, puzzle: Puzzle) -> Result<(), TrainerError> {
        self.finish_fetch(Ok(puzzle))
    }

    fn reset_transient(&mut self) {
        self.show_future_position = false;
        self.progress = None;
        self.finished_auto_playing = false;
        self.current_puzzle_failed = false;
    }

    fn install(&mut self, setup: PuzzleSetup) {
        self.current = setup.current;
        self.future = setup.future;
        self.hidden_moves = setup.hidden_moves;
        self.solution_moves = setup.solution_moves;
        self.flipped = setup.flipped;
        self.show_future_position = false;
        self.available_moves.clear();
    }

    /// Re-run alignment for the active puzzle with the current ply.
    fn rerun_setup(&mut self) -> Result<(), TrainerError> {
        let Some(puzzle) = self.puzzle.as_ref() else {
            return Ok(());
        };
        let setup = setup_for_puzzle(puzzle, self.ply() as usize)?;
        // A rebuilt puzzle starts over: earlier attempts no longer apply.
        self.reset_transient();
        self.install(setup);
        if let Some(run) = self.climb.as_mut() {
            run.puzzle_start = None;
        }
        if self.state == SessionState::Fetching {
            self.state_before_fetch = SessionState::Ready;
        } else {
            self.state = SessionState::Ready;
        }
        debug!(ply = self.ply(), "Puzzle rebuilt");
        Ok(())
    }

    /// Moves to replay for the player, in order.
    pub fn ghost_moves(&self) -> Vec<GhostMove> {
        self.hidden_moves.iter().map(GhostMove::from).collect()
    }

    /// Climb playback should start on its own once a puzzle is ready.
    pub fn should_auto_play(&self) -> bool {
        self.state == SessionState::Ready && self.climb.as_ref().is_some_and(|run| run.playing)
    }

    /// Player pressed start on the climb.
    pub fn start_playing_climb(&mut self) {
        if let Some(run) = self.climb.as_mut() {
            run.playing = true;
            info!(score = run.score.score(), "Climb started");
        }
    }

    /// Ghost-move playback completed. Starts the solve clock in climb mode.
    pub fn on_auto_play_end(&mut self, now: Instant) {
        if self.finished_auto_playing {
            return;
        }
        self.finished_auto_playing = true;
        if self.state == SessionState::Ready {
            self.state = SessionState::Solving;
        }
        if let Some(run) = self.climb.as_mut() {
            run.puzzle_start = Some(now);
            self.current_puzzle_failed = false;
        }
    }

    /// Check `mv` against the solution. Wrong moves leave the board untouched.
    pub fn attempt_solution(
        &mut self,
        mv: &TrainingMove,
        now: Instant,
    ) -> Result<AttemptOutcome, TrainerError> {
        if !matches!(
            self.state,
            SessionState::Ready | SessionState::Solving | SessionState::Failed
        ) {
            return Err(TrainerError::NoActivePuzzle);
        }
        let Some(expected) = self.solution_moves.first() else {
            return Err(TrainerError::NoActivePuzzle);
        };

        let correct = mv.san == expected.san || self.future.gives_checkmate(mv);
        if !correct {
            return Ok(self.fail_attempt(mv));
        }

        self.future.play(mv)?;
        self.show_future_position = true;
        if self.future.is_checkmate() {
            // Any mate ends the puzzle, whatever the recorded line continues with.
            self.solution_moves.clear();
        } else {
            if let Some(reply) = self.solution_moves.get(1).cloned() {
                if let Err(e) = self.future.play(&reply) {
                    debug!(reply = %reply.san, error = %e, "Skipping solution reply");
                }
            }
            let popped = self.solution_moves.len().min(2);
            self.solution_moves.drain(..popped);
        }

        if !self.solution_moves.is_empty() {
            self.progress = Some(ProgressMessage::success("Keep going..."));
            self.state = SessionState::Solving;
            return Ok(AttemptOutcome::Correct {
                remaining: self.solution_moves.len(),
            });
        }

        self.progress = None;
        self.state = SessionState::Solved;
        let bonus = self.score_success(now);
        info!(
            puzzle_id = self.puzzle.as_ref().map(|p| p.id.as_str()).unwrap_or_default(),
            ?bonus,
            "Puzzle solved"
        );
        Ok(AttemptOutcome::Solved { bonus })
    }

    /// Attempt a move given as SAN or UCI text against the solving position.
    pub fn attempt_notation(
        &mut self,
        notation: &str,
        now: Instant,
    ) -> Result<AttemptOutcome, TrainerError> {
        let mut scratch = self.future.detached()?;
        let mv = scratch.play_notation(notation)?;
        self.attempt_solution(&mv, now)
    }

    fn fail_attempt(&mut self, mv: &TrainingMove) -> AttemptOutcome {
        debug!(san = %mv.san, "Wrong solution move");
        self.progress = Some(ProgressMessage::error(format!(
            "{} was not the right move, try again.",
            mv.san
        )));
        self.state = SessionState::Failed;
        if let Some(run) = self.climb.as_mut() {
            self.current_puzzle_failed = true;
            run.score.record_failure();
        }
        AttemptOutcome::Incorrect {
            san: mv.san.clone(),
        }
    }

    fn score_success(&mut self, now: Instant) -> Option<u32> {
        let run = self.climb.as_mut()?;
        if self.current_puzzle_failed {
            return None;
        }
        let elapsed = run
            .puzzle_start
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(Duration::ZERO);
        Some(run.score.record_success(elapsed))
    }

    /// Select, deselect, or complete a move by pressing a square.
    pub fn on_square_press(
        &mut self,
        square: Square,
        now: Instant,
    ) -> Result<Option<AttemptOutcome>, TrainerError> {
        if let Some(mv) = self.available_move_to(square) {
            self.available_moves.clear();
            return self.attempt_solution(&mv, now).map(Some);
        }
        if self.puzzle.is_none() {
            return Ok(None);
        }
        if self.available_moves.first().is_some_and(|m| m.from == square) {
            self.available_moves.clear();
        } else {
            self.available_moves = self.future.legal_moves_from(square);
        }
        Ok(None)
    }

    /// Squares the selected piece can move to.
    pub fn available_targets(&self) -> Vec<Square> {
        let mut targets: Vec<Square> = self.available_moves.iter().map(|m| m.to).collect();
        targets.dedup();
        targets
    }

    /// The selected piece that would be moved by pressing `square`.
    pub fn active_from(&self) -> Option<Square> {
        self.available_moves.first().map(|m| m.from)
    }

    // Promotions offer several moves to one square; take the queen.
    fn available_move_to(&self, square: Square) -> Option<TrainingMove> {
        let mut candidates = self.available_moves.iter().filter(|m| m.to == square);
        let first = candidates.next()?.clone();
        if first.promotion.is_none() || first.promotion == Some(Role::Queen) {
            return Some(first);
        }
        Some(
            candidates
                .find(|m| m.promotion == Some(Role::Queen))
                .cloned()
                .unwrap_or(first),
        )
    }

    /// Change the free-mode ply by `increment` (never below one) and rebuild the puzzle.
    pub fn update_ply(&mut self, increment: i32) -> Result<(), TrainerError> {
        let next = (i64::from(*self.settings.ply.value()) + i64::from(increment)).max(1);
        self.settings.ply.set(next as u32);
        self.rerun_setup()
    }

    /// Store a new free-mode rating window, widening it if it is too narrow.
    pub fn set_rating_range(&mut self, gte: u32, lte: u32) {
        let lte = lte.max(gte + MIN_RATING_SPREAD);
        self.settings.rating_gte.set(gte);
        self.settings.rating_lte.set(lte);
    }

    pub fn set_playback_speed(&mut self, speed: PlaybackSpeed) {
        self.settings.playback_speed.set(speed);
    }

    pub fn toggle_notation(&mut self) -> bool {
        let next = !self.show_notation();
        self.settings.show_notation.set(next);
        next
    }

    /// Drop the active puzzle and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.state_before_fetch = SessionState::Idle;
        self.puzzle = None;
        self.current = GamePosition::default();
        self.future = GamePosition::default();
        self.hidden_moves.clear();
        self.solution_moves.clear();
        self.flipped = false;
        self.available_moves.clear();
        self.reset_transient();
        if let Some(run) = self.climb.as_mut() {
            run.puzzle_start = None;
        }
    }

    /// Restart the climb from a score of zero.
    pub fn reset_climb(&mut self) {
        if let Some(run) = self.climb.as_mut() {
            run.score.reset();
        }
    }
}
