//! The climb: a fixed difficulty ladder indexed by score.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::{KeyValueStore, StorageItem};

const START_DIFFICULTY: u32 = 1000;
const CUTOFF: u32 = 2400;
const ROUNDS: usize = 30;
const RAMP_STEPS: usize = 20;
const RAMP_INCREMENT: u32 = 10;
const HIDDEN_MOVE_DROP: u32 = 100;

/// Points lost on a wrong attempt.
pub const FAILURE_PENALTY: u32 = 10;
/// Solving within this window earns more than the minimum bonus.
const BONUS_WINDOW_MS: f64 = 30_000.0;

pub const SCORE_KEY: &str = "climb-score";
pub const HIGH_SCORE_KEY: &str = "climb-high-score";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimbStep {
    pub puzzle_difficulty: u32,
    pub hidden_moves: u32,
}

impl ClimbStep {
    const fn new(puzzle_difficulty: u32, hidden_moves: u32) -> Self {
        Self {
            puzzle_difficulty,
            hidden_moves,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClimbLadder {
    steps: Vec<ClimbStep>,
}

impl Default for ClimbLadder {
    fn default() -> Self {
        Self::generate()
    }
}

impl ClimbLadder {
    /// Each round ramps difficulty up in small increments while below the
    /// cutoff, then adds a hidden move and eases difficulty back down.
    pub fn generate() -> Self {
        let mut difficulty = START_DIFFICULTY;
        let mut hidden_moves = 1;
        let mut steps = vec![ClimbStep::new(difficulty, hidden_moves)];

        for _ in 0..ROUNDS {
            if difficulty < CUTOFF {
                for _ in 0..RAMP_STEPS {
                    difficulty += RAMP_INCREMENT;
                    steps.push(ClimbStep::new(difficulty, hidden_moves));
                }
            }
            hidden_moves += 1;
            if difficulty < CUTOFF {
                difficulty -= HIDDEN_MOVE_DROP;
            }
            steps.push(ClimbStep::new(difficulty, hidden_moves));
        }

        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[ClimbStep] {
        &self.steps
    }

    /// Step for `score`, clamped to the top of the ladder.
    pub fn step_for(&self, score: u32) -> ClimbStep {
        let idx = (score as usize).min(self.steps.len().saturating_sub(1));
        self.steps[idx]
    }
}

/// Bonus for a solve that took `elapsed`, between 1 and 10.
pub fn success_bonus(elapsed: Duration) -> u32 {
    let elapsed_ms = elapsed.as_millis() as f64;
    let raw = 10.0 - (elapsed_ms / BONUS_WINDOW_MS) * 10.0;
    raw.max(1.0).round() as u32
}

/// Persisted climb progress.
#[derive(Debug)]
pub struct ClimbScore {
    ladder: ClimbLadder,
    score: StorageItem<u32>,
    high_score: StorageItem<u32>,
    last_delta: Option<i64>,
}

impl ClimbScore {
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            ladder: ClimbLadder::generate(),
            score: StorageItem::open(Arc::clone(&store), SCORE_KEY, 0),
            high_score: StorageItem::open(store, HIGH_SCORE_KEY, 0),
            last_delta: None,
        }
    }

    pub fn ladder(&self) -> &ClimbLadder {
        &self.ladder
    }

    pub fn score(&self) -> u32 {
        *self.score.value()
    }

    pub fn high_score(&self) -> u32 {
        *self.high_score.value()
    }

    /// Change applied by the most recent success or failure.
    pub fn last_delta(&self) -> Option<i64> {
        self.last_delta
    }

    pub fn current_step(&self) -> ClimbStep {
        self.ladder.step_for(self.score())
    }

    pub fn record_success(&mut self, elapsed: Duration) -> u32 {
        let bonus = success_bonus(elapsed);
        let next = self.score().saturating_add(bonus);
        self.score.set(next);
        if next > self.high_score() {
            self.high_score.set(next);
        }
        self.last_delta = Some(i64::from(bonus));
        info!(bonus, score = next, elapsed_ms = elapsed.as_millis() as u64, "Climb puzzle solved");
        bonus
    }

    pub fn record_failure(&mut self) {
        let before = self.score();
        let next = before.saturating_sub(FAILURE_PENALTY);
        self.score.set(next);
        self.last_delta = Some(i64::from(next) - i64::from(before));
        info!(score = next, "Climb attempt failed");
    }

    pub fn reset(&mut self) {
        self.score.set(0);
        self.last_delta = None;
    }
}
