//! Ghost-move playback for the hidden-moves drill.
//!
//! Each queued move shows an indicator on its origin square, holds, slides to
//! the destination, fades out, then waits before the next move. The sequencer
//! is a plain state machine driven by timer completions; `play` runs it on
//! tokio timers.
//!
//! Every scheduled timer carries a [`PhaseTicket`]. Stopping playback does not
//! abort timers already in flight; when they fire they find the sequencer
//! stopped or their generation stale, and do nothing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shakmaty::{Color, Square};
use tracing::{debug, info};

use crate::position::TrainingMove;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackSpeed {
    Slow,
    Normal,
    Fast,
    Ludicrous,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 4] = [
        PlaybackSpeed::Slow,
        PlaybackSpeed::Normal,
        PlaybackSpeed::Fast,
        PlaybackSpeed::Ludicrous,
    ];

    pub fn description(self) -> &'static str {
        match self {
            PlaybackSpeed::Slow => "Slow",
            PlaybackSpeed::Normal => "Normal",
            PlaybackSpeed::Fast => "Fast",
            PlaybackSpeed::Ludicrous => "Ludicrous",
        }
    }

    pub fn durations(self) -> AnimationDurations {
        let (mv, fade, stay) = match self {
            PlaybackSpeed::Slow => (300, 200, 500),
            PlaybackSpeed::Normal => (200, 150, 300),
            PlaybackSpeed::Fast => (200, 100, 100),
            PlaybackSpeed::Ludicrous => (150, 50, 50),
        };
        AnimationDurations {
            move_duration: Duration::from_millis(mv),
            fade_duration: Duration::from_millis(fade),
            stay_duration: Duration::from_millis(stay),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationDurations {
    pub move_duration: Duration,
    pub fade_duration: Duration,
    pub stay_duration: Duration,
}

/// A move to replay as a travelling indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhostMove {
    pub from: Square,
    pub to: Square,
    pub color: Color,
}

impl From<&TrainingMove> for GhostMove {
    fn from(mv: &TrainingMove) -> Self {
        Self {
            from: mv.from,
            to: mv.to,
            color: mv.color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    FadeIn,
    Hold,
    Translate,
    FadeOut,
    PostDelay,
}

impl AnimationPhase {
    fn next(self) -> Option<AnimationPhase> {
        match self {
            AnimationPhase::FadeIn => Some(AnimationPhase::Hold),
            AnimationPhase::Hold => Some(AnimationPhase::Translate),
            AnimationPhase::Translate => Some(AnimationPhase::FadeOut),
            AnimationPhase::FadeOut => Some(AnimationPhase::PostDelay),
            AnimationPhase::PostDelay => None,
        }
    }
}

/// Target state of the indicator at the end of a phase, for the renderer to tween towards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorFrame {
    pub square: Square,
    pub opacity: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTicket {
    generation: u64,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledPhase {
    pub ticket: PhaseTicket,
    pub ghost: GhostMove,
    pub phase: AnimationPhase,
    pub duration: Duration,
    pub frame: IndicatorFrame,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SequencerStep {
    /// Run this phase, then report its ticket back.
    Schedule(ScheduledPhase),
    /// The queue played out. Reported once per playback.
    Finished,
    /// Nothing to do: stale ticket, stopped, or already playing.
    Idle,
}

#[derive(Debug)]
pub struct MoveAnimationSequencer {
    durations: AnimationDurations,
    queue: VecDeque<GhostMove>,
    current: Option<(GhostMove, AnimationPhase)>,
    running: bool,
    generation: u64,
    seq: u64,
}

impl MoveAnimationSequencer {
    pub fn new(speed: PlaybackSpeed) -> Self {
        Self {
            durations: speed.durations(),
            queue: VecDeque::new(),
            current: None,
            running: false,
            generation: 0,
            seq: 0,
        }
    }

    /// Applies from the next scheduled phase onwards.
    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.durations = speed.durations();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin playing `moves`. A no-op while already playing.
    pub fn start(&mut self, moves: impl IntoIterator<Item = GhostMove>) -> SequencerStep {
        if self.running {
            debug!("Playback already running, ignoring start");
            return SequencerStep::Idle;
        }
        self.generation += 1;
        self.running = true;
        self.queue = moves.into_iter().collect();
        self.current = None;
        info!(moves = self.queue.len(), "Starting ghost move playback");
        self.begin_next_move()
    }

    /// Clear the running flag. In-flight timers will no-op when they fire.
    pub fn stop(&mut self) {
        if self.running {
            info!("Stopping ghost move playback");
        }
        self.running = false;
        self.queue.clear();
        self.current = None;
    }

    /// A phase timer fired.
    pub fn on_timer(&mut self, ticket: PhaseTicket) -> SequencerStep {
        if !self.running || ticket.generation != self.generation || ticket.seq != self.seq {
            return SequencerStep::Idle;
        }
        let Some((ghost, phase)) = self.current else {
            return SequencerStep::Idle;
        };
        match phase.next() {
            Some(next) => self.schedule(ghost, next),
            None => self.begin_next_move(),
        }
    }

    fn begin_next_move(&mut self) -> SequencerStep {
        match self.queue.pop_front() {
            Some(ghost) => self.schedule(ghost, AnimationPhase::FadeIn),
            None => {
                self.running = false;
                self.current = None;
                info!("Ghost move playback finished");
                SequencerStep::Finished
            }
        }
    }

    fn schedule(&mut self, ghost: GhostMove, phase: AnimationPhase) -> SequencerStep {
        self.seq += 1;
        self.current = Some((ghost, phase));
        let d = self.durations;
        let (duration, square, opacity) = match phase {
            AnimationPhase::FadeIn => (d.fade_duration, ghost.from, 1.0),
            AnimationPhase::Hold => (d.stay_duration, ghost.from, 1.0),
            AnimationPhase::Translate => (d.move_duration, ghost.to, 1.0),
            AnimationPhase::FadeOut => (d.fade_duration, ghost.to, 0.0),
            AnimationPhase::PostDelay => (d.stay_duration, ghost.to, 0.0),
        };
        debug!(from = %ghost.from, to = %ghost.to, ?phase, "Scheduling animation phase");
        SequencerStep::Schedule(ScheduledPhase {
            ticket: PhaseTicket {
                generation: self.generation,
                seq: self.seq,
            },
            ghost,
            phase,
            duration,
            frame: IndicatorFrame {
                square,
                opacity,
                color: ghost.color,
            },
        })
    }
}

/// Drive `sequencer` on tokio timers until the queue finishes or playback is stopped.
///
/// `on_phase` sees every phase as it starts. The lock is never held across an
/// await, so another task may call [`MoveAnimationSequencer::stop`] at any
/// time. Returns `true` when the queue played out naturally.
pub async fn play<F>(
    sequencer: &Mutex<MoveAnimationSequencer>,
    moves: Vec<GhostMove>,
    mut on_phase: F,
) -> bool
where
    F: FnMut(&ScheduledPhase),
{
    let mut step = match sequencer.lock() {
        Ok(mut seq) => seq.start(moves),
        Err(_) => return false,
    };
    loop {
        match step {
            SequencerStep::Schedule(phase) => {
                on_phase(&phase);
                tokio::time::sleep(phase.duration).await;
                step = match sequencer.lock() {
                    Ok(mut seq) => seq.on_timer(phase.ticket),
                    Err(_) => return false,
                };
            }
            SequencerStep::Finished => return true,
            SequencerStep::Idle => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ghost(from: Square, to: Square) -> GhostMove {
        GhostMove {
            from,
            to,
            color: Color::White,
        }
    }

    fn run_to_end(seq: &mut MoveAnimationSequencer, first: SequencerStep) -> Vec<ScheduledPhase> {
        let mut phases = Vec::new();
        let mut step = first;
        while let SequencerStep::Schedule(p) = step {
            phases.push(p);
            step = seq.on_timer(p.ticket);
        }
        assert_eq!(step, SequencerStep::Finished);
        phases
    }

    #[test]
    fn test_phases_run_in_order_per_move() {
        let mut seq = MoveAnimationSequencer::new(PlaybackSpeed::Normal);
        let first = seq.start(vec![ghost(Square::E2, Square::E4), ghost(Square::E7, Square::E5)]);
        let phases = run_to_end(&mut seq, first);

        let order: Vec<AnimationPhase> = phases.iter().map(|p| p.phase).collect();
        let one_move = [
            AnimationPhase::FadeIn,
            AnimationPhase::Hold,
            AnimationPhase::Translate,
            AnimationPhase::FadeOut,
            AnimationPhase::PostDelay,
        ];
        assert_eq!(order[..5], one_move);
        assert_eq!(order[5..], one_move);
        assert!(phases[..5].iter().all(|p| p.ghost.from == Square::E2));
        assert!(phases[5..].iter().all(|p| p.ghost.from == Square::E7));
        assert!(!seq.is_running());
    }

    #[test]
    fn test_phase_durations_follow_profile() {
        let mut seq = MoveAnimationSequencer::new(PlaybackSpeed::Slow);
        let first = seq.start(vec![ghost(Square::G1, Square::F3)]);
        let phases = run_to_end(&mut seq, first);
        let durations: Vec<u128> = phases.iter().map(|p| p.duration.as_millis()).collect();
        assert_eq!(durations, vec![200, 500, 300, 200, 500]);
        assert_eq!(phases[2].frame.square, Square::F3);
        assert_eq!(phases[3].frame.opacity, 0.0);
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let mut seq = MoveAnimationSequencer::new(PlaybackSpeed::Fast);
        let first = seq.start(vec![ghost(Square::E2, Square::E4)]);
        assert!(matches!(first, SequencerStep::Schedule(_)));
        assert_eq!(seq.start(vec![ghost(Square::D2, Square::D4)]), SequencerStep::Idle);
    }

    #[test]
    fn test_stop_makes_outstanding_timer_noop() {
        let mut seq = MoveAnimationSequencer::new(PlaybackSpeed::Fast);
        let SequencerStep::Schedule(p) = seq.start(vec![ghost(Square::E2, Square::E4)]) else {
            panic!("expected a scheduled phase");
        };
        seq.stop();
        assert_eq!(seq.on_timer(p.ticket), SequencerStep::Idle);
        assert!(!seq.is_running());
    }

    #[test]
    fn test_stale_ticket_from_previous_playback_is_ignored() {
        let mut seq = MoveAnimationSequencer::new(PlaybackSpeed::Fast);
        let SequencerStep::Schedule(old) = seq.start(vec![ghost(Square::E2, Square::E4)]) else {
            panic!("expected a scheduled phase");
        };
        seq.stop();
        let SequencerStep::Schedule(new) = seq.start(vec![ghost(Square::D2, Square::D4)]) else {
            panic!("expected a scheduled phase");
        };
        assert_eq!(seq.on_timer(old.ticket), SequencerStep::Idle);
        // The live timer still advances.
        assert!(matches!(seq.on_timer(new.ticket), SequencerStep::Schedule(_)));
    }

    #[test]
    fn test_finished_reported_exactly_once() {
        let mut seq = MoveAnimationSequencer::new(PlaybackSpeed::Ludicrous);
        let first = seq.start(vec![ghost(Square::E2, Square::E4)]);
        let phases = run_to_end(&mut seq, first);
        let last = phases.last().unwrap();
        // Replaying the final ticket must not finish a second time.
        assert_eq!(seq.on_timer(last.ticket), SequencerStep::Idle);
    }

    #[test]
    fn test_empty_queue_finishes_immediately() {
        let mut seq = MoveAnimationSequencer::new(PlaybackSpeed::Normal);
        assert_eq!(seq.start(Vec::new()), SequencerStep::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_runs_whole_queue() {
        let seq = Mutex::new(MoveAnimationSequencer::new(PlaybackSpeed::Normal));
        let mut seen = Vec::new();
        let finished = play(
            &seq,
            vec![ghost(Square::E2, Square::E4), ghost(Square::E7, Square::E5)],
            |p| seen.push(p.phase),
        )
        .await;
        assert!(finished);
        assert_eq!(seen.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_stops_when_cancelled() {
        let seq = Arc::new(Mutex::new(MoveAnimationSequencer::new(PlaybackSpeed::Slow)));
        let player = {
            let seq = Arc::clone(&seq);
            tokio::spawn(async move {
                play(
                    &seq,
                    vec![ghost(Square::E2, Square::E4), ghost(Square::E7, Square::E5)],
                    |_| {},
                )
                .await
            })
        };
        tokio::time::sleep(Duration::from_millis(250)).await;
        seq.lock().unwrap().stop();
        let finished = player.await.unwrap();
        assert!(!finished);
        assert!(!seq.lock().unwrap().is_running());
    }
}
