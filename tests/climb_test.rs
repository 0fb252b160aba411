mod common;

use std::sync::Arc;
use std::time::Duration;

use trainer_core::climb::{success_bonus, ClimbLadder, ClimbScore, HIGH_SCORE_KEY, SCORE_KEY};

#[test]
fn test_ladder_difficulty_resets_after_each_extra_hidden_move() {
    let ladder = ClimbLadder::generate();
    let steps = ladder.steps();
    for pair in steps.windows(2) {
        if pair[1].hidden_moves > pair[0].hidden_moves && pair[0].puzzle_difficulty < 2400 {
            assert_eq!(pair[1].puzzle_difficulty, pair[0].puzzle_difficulty - 100);
        }
    }
    let top = steps.last().unwrap();
    assert_eq!((top.puzzle_difficulty, top.hidden_moves), (2400, 31));
}

#[test]
fn test_bonus_shrinks_with_time() {
    let mut last = u32::MAX;
    for secs in [0, 3, 9, 15, 21, 27, 40] {
        let bonus = success_bonus(Duration::from_secs(secs));
        assert!((1..=10).contains(&bonus));
        assert!(bonus <= last);
        last = bonus;
    }
}

#[test]
fn test_scores_persist_under_their_keys() {
    let store = common::store();
    let mut climb = ClimbScore::open(Arc::clone(&store));
    climb.record_success(Duration::from_secs(3));
    climb.record_failure();

    assert_eq!(store.get(SCORE_KEY).unwrap().as_deref(), Some("0"));
    assert_eq!(store.get(HIGH_SCORE_KEY).unwrap().as_deref(), Some("9"));
    assert_eq!(climb.last_delta(), Some(-9));
}

#[test]
fn test_unreadable_score_starts_from_zero() {
    let store = common::store();
    store.set(SCORE_KEY, "not a number").unwrap();
    let climb = ClimbScore::open(store);
    assert_eq!(climb.score(), 0);
    assert_eq!(climb.current_step(), ClimbLadder::generate().steps()[0]);
}
