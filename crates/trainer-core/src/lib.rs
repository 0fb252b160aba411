//! Chess training session engines.
//!
//! Board input (square resolution and press/drag/tap gestures), ghost-move
//! playback, the visualization puzzle session with its climb ladder, the
//! opening repertoire builder, and the timed drills. Nothing here performs
//! network I/O: sessions hand out request values and accept results.

pub mod animation;
pub mod board;
pub mod climb;
pub mod drills;
pub mod error;
pub mod gesture;
pub mod position;
pub mod puzzle;
pub mod repertoire;
pub mod storage;

pub use error::TrainerError;
pub use position::{GamePosition, TrainingMove};
