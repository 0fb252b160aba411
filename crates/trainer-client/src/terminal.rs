//! Plain-text board rendering and line input for the terminal front-end.

use shakmaty::{File, Rank, Square};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use trainer_core::animation::{AnimationPhase, ScheduledPhase};
use trainer_core::GamePosition;

/// Board as eight lines of piece letters, rank 8 first unless `flipped`.
/// `marked` squares are drawn as `*` when empty.
pub fn render_board(position: &GamePosition, flipped: bool, marked: &[Square]) -> String {
    let mut out = String::new();
    for row in 0..8u32 {
        let rank = if flipped { row } else { 7 - row };
        out.push_str(&format!("{} ", rank + 1));
        for col in 0..8u32 {
            let file = if flipped { 7 - col } else { col };
            let square = Square::from_coords(File::new(file), Rank::new(rank));
            let c = match position.piece_at(square) {
                Some(piece) => piece.char(),
                None if marked.contains(&square) => '*',
                None => '.',
            };
            out.push(c);
            out.push(' ');
        }
        out.push('\n');
    }
    let files: Vec<char> = if flipped {
        "hgfedcba".chars().collect()
    } else {
        "abcdefgh".chars().collect()
    };
    out.push_str("  ");
    for f in files {
        out.push(f);
        out.push(' ');
    }
    out.push('\n');
    out
}

/// One line describing a ghost-move phase as it starts.
pub fn describe_phase(phase: &ScheduledPhase) -> Option<String> {
    let mover = if phase.ghost.color.is_white() { "White" } else { "Black" };
    match phase.phase {
        AnimationPhase::FadeIn => Some(format!("  {mover}: {} ...", phase.ghost.from)),
        AnimationPhase::Translate => Some(format!("  {mover}: {} -> {}", phase.ghost.from, phase.ghost.to)),
        _ => None,
    }
}

/// Line-oriented stdin reader.
pub struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Print `label` and read a trimmed line. `None` at end of input.
    pub async fn ask(&mut self, label: &str) -> std::io::Result<Option<String>> {
        println!("{label}");
        Ok(self.lines.next_line().await?.map(|l| l.trim().to_string()))
    }
}
