//! Opening repertoire: per-side move trees and the builder session around them.

pub mod session;
pub mod tree;

use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::White, Side::Black];

    pub fn other(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => write!(f, "white"),
            Side::Black => write!(f, "black"),
        }
    }
}

impl From<shakmaty::Color> for Side {
    fn from(color: shakmaty::Color) -> Self {
        match color {
            shakmaty::Color::White => Side::White,
            shakmaty::Color::Black => Side::Black,
        }
    }
}

/// One value per side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BySide<T> {
    pub white: T,
    pub black: T,
}

impl<T> Index<Side> for BySide<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

impl<T> IndexMut<Side> for BySide<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        }
    }
}

/// The side that played the last move of `line`.
pub fn side_of_last_move<S: AsRef<str>>(line: &[S]) -> Side {
    if line.len() % 2 == 1 {
        Side::White
    } else {
        Side::Black
    }
}

/// `["e4", "e5", "f4"]` becomes `1.e4 e5 2.f4`.
pub fn line_to_pgn<S: AsRef<str>>(line: &[S]) -> String {
    let mut pgn = String::new();
    for (i, san) in line.iter().enumerate() {
        if !pgn.is_empty() {
            pgn.push(' ');
        }
        if i % 2 == 0 {
            pgn.push_str(&format!("{}.", i / 2 + 1));
        }
        pgn.push_str(san.as_ref());
    }
    pgn
}

fn move_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.").expect("valid move number pattern"))
}

/// Inverse of [`line_to_pgn`]. Also tolerates `1. e4` spacing.
pub fn pgn_to_line(pgn: &str) -> Vec<String> {
    move_number_regex()
        .replace_all(pgn, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// A played line split into the part already in the tree and the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingLine {
    pub known_line: Vec<String>,
    pub pending_line: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepertoireMiss {
    pub incidence: f64,
    pub lines: Vec<String>,
}

/// Response of the opening grader for one side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepertoireGrade {
    pub expected_depth: f64,
    pub biggest_miss: Option<RepertoireMiss>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_to_pgn() {
        assert_eq!(line_to_pgn(&["e4", "e5", "f4"]), "1.e4 e5 2.f4");
        assert_eq!(line_to_pgn(&["d4"]), "1.d4");
        assert_eq!(line_to_pgn::<&str>(&[]), "");
    }

    #[test]
    fn test_pgn_to_line() {
        assert_eq!(pgn_to_line("1.e4 e5 2.f4"), vec!["e4", "e5", "f4"]);
        assert_eq!(pgn_to_line("1. d4 Nf6 2. c4"), vec!["d4", "Nf6", "c4"]);
        assert!(pgn_to_line("").is_empty());
    }

    #[test]
    fn test_side_of_last_move() {
        assert_eq!(side_of_last_move(&["e4"]), Side::White);
        assert_eq!(side_of_last_move(&["e4", "c5"]), Side::Black);
    }

    #[test]
    fn test_grade_deserializes() {
        let raw = r#"{"expectedDepth": 4.5, "biggestMiss": {"incidence": 0.12, "lines": ["1.e4 c5"]}}"#;
        let grade: RepertoireGrade = serde_json::from_str(raw).unwrap();
        assert_eq!(grade.expected_depth, 4.5);
        assert_eq!(grade.biggest_miss.unwrap().lines, vec!["1.e4 c5"]);
    }

    #[test]
    fn test_by_side_indexing() {
        let mut counts = BySide { white: 1, black: 2 };
        counts[Side::Black] += 1;
        assert_eq!(counts[Side::White], 1);
        assert_eq!(counts[Side::Black], 3);
        assert_eq!(Side::White.other(), Side::Black);
    }
}
