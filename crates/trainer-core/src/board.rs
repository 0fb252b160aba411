//! Pointer-to-square mapping for an on-screen board.

use shakmaty::{File, Rank, Square};

/// Bounding box of the rendered board, in the same coordinate space as pointer events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoardRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Maps pointer coordinates to squares. Out-of-board points clamp to the edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquareResolver {
    pub rect: BoardRect,
    pub flipped: bool,
}

impl SquareResolver {
    pub fn new(rect: BoardRect, flipped: bool) -> Self {
        Self { rect, flipped }
    }

    pub fn resolve(&self, point: Point) -> Square {
        let col_pct = (point.x - self.rect.left) / self.rect.width;
        let row_pct = (point.y - self.rect.top) / self.rect.height;
        let mut col = cell(col_pct);
        let mut row = cell(row_pct);
        if self.flipped {
            col = 7 - col;
            row = 7 - row;
        }
        // Row 0 is the top edge, which is rank 8 on an unflipped board.
        Square::from_coords(File::new(col), Rank::new(7 - row))
    }
}

// `as` saturates, so NaN and infinities from a degenerate rect land on 0 or 7.
fn cell(pct: f32) -> u32 {
    ((pct * 8.0).floor() as i32).clamp(0, 7) as u32
}

/// Fractional top-left corner of `square` within the board, each axis in `0.0..1.0`.
pub fn square_offset(square: Square, flipped: bool) -> (f32, f32) {
    let mut col = square.file() as u32;
    let mut row = 7 - square.rank() as u32;
    if flipped {
        col = 7 - col;
        row = 7 - row;
    }
    (col as f32 / 8.0, row as f32 / 8.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(flipped: bool) -> SquareResolver {
        SquareResolver::new(BoardRect::new(0.0, 0.0, 400.0, 400.0), flipped)
    }

    #[test]
    fn test_top_left_is_a8() {
        assert_eq!(resolver(false).resolve(Point::new(10.0, 10.0)), Square::A8);
    }

    #[test]
    fn test_bottom_right_is_h1() {
        assert_eq!(resolver(false).resolve(Point::new(399.0, 399.0)), Square::H1);
    }

    #[test]
    fn test_flipped_top_left_is_h1() {
        assert_eq!(resolver(true).resolve(Point::new(10.0, 10.0)), Square::H1);
    }

    #[test]
    fn test_out_of_board_clamps() {
        let r = resolver(false);
        assert_eq!(r.resolve(Point::new(-50.0, -50.0)), Square::A8);
        assert_eq!(r.resolve(Point::new(900.0, 900.0)), Square::H1);
        assert_eq!(r.resolve(Point::new(400.0, 0.0)), Square::H8);
    }

    #[test]
    fn test_offset_board_rect() {
        let r = SquareResolver::new(BoardRect::new(100.0, 50.0, 80.0, 80.0), false);
        // e4: column 4, row 4 from the top
        assert_eq!(r.resolve(Point::new(145.0, 95.0)), Square::E4);
    }

    #[test]
    fn test_degenerate_rect_never_fails() {
        let r = SquareResolver::new(BoardRect::new(0.0, 0.0, 0.0, 0.0), false);
        let _ = r.resolve(Point::new(5.0, 5.0));
        let _ = r.resolve(Point::new(0.0, 0.0));
    }

    #[test]
    fn test_flip_mirrors_every_cell() {
        for x in (0..400).step_by(25) {
            for y in (0..400).step_by(25) {
                let p = Point::new(x as f32 + 3.0, y as f32 + 3.0);
                let plain = resolver(false).resolve(p);
                let flipped = resolver(true).resolve(p);
                assert_eq!(flipped, plain.flip_horizontal().flip_vertical());
            }
        }
    }

    #[test]
    fn test_square_offset_round_trips_through_resolver() {
        for flipped in [false, true] {
            let r = resolver(flipped);
            for sq in Square::ALL {
                let (x, y) = square_offset(sq, flipped);
                let centre = Point::new(x * 400.0 + 25.0, y * 400.0 + 25.0);
                assert_eq!(r.resolve(centre), sq);
            }
        }
    }
}
