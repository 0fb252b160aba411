//! Press / drag / tap disambiguation for board squares.
//!
//! A press on a square other than the currently selected one selects it
//! immediately; a quick release afterwards must not select it a second time.
//! Anything held past the tap window, or dragged over a legal destination, is
//! a drag and ends in a drop on whatever square the pointer is released over.

use std::time::{Duration, Instant};

use shakmaty::Square;
use tracing::debug;

use crate::board::{Point, SquareResolver};

/// How long a press may last and still count as a tap.
pub const TAP_WINDOW: Duration = Duration::from_millis(100);

/// What the consumer currently has selected, read fresh for every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct GestureContext<'a> {
    pub active_from: Option<Square>,
    pub legal_targets: &'a [Square],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    /// Pressed a square that was not already the active one.
    Pressed(Square),
    /// A quick press and release that was not already handled by `Pressed`.
    Tapped(Square),
    /// The legal destination under the pointer changed.
    DraggedOver(Option<Square>),
    /// Drag ended: the consumer should drop its drag-over and active-from markers.
    DragCleared,
    /// Drag released over a square. Legality is for the consumer to decide.
    Dropped(Square),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Pressed,
    TapPending,
    Dragging,
    Released,
}

#[derive(Debug, Clone, Copy)]
struct ActiveGesture {
    origin: Square,
    start: Point,
    pressed_at: Instant,
    tap_window_open: bool,
    immediate_tap: bool,
    moved: bool,
}

#[derive(Debug, Clone)]
pub struct DragGestureController {
    resolver: SquareResolver,
    active: Option<ActiveGesture>,
    dragged_over: Option<Square>,
    offset: (f32, f32),
    last_phase: GesturePhase,
}

impl DragGestureController {
    pub fn new(resolver: SquareResolver) -> Self {
        Self {
            resolver,
            active: None,
            dragged_over: None,
            offset: (0.0, 0.0),
            last_phase: GesturePhase::Idle,
        }
    }

    /// Board geometry or orientation changed.
    pub fn set_resolver(&mut self, resolver: SquareResolver) {
        self.resolver = resolver;
    }

    pub fn resolver(&self) -> &SquareResolver {
        &self.resolver
    }

    pub fn dragged_over(&self) -> Option<Square> {
        self.dragged_over
    }

    /// Visual displacement of the pressed piece from where it was grabbed.
    pub fn offset(&self) -> (f32, f32) {
        self.offset
    }

    pub fn phase(&self) -> GesturePhase {
        match self.active {
            None => self.last_phase,
            Some(g) if !g.tap_window_open || self.dragged_over.is_some() => GesturePhase::Dragging,
            Some(g) if g.moved => GesturePhase::TapPending,
            Some(_) => GesturePhase::Pressed,
        }
    }

    pub fn press(
        &mut self,
        square: Square,
        point: Point,
        now: Instant,
        ctx: GestureContext<'_>,
    ) -> Option<GestureEvent> {
        let immediate_tap = ctx.active_from != Some(square);
        self.active = Some(ActiveGesture {
            origin: square,
            start: point,
            pressed_at: now,
            tap_window_open: true,
            immediate_tap,
            moved: false,
        });
        self.offset = (0.0, 0.0);
        debug!(%square, immediate_tap, "Gesture pressed");
        immediate_tap.then_some(GestureEvent::Pressed(square))
    }

    /// Timer callback: closes the tap window once it has elapsed.
    pub fn tick(&mut self, now: Instant) {
        if let Some(gesture) = self.active.as_mut() {
            if now.saturating_duration_since(gesture.pressed_at) >= TAP_WINDOW {
                gesture.tap_window_open = false;
            }
        }
    }

    pub fn pointer_move(&mut self, point: Point, ctx: GestureContext<'_>) -> Option<GestureEvent> {
        let gesture = self.active.as_mut()?;
        gesture.moved = true;
        self.offset = (point.x - gesture.start.x, point.y - gesture.start.y);

        let hovered = self.resolver.resolve(point);
        let next = ctx.legal_targets.contains(&hovered).then_some(hovered);
        if next == self.dragged_over {
            return None;
        }
        self.dragged_over = next;
        Some(GestureEvent::DraggedOver(next))
    }

    pub fn release(&mut self, point: Point, now: Instant) -> Vec<GestureEvent> {
        self.tick(now);
        let Some(gesture) = self.active.take() else {
            return Vec::new();
        };
        self.offset = (0.0, 0.0);
        self.last_phase = GesturePhase::Released;

        if gesture.tap_window_open && self.dragged_over.is_none() {
            if gesture.immediate_tap {
                return Vec::new();
            }
            return vec![GestureEvent::Tapped(gesture.origin)];
        }

        self.dragged_over = None;
        let square = self.resolver.resolve(point);
        debug!(from = %gesture.origin, to = %square, "Gesture dropped");
        vec![GestureEvent::DragCleared, GestureEvent::Dropped(square)]
    }

    /// Another responder took over the pointer: reset visuals, report nothing.
    pub fn terminate(&mut self) {
        self.offset = (0.0, 0.0);
        self.active = None;
        self.dragged_over = None;
        self.last_phase = GesturePhase::Idle;
    }
}
