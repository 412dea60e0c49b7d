//! Drag gesture classification.
//!
//! Raw pointer phases go in, `click`/`dragstart`/`drag`/`dragend`/`move`
//! events come out. There is no distance or time threshold: a down followed
//! by an up with no moves in between is a `dragstart` directly followed by a
//! `dragend`. Callers that care whether anything was dragged check for `drag`
//! events in between.

use crate::picking::PickResult;
use glam::{Vec2, Vec3};
use smallvec::{smallvec, SmallVec};
use std::rc::Rc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Click,
}

/// Where the pointer was and what it hit.
#[derive(Clone, Debug)]
pub struct GesturePoint {
    pub pointer: u32,
    pub ndc: Vec2,
    pub pick: Rc<PickResult>,
}

impl GesturePoint {
    pub fn floor_point(&self, group: &str) -> Option<Vec3> {
        self.pick.first(group).map(|hit| hit.point)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureKind {
    Click,
    DragStart,
    Drag,
    DragEnd,
    Move,
}

#[derive(Clone, Debug)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub current: GesturePoint,
    /// Pick captured at pointer-down; set on every drag lifecycle event.
    pub start: Option<GesturePoint>,
    /// The previously emitted position of this drag (the start for the first `drag`).
    pub previous: Option<GesturePoint>,
}

impl GestureEvent {
    fn new(kind: GestureKind, current: GesturePoint) -> Self {
        Self {
            kind,
            current,
            start: None,
            previous: None,
        }
    }

    /// Frame-to-frame pointer movement in ndc.
    pub fn screen_delta(&self) -> Option<Vec2> {
        Some(self.current.ndc - self.previous.as_ref()?.ndc)
    }

    /// Pointer movement since `dragstart`, in ndc.
    pub fn screen_offset(&self) -> Option<Vec2> {
        Some(self.current.ndc - self.start.as_ref()?.ndc)
    }

    /// Previous floor hit minus current floor hit. Subtracting it from an
    /// object position makes the object follow the pointer.
    pub fn floor_delta(&self, group: &str) -> Option<Vec3> {
        let previous = self.previous.as_ref()?.floor_point(group)?;
        Some(previous - self.current.floor_point(group)?)
    }

    /// Start floor hit minus current floor hit.
    pub fn floor_offset(&self, group: &str) -> Option<Vec3> {
        let start = self.start.as_ref()?.floor_point(group)?;
        Some(start - self.current.floor_point(group)?)
    }
}

pub type GestureEvents = SmallVec<[GestureEvent; 2]>;

#[derive(Clone, Debug, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging {
        start: GesturePoint,
        last: GesturePoint,
    },
}

/// Two-state drag classifier, one per surface.
#[derive(Clone, Debug, Default)]
pub struct DragMachine {
    state: DragState,
}

impl DragMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn feed(&mut self, phase: PointerPhase, point: GesturePoint) -> GestureEvents {
        match (phase, std::mem::take(&mut self.state)) {
            (PointerPhase::Down, DragState::Idle) => self.start(point),
            (PointerPhase::Down, DragState::Dragging { start, last }) => {
                // the up for the previous drag never arrived
                log::debug!("[gesture] pointer down while dragging; closing previous drag");
                let end = GestureEvent {
                    start: Some(start),
                    previous: Some(last.clone()),
                    ..GestureEvent::new(GestureKind::DragEnd, last)
                };
                let mut events = self.start(point);
                events.insert(0, end);
                events
            }
            (PointerPhase::Move, DragState::Dragging { start, last }) => {
                let event = GestureEvent {
                    start: Some(start.clone()),
                    previous: Some(last),
                    ..GestureEvent::new(GestureKind::Drag, point.clone())
                };
                self.state = DragState::Dragging { start, last: point };
                smallvec![event]
            }
            (PointerPhase::Move, DragState::Idle) => {
                smallvec![GestureEvent::new(GestureKind::Move, point)]
            }
            (PointerPhase::Up, DragState::Dragging { start, last }) => {
                smallvec![GestureEvent {
                    start: Some(start),
                    previous: Some(last),
                    ..GestureEvent::new(GestureKind::DragEnd, point)
                }]
            }
            (PointerPhase::Up, DragState::Idle) => SmallVec::new(),
            (PointerPhase::Click, state) => {
                self.state = state;
                smallvec![GestureEvent::new(GestureKind::Click, point)]
            }
        }
    }

    /// Abandon any drag in progress without emitting `dragend`.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    fn start(&mut self, point: GesturePoint) -> GestureEvents {
        let event = GestureEvent {
            start: Some(point.clone()),
            ..GestureEvent::new(GestureKind::DragStart, point.clone())
        };
        self.state = DragState::Dragging {
            start: point.clone(),
            last: point,
        };
        smallvec![event]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32) -> GesturePoint {
        GesturePoint {
            pointer: 1,
            ndc: Vec2::new(x, 0.0),
            pick: Rc::new(PickResult::default()),
        }
    }

    fn kinds(m: &mut DragMachine, seq: &[(PointerPhase, f32)]) -> Vec<GestureKind> {
        seq.iter()
            .flat_map(|(phase, x)| m.feed(*phase, at(*x)))
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn down_then_up_is_start_then_end() {
        let mut m = DragMachine::new();
        let k = kinds(&mut m, &[(PointerPhase::Down, 0.0), (PointerPhase::Up, 0.0)]);
        assert_eq!(k, vec![GestureKind::DragStart, GestureKind::DragEnd]);
        assert!(!m.is_dragging());
    }

    #[test]
    fn press_two_moves_release_is_one_full_drag() {
        let mut m = DragMachine::new();
        let events: Vec<GestureEvent> = [
            (PointerPhase::Down, 0.0),
            (PointerPhase::Move, 0.2),
            (PointerPhase::Move, 0.4),
            (PointerPhase::Up, 0.4),
        ]
        .into_iter()
        .flat_map(|(phase, x)| m.feed(phase, at(x)))
        .collect();
        let kinds: Vec<GestureKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                GestureKind::DragStart,
                GestureKind::Drag,
                GestureKind::Drag,
                GestureKind::DragEnd,
            ]
        );
        let end = &events[3];
        assert_eq!(end.start.as_ref().map(|p| p.ndc), Some(Vec2::ZERO));
        assert_eq!(end.previous.as_ref().map(|p| p.ndc), Some(Vec2::new(0.4, 0.0)));
        assert!(!m.is_dragging());
    }

    #[test]
    fn move_while_idle_is_hover() {
        let mut m = DragMachine::new();
        let k = kinds(&mut m, &[(PointerPhase::Move, 0.0), (PointerPhase::Up, 0.0)]);
        assert_eq!(k, vec![GestureKind::Move]);
    }

    #[test]
    fn drag_carries_previous_and_start() {
        let mut m = DragMachine::new();
        m.feed(PointerPhase::Down, at(0.0));
        let first = m.feed(PointerPhase::Move, at(0.25));
        let second = m.feed(PointerPhase::Move, at(0.5));
        assert_eq!(first[0].screen_delta(), Some(Vec2::new(0.25, 0.0)));
        assert_eq!(second[0].screen_delta(), Some(Vec2::new(0.25, 0.0)));
        assert_eq!(second[0].screen_offset(), Some(Vec2::new(0.5, 0.0)));
    }

    #[test]
    fn missed_up_closes_previous_drag() {
        let mut m = DragMachine::new();
        let k = kinds(&mut m, &[(PointerPhase::Down, 0.0), (PointerPhase::Down, 0.5)]);
        assert_eq!(k, vec![GestureKind::DragStart, GestureKind::DragEnd, GestureKind::DragStart]);
        assert!(m.is_dragging());
    }

    #[test]
    fn click_does_not_disturb_drag() {
        let mut m = DragMachine::new();
        m.feed(PointerPhase::Down, at(0.0));
        let k = kinds(&mut m, &[(PointerPhase::Click, 0.0), (PointerPhase::Move, 0.1)]);
        assert_eq!(k, vec![GestureKind::Click, GestureKind::Drag]);
    }
}
