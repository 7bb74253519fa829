use crate::state::{Mode, TurnState};

/// Horizontal drag distance that maps to a full 180-degree turn.
pub const FULL_TURN_DRAG_PX: f64 = 400.0;

/// Released turns past this angle commit to the next page; anything
/// shallower springs back to 0. Fixed regardless of page count or viewport.
pub const COMMIT_ANGLE_DEG: f64 = -90.0;

/// Live gesture data. Exists only while the controller holds the state in
/// [`Mode::Dragging`].
#[derive(Clone, Copy, Debug)]
pub struct DragGesture {
    pub start_x: f64,
    pub target_page: usize,
    pub angle_deg: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragOutcome {
    /// The turn crossed the commit threshold; `current_page` advanced.
    Committed,
    /// The turn fell short; the page springs back to 0 degrees.
    Cancelled,
    /// No gesture was active (stale call, or begin was refused).
    Ignored,
}

/// Converts raw pointer movement into a turn angle and commits or cancels
/// the turn on release. Purely a function of horizontal displacement; no
/// timers, no I/O.
#[derive(Debug, Default)]
pub struct DragController {
    gesture: Option<DragGesture>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> Option<&DragGesture> {
        self.gesture.as_ref()
    }

    /// Start a gesture over the top page. Refused at the last page or while
    /// any other driver holds the state.
    pub fn begin(&mut self, state: &mut TurnState, pointer_x: f64) -> bool {
        if self.gesture.is_some() || state.at_last_page() {
            return false;
        }
        if !state.enter(Mode::Dragging) {
            return false;
        }
        self.gesture = Some(DragGesture {
            start_x: pointer_x,
            target_page: state.current_page(),
            angle_deg: 0.0,
        });
        state.set_turn_angle(0.0);
        true
    }

    /// Recompute the angle from horizontal displacement. Ignored when no
    /// gesture is active, which swallows stale updates after `end`.
    pub fn update(&mut self, state: &mut TurnState, pointer_x: f64) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        let dx = pointer_x - gesture.start_x;
        let angle = (dx / FULL_TURN_DRAG_PX * -180.0).clamp(-180.0, 0.0);
        gesture.angle_deg = angle;
        state.set_turn_angle(angle);
    }

    /// Abandon the gesture without committing, regardless of angle. Used
    /// when export takes exclusive control mid-drag.
    pub fn abort(&mut self, state: &mut TurnState) {
        if self.gesture.take().is_some() && state.mode() == Mode::Dragging {
            state.exit_to_idle();
        }
    }

    /// Release the gesture: commit past the threshold, spring back otherwise.
    /// Calling twice without an intervening `begin` is a no-op.
    pub fn end(&mut self, state: &mut TurnState) -> DragOutcome {
        let Some(gesture) = self.gesture.take() else {
            return DragOutcome::Ignored;
        };
        let outcome = if gesture.angle_deg < COMMIT_ANGLE_DEG {
            state.advance();
            state.set_finished(false);
            DragOutcome::Committed
        } else {
            DragOutcome::Cancelled
        };
        state.exit_to_idle();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacement_maps_linearly_to_angle() {
        let mut st = TurnState::new(3);
        let mut drag = DragController::new();
        assert!(drag.begin(&mut st, 0.0));
        drag.update(&mut st, -200.0);
        assert!((st.turn_angle_deg() - (-90.0)).abs() < 1e-9);
        drag.update(&mut st, -600.0);
        assert_eq!(st.turn_angle_deg(), -180.0); // clamped
        drag.update(&mut st, 100.0);
        assert_eq!(st.turn_angle_deg(), 0.0);
    }

    #[test]
    fn begin_refused_at_last_page() {
        let mut st = TurnState::new(2);
        st.set_current_page(1);
        let mut drag = DragController::new();
        assert!(!drag.begin(&mut st, 0.0));
        assert!(st.is_idle());
    }

    #[test]
    fn abort_discards_a_deep_drag_without_committing() {
        let mut st = TurnState::new(3);
        let mut drag = DragController::new();
        drag.begin(&mut st, 0.0);
        drag.update(&mut st, -390.0);
        drag.abort(&mut st);
        assert_eq!(st.current_page(), 0);
        assert!(st.is_idle());
        assert_eq!(drag.end(&mut st), DragOutcome::Ignored);
    }

    #[test]
    fn moves_after_end_are_ignored() {
        let mut st = TurnState::new(3);
        let mut drag = DragController::new();
        drag.begin(&mut st, 0.0);
        assert_eq!(drag.end(&mut st), DragOutcome::Cancelled);
        drag.update(&mut st, -300.0);
        assert_eq!(st.turn_angle_deg(), 0.0);
        assert_eq!(st.current_page(), 0);
    }
}
