/// Which driver currently holds the turn state. Exactly one of the non-idle
/// modes may be active at a time; everything else is refused until it exits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Mode {
    Idle,
    Dragging,
    Autoplaying,
    Rewinding,
    Exporting,
}

/// The single source of truth for "which page is where, and at what rotation".
///
/// `current_page` only changes at the instant a turn commits; the page
/// mid-turn (if any) is described by `turn_angle_deg` in [-180, 0].
#[derive(Clone, Debug)]
pub struct TurnState {
    page_count: usize,
    current_page: usize,
    previous_page: Option<usize>,
    mode: Mode,
    turn_angle_deg: f64,
    finished: bool,
}

impl TurnState {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            current_page: 0,
            previous_page: None,
            mode: Mode::Idle,
            turn_angle_deg: 0.0,
            finished: false,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Position before the last commit; used by the renderer to keep a
    /// manually-turned page on top while it springs into place.
    pub fn previous_page(&self) -> Option<usize> {
        self.previous_page
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn turn_angle_deg(&self) -> f64 {
        self.turn_angle_deg
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn is_idle(&self) -> bool {
        self.mode == Mode::Idle
    }

    pub fn at_last_page(&self) -> bool {
        self.page_count == 0 || self.current_page == self.page_count - 1
    }

    /// Take control of the state for `mode`. Refused unless currently idle
    /// (or already in that mode, which is a no-op).
    pub fn enter(&mut self, mode: Mode) -> bool {
        if self.mode == mode {
            return true;
        }
        if self.mode != Mode::Idle {
            return false;
        }
        self.mode = mode;
        true
    }

    /// Release control. Clears any mid-turn angle.
    pub fn exit_to_idle(&mut self) {
        self.mode = Mode::Idle;
        self.turn_angle_deg = 0.0;
    }

    pub(crate) fn set_turn_angle(&mut self, angle_deg: f64) {
        self.turn_angle_deg = angle_deg.clamp(-180.0, 0.0);
    }

    /// Jump to an absolute page. Out-of-range targets are defensive no-ops.
    pub fn set_current_page(&mut self, page: usize) {
        if self.page_count == 0 || page >= self.page_count {
            return;
        }
        if page != self.current_page {
            self.previous_page = Some(self.current_page);
            self.current_page = page;
        }
    }

    /// Commit one forward turn. Returns false at the last page.
    pub fn advance(&mut self) -> bool {
        if self.at_last_page() {
            return false;
        }
        self.set_current_page(self.current_page + 1);
        true
    }

    /// Commit one backward turn. Returns false at page 0.
    pub fn retreat(&mut self) -> bool {
        if self.current_page == 0 {
            return false;
        }
        self.set_current_page(self.current_page - 1);
        true
    }

    pub(crate) fn set_finished(&mut self, finished: bool) {
        self.finished = finished;
    }

    /// Adopt a new deck size, clamping the cursor and clearing transient state.
    pub fn resize(&mut self, page_count: usize) {
        self.page_count = page_count;
        self.current_page = if page_count == 0 {
            0
        } else {
            self.current_page.min(page_count - 1)
        };
        self.previous_page = None;
        self.turn_angle_deg = 0.0;
        self.finished = false;
    }

    /// Restart from the first page (the replay path).
    pub fn rewind_to_start(&mut self) {
        self.set_current_page(0);
        self.finished = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_refuses_second_driver() {
        let mut st = TurnState::new(5);
        assert!(st.enter(Mode::Autoplaying));
        assert!(!st.enter(Mode::Dragging));
        assert!(!st.enter(Mode::Exporting));
        assert!(st.enter(Mode::Autoplaying)); // re-entry is a no-op
        st.exit_to_idle();
        assert!(st.enter(Mode::Exporting));
    }

    #[test]
    fn advance_and_retreat_stay_in_bounds() {
        let mut st = TurnState::new(2);
        assert!(st.advance());
        assert!(!st.advance());
        assert_eq!(st.current_page(), 1);
        assert!(st.retreat());
        assert!(!st.retreat());
        assert_eq!(st.current_page(), 0);
    }

    #[test]
    fn previous_page_tracks_commits() {
        let mut st = TurnState::new(3);
        assert_eq!(st.previous_page(), None);
        st.advance();
        assert_eq!(st.previous_page(), Some(0));
        st.advance();
        assert_eq!(st.previous_page(), Some(1));
        st.retreat();
        assert_eq!(st.previous_page(), Some(2));
    }

    #[test]
    fn empty_deck_is_inert() {
        let mut st = TurnState::new(0);
        assert!(!st.advance());
        assert!(!st.retreat());
        assert_eq!(st.current_page(), 0);
        assert!(st.at_last_page());
    }

    #[test]
    fn resize_clamps_cursor() {
        let mut st = TurnState::new(5);
        st.set_current_page(4);
        st.set_finished(true);
        st.resize(2);
        assert_eq!(st.current_page(), 1);
        assert!(!st.finished());
        assert_eq!(st.previous_page(), None);
    }
}
