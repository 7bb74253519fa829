use crate::{
    audio::AudioCue,
    state::{Mode, TurnState},
};

/// Rewind cadence: one backward turn per 50ms.
pub const REWIND_INTERVAL_MS: f64 = 50.0;

/// At or above this speed each turn gets a discrete flick cue; below it the
/// deck is fanning too fast for individual flicks and a continuous rustle
/// plays instead. The two are mutually exclusive.
pub const FLICK_THRESHOLD_MS: f64 = 150.0;

pub const DEFAULT_SPEED_MS: f64 = 180.0;

/// A cancellable fixed-interval schedule on the session's cooperative
/// timeline. Both autoplay and rewind run on one of these; `cancel` is
/// idempotent, so teardown can never leave a dangling driver behind.
#[derive(Clone, Copy, Debug)]
pub struct IntervalTask {
    interval_ms: f64,
    next_due: Option<f64>,
}

impl IntervalTask {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms: interval_ms.max(1.0),
            next_due: None,
        }
    }

    pub fn start(&mut self, now_ms: f64) {
        self.next_due = Some(now_ms + self.interval_ms);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn set_interval(&mut self, interval_ms: f64, now_ms: f64) {
        self.interval_ms = interval_ms.max(1.0);
        if self.next_due.is_some() {
            self.next_due = Some(now_ms + self.interval_ms);
        }
    }

    /// Consume one due tick, if any. One at a time, so the caller can stop
    /// the schedule mid-poll without processing stale ticks.
    pub fn pop_due(&mut self, now_ms: f64) -> bool {
        match self.next_due {
            Some(due) if now_ms >= due => {
                self.next_due = Some(due + self.interval_ms);
                true
            }
            _ => false,
        }
    }
}

/// Timer-driven progression through the deck: forward at `speed_ms` per
/// page, backward at the fixed rewind cadence. Writes to [`TurnState`] only
/// while it holds the corresponding mode.
#[derive(Debug)]
pub struct Sequencer {
    speed_ms: f64,
    autoplay: IntervalTask,
    rewind: IntervalTask,
    rustling: bool,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_MS)
    }
}

impl Sequencer {
    pub fn new(speed_ms: f64) -> Self {
        Self {
            speed_ms: speed_ms.max(1.0),
            autoplay: IntervalTask::new(speed_ms),
            rewind: IntervalTask::new(REWIND_INTERVAL_MS),
            rustling: false,
        }
    }

    pub fn speed_ms(&self) -> f64 {
        self.speed_ms
    }

    /// Change the page-advance cadence. Takes effect immediately, including
    /// for an autoplay already in flight (narration pacing relies on this).
    pub fn set_speed_ms(&mut self, speed_ms: f64, now_ms: f64) {
        self.speed_ms = speed_ms.max(1.0);
        self.autoplay.set_interval(self.speed_ms, now_ms);
    }

    pub fn is_autoplaying(&self) -> bool {
        self.autoplay.is_active()
    }

    pub fn is_rewinding(&self) -> bool {
        self.rewind.is_active()
    }

    pub fn start_autoplay(
        &mut self,
        state: &mut TurnState,
        now_ms: f64,
        audio: &mut dyn AudioCue,
    ) -> bool {
        if state.page_count() == 0 || !state.enter(Mode::Autoplaying) {
            return false;
        }
        self.autoplay.set_interval(self.speed_ms, now_ms);
        self.autoplay.start(now_ms);
        if self.speed_ms < FLICK_THRESHOLD_MS {
            self.start_rustle(audio);
        } else {
            self.stop_rustle(audio);
        }
        true
    }

    pub fn stop_autoplay(&mut self, state: &mut TurnState, audio: &mut dyn AudioCue) {
        self.autoplay.cancel();
        self.stop_rustle(audio);
        if state.mode() == Mode::Autoplaying {
            state.exit_to_idle();
        }
    }

    pub fn start_rewind(&mut self, state: &mut TurnState, now_ms: f64) -> bool {
        if state.current_page() == 0 || !state.enter(Mode::Rewinding) {
            return false;
        }
        self.rewind.start(now_ms);
        true
    }

    pub fn stop_rewind(&mut self, state: &mut TurnState) {
        self.rewind.cancel();
        if state.mode() == Mode::Rewinding {
            state.exit_to_idle();
        }
    }

    /// Deterministic teardown: cancel every schedule and silence the rustle.
    /// Called on session drop and before export takes exclusive control.
    pub fn cancel_all(&mut self, state: &mut TurnState, audio: &mut dyn AudioCue) {
        self.stop_autoplay(state, audio);
        self.stop_rewind(state);
    }

    /// Apply every tick due at `now_ms`. Each driver advances the state only
    /// while it still holds the matching mode, so a stop mid-poll produces
    /// no stray turns.
    pub fn tick(&mut self, state: &mut TurnState, now_ms: f64, audio: &mut dyn AudioCue) {
        while state.mode() == Mode::Autoplaying && self.autoplay.pop_due(now_ms) {
            if self.speed_ms >= FLICK_THRESHOLD_MS {
                audio.flick();
            }
            if state.advance() && !state.at_last_page() {
                continue;
            }
            state.set_finished(true);
            self.stop_autoplay(state, audio);
        }

        while state.mode() == Mode::Rewinding && self.rewind.pop_due(now_ms) {
            if state.retreat() && state.current_page() > 0 {
                continue;
            }
            state.set_finished(false);
            self.stop_rewind(state);
        }
    }

    fn start_rustle(&mut self, audio: &mut dyn AudioCue) {
        if !self.rustling {
            self.rustling = true;
            audio.rustle_start();
        }
    }

    fn stop_rustle(&mut self, audio: &mut dyn AudioCue) {
        if self.rustling {
            self.rustling = false;
            audio.rustle_stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::CountingAudio;

    #[test]
    fn interval_task_pops_one_tick_at_a_time() {
        let mut task = IntervalTask::new(10.0);
        task.start(0.0);
        assert!(!task.pop_due(5.0));
        assert!(task.pop_due(35.0));
        assert!(task.pop_due(35.0));
        assert!(task.pop_due(35.0));
        assert!(!task.pop_due(35.0));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut task = IntervalTask::new(10.0);
        task.start(0.0);
        task.cancel();
        task.cancel();
        assert!(!task.is_active());
        assert!(!task.pop_due(100.0));
    }

    #[test]
    fn slow_autoplay_flicks_fast_autoplay_rustles() {
        let mut audio = CountingAudio::default();

        let mut st = TurnState::new(3);
        let mut seq = Sequencer::new(200.0);
        seq.start_autoplay(&mut st, 0.0, &mut audio);
        seq.tick(&mut st, 200.0, &mut audio);
        assert_eq!(audio.flicks, 1);
        assert_eq!(audio.rustle_starts, 0);
        seq.stop_autoplay(&mut st, &mut audio);

        let mut st = TurnState::new(3);
        let mut seq = Sequencer::new(50.0);
        seq.start_autoplay(&mut st, 0.0, &mut audio);
        assert_eq!(audio.rustle_starts, 1);
        seq.tick(&mut st, 50.0, &mut audio);
        assert_eq!(audio.flicks, 1); // unchanged: rustle replaces flicks
        seq.stop_autoplay(&mut st, &mut audio);
        assert_eq!(audio.rustle_stops, 1);
    }

    #[test]
    fn rewind_refused_at_page_zero() {
        let mut st = TurnState::new(3);
        let mut seq = Sequencer::default();
        assert!(!seq.start_rewind(&mut st, 0.0));
        assert!(st.is_idle());
    }
}
