use crate::error::{FlipbookError, FlipbookResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NarrationState {
    Idle,
    Generating,
    Playing,
    Error,
}

/// Narration collaborator. Speech synthesis is external; the engine only
/// needs playback state, pause/resume, and the planned duration so page
/// turns can be paced to the spoken content.
pub trait Narrator {
    fn state(&self) -> NarrationState;

    /// Begin speaking `script`, returning the planned total duration in
    /// milliseconds.
    fn begin(&mut self, script: &str) -> FlipbookResult<f64>;

    fn pause(&mut self);
    fn resume(&mut self);
    fn cancel(&mut self);
}

/// Collaborator for environments without speech support. `begin` reports a
/// narration-scoped error, which is non-fatal to the rest of the engine.
#[derive(Debug, Default)]
pub struct NullNarrator;

impl Narrator for NullNarrator {
    fn state(&self) -> NarrationState {
        NarrationState::Idle
    }

    fn begin(&mut self, _script: &str) -> FlipbookResult<f64> {
        Err(FlipbookError::narration(
            "text-to-speech is not supported in this environment",
        ))
    }

    fn pause(&mut self) {}
    fn resume(&mut self) {}
    fn cancel(&mut self) {}
}

/// Autoplay speed that spreads `duration_ms` of narration across every page
/// transition, so the last turn lands with the end of the speech.
pub fn pace_ms(duration_ms: f64, page_count: usize) -> f64 {
    duration_ms / page_count.saturating_sub(1).max(1) as f64
}

/// Planned speaking duration for a script at a given words-per-minute rate.
pub fn speaking_duration_ms(script: &str, words_per_minute: f64) -> f64 {
    let words = script.split_whitespace().count() as f64;
    words / words_per_minute * 60_000.0
}
