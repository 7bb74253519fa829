/// Ambient audio collaborator. The engine only signals intent; waveform
/// synthesis lives outside the core.
pub trait AudioCue {
    /// A discrete page flick.
    fn flick(&mut self);
    /// Continuous paper rustle, used when pages turn too fast for discrete
    /// flicks. Start/stop must be safe to call redundantly.
    fn rustle_start(&mut self);
    fn rustle_stop(&mut self);
}

/// Silent collaborator for headless use (CLI, tests, export).
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioCue for NullAudio {
    fn flick(&mut self) {}
    fn rustle_start(&mut self) {}
    fn rustle_stop(&mut self) {}
}

/// Counts cues; test instrumentation.
#[derive(Debug, Default)]
pub struct CountingAudio {
    pub flicks: u32,
    pub rustle_starts: u32,
    pub rustle_stops: u32,
}

impl AudioCue for CountingAudio {
    fn flick(&mut self) {
        self.flicks += 1;
    }

    fn rustle_start(&mut self) {
        self.rustle_starts += 1;
    }

    fn rustle_stop(&mut self) {
        self.rustle_stops += 1;
    }
}
