use crate::{
    deck::PageDeck,
    error::{FlipbookError, FlipbookResult},
    render_cpu::FrameRGBA,
    scene::{ExportFrameState, PageVisual, StackCounts, page_visuals, stack_counts},
    sequencer::DEFAULT_SPEED_MS,
    state::{Mode, TurnState},
};

/// Fixed output frame rate of the capture loop.
pub const EXPORT_FPS: u32 = 30;

/// Everything a capture surface needs to rasterize one frame.
pub struct SceneFrame<'a> {
    pub deck: &'a PageDeck,
    pub visuals: Vec<PageVisual>,
    pub stacks: StackCounts,
}

impl<'a> SceneFrame<'a> {
    /// Scene as the live state sees it (interactive rendering).
    pub fn live(deck: &'a PageDeck, state: &TurnState) -> Self {
        Self {
            deck,
            visuals: page_visuals(deck, state, None),
            stacks: stack_counts(state, None),
        }
    }

    /// Scene driven by an export sweep step; the live state's cursor and
    /// angle are ignored.
    pub fn for_export(deck: &'a PageDeck, state: &TurnState, e: &ExportFrameState) -> Self {
        Self {
            deck,
            visuals: page_visuals(deck, state, Some(e)),
            stacks: stack_counts(state, Some(e)),
        }
    }
}

/// The rendered surface the export pipeline samples. `acquire` runs before
/// the recorder is created so an unusable surface aborts the export with no
/// frames written.
pub trait CaptureSurface {
    fn dimensions(&self) -> (u32, u32);
    fn acquire(&mut self, deck: &PageDeck) -> FlipbookResult<()>;
    fn rasterize(&mut self, scene: &SceneFrame<'_>) -> FlipbookResult<FrameRGBA>;
}

/// Recorder for encoded frames. Dropping a sink without `finish` discards
/// whatever was written.
pub trait VideoSink {
    fn write_frame(&mut self, frame: &FrameRGBA) -> FlipbookResult<()>;
    fn finish(&mut self) -> FlipbookResult<()>;
}

/// In-memory sink; keeps every frame for inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<FrameRGBA>,
    pub finished: bool,
}

impl VideoSink for MemorySink {
    fn write_frame(&mut self, frame: &FrameRGBA) -> FlipbookResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> FlipbookResult<()> {
        self.finished = true;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct ExportOptions {
    pub fps: u32,
    /// Page-advance cadence being reproduced, in milliseconds per turn.
    pub speed_ms: f64,
    /// Frames of dwell on the final page, so the video does not cut off the
    /// instant the last turn lands.
    pub hold_frames: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fps: EXPORT_FPS,
            speed_ms: DEFAULT_SPEED_MS,
            hold_frames: 1,
        }
    }
}

impl ExportOptions {
    pub fn validate(&self) -> FlipbookResult<()> {
        if self.fps == 0 {
            return Err(FlipbookError::validation("export fps must be > 0"));
        }
        if !(self.speed_ms > 0.0) {
            return Err(FlipbookError::validation("export speed_ms must be > 0"));
        }
        if self.hold_frames == 0 {
            return Err(FlipbookError::validation(
                "export hold_frames must be >= 1",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub sweep_frames: u64,
    pub hold_frames: u64,
}

impl ExportStats {
    pub fn frames_total(&self) -> u64 {
        self.sweep_frames + self.hold_frames
    }
}

/// Capture frames one page transition takes at the given cadence.
pub fn frames_per_turn(speed_ms: f64, fps: u32) -> u32 {
    let ms_per_frame = 1000.0 / f64::from(fps);
    ((speed_ms / ms_per_frame).round() as u32).max(1)
}

/// Drive a full forward traversal (page 0 to last) at a fixed frame rate,
/// rasterizing and encoding each step.
///
/// Takes exclusive control of the turn state for the duration: any other
/// driver holding it refuses the export, and the state is back to Idle on
/// every exit path. The per-frame ordering is mutate -> derive scene ->
/// rasterize -> encode; a frame is never captured against a stale state.
#[tracing::instrument(
    skip(deck, state, surface, make_sink, on_progress),
    fields(pages = deck.len())
)]
pub fn export_video<F>(
    deck: &PageDeck,
    state: &mut TurnState,
    surface: &mut dyn CaptureSurface,
    make_sink: F,
    opts: ExportOptions,
    on_progress: &mut dyn FnMut(f64),
) -> FlipbookResult<ExportStats>
where
    F: FnOnce(u32, u32) -> FlipbookResult<Box<dyn VideoSink>>,
{
    opts.validate()?;
    deck.validate()?;
    if deck.len() < 2 {
        return Err(FlipbookError::validation(
            "export needs at least 2 pages to animate",
        ));
    }
    if !state.enter(Mode::Exporting) {
        return Err(FlipbookError::validation(
            "another driver holds the page-turn state",
        ));
    }

    let result = run_sweep(deck, state, surface, make_sink, opts, on_progress);
    state.exit_to_idle();
    match &result {
        Ok(stats) => tracing::debug!(frames = stats.frames_total(), "export finished"),
        Err(err) => tracing::debug!(%err, "export aborted"),
    }
    result
}

fn run_sweep<F>(
    deck: &PageDeck,
    state: &TurnState,
    surface: &mut dyn CaptureSurface,
    make_sink: F,
    opts: ExportOptions,
    on_progress: &mut dyn FnMut(f64),
) -> FlipbookResult<ExportStats>
where
    F: FnOnce(u32, u32) -> FlipbookResult<Box<dyn VideoSink>>,
{
    // Surface problems abort before the recorder exists.
    surface.acquire(deck)?;

    let (width, height) = surface.dimensions();
    let mut sink = make_sink(width, height)?;

    let fpt = frames_per_turn(opts.speed_ms, opts.fps);
    let transitions = deck.len() - 1;
    let mut stats = ExportStats::default();

    for page in 0..transitions {
        for frame in 0..fpt {
            let progress = if fpt > 1 {
                f64::from(frame) / f64::from(fpt - 1)
            } else {
                0.0
            };
            let sweep = ExportFrameState {
                sweep_page_index: page,
                sweep_progress: progress,
            };
            capture_one(deck, state, surface, sink.as_mut(), &sweep, &mut stats.sweep_frames)?;
            on_progress((page as f64 + progress) / transitions as f64 * 100.0);
        }
    }

    // Dwell on the finished book instead of cutting on the landing frame.
    let last = ExportFrameState {
        sweep_page_index: deck.len() - 1,
        sweep_progress: 0.0,
    };
    for _ in 0..opts.hold_frames {
        capture_one(deck, state, surface, sink.as_mut(), &last, &mut stats.hold_frames)?;
    }
    on_progress(100.0);

    sink.finish()
        .map_err(|e| FlipbookError::export(format!("finalize encoded stream: {e}")))?;
    Ok(stats)
}

fn capture_one(
    deck: &PageDeck,
    state: &TurnState,
    surface: &mut dyn CaptureSurface,
    sink: &mut dyn VideoSink,
    sweep: &ExportFrameState,
    counter: &mut u64,
) -> FlipbookResult<()> {
    // The scene is derived from the sweep state written this iteration;
    // capture can never observe a stale frame.
    let scene = SceneFrame::for_export(deck, state, sweep);
    let frame = surface.rasterize(&scene).map_err(|e| {
        FlipbookError::export(format!(
            "rasterize sweep page {} at {:.3}: {e}",
            sweep.sweep_page_index, sweep.sweep_progress
        ))
    })?;
    sink.write_frame(&frame).map_err(|e| {
        FlipbookError::export(format!(
            "encode sweep page {} at {:.3}: {e}",
            sweep.sweep_page_index, sweep.sweep_progress
        ))
    })?;
    *counter += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_per_turn_rounds_and_floors_at_one() {
        assert_eq!(frames_per_turn(100.0, 30), 3); // 100 / 33.3 rounds to 3
        assert_eq!(frames_per_turn(180.0, 30), 5);
        assert_eq!(frames_per_turn(5.0, 30), 1);
    }

    #[test]
    fn options_validation() {
        assert!(ExportOptions::default().validate().is_ok());
        assert!(
            ExportOptions {
                fps: 0,
                ..Default::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            ExportOptions {
                hold_frames: 0,
                ..Default::default()
            }
            .validate()
            .is_err()
        );
    }
}
