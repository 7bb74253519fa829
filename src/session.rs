use crate::{
    audio::AudioCue,
    deck::{PageDeck, PageId},
    error::{FlipbookError, FlipbookResult},
    export::{CaptureSurface, ExportOptions, ExportStats, VideoSink, export_video},
    gesture::{DragController, DragOutcome},
    narration::{NarrationState, Narrator, pace_ms},
    sequencer::Sequencer,
    state::{Mode, TurnState},
};

/// Read-only snapshot of the session for a UI layer or the CLI to render
/// controls from.
#[derive(Clone, Copy, Debug)]
pub struct SessionView {
    pub current_page: usize,
    pub total_pages: usize,
    pub is_autoplaying: bool,
    pub is_rewinding: bool,
    pub is_exporting: bool,
    pub animation_finished: bool,
    pub animation_speed_ms: f64,
    pub narration: NarrationState,
}

/// One open flipbook: the deck plus every driver that can move it. All
/// mutation goes through this façade, which is what keeps the single-writer
/// rule on [`TurnState`] enforceable.
///
/// Time is cooperative: callers supply `now_ms` and poll [`tick`] from their
/// own loop, so the whole session is deterministic under test.
///
/// [`tick`]: FlipbookSession::tick
pub struct FlipbookSession {
    deck: PageDeck,
    state: TurnState,
    drag: DragController,
    sequencer: Sequencer,
    audio: Box<dyn AudioCue>,
    narrator: Box<dyn Narrator>,
}

impl FlipbookSession {
    pub fn new(deck: PageDeck, audio: Box<dyn AudioCue>, narrator: Box<dyn Narrator>) -> Self {
        let state = TurnState::new(deck.len());
        Self {
            deck,
            state,
            drag: DragController::new(),
            sequencer: Sequencer::default(),
            audio,
            narrator,
        }
    }

    pub fn deck(&self) -> &PageDeck {
        &self.deck
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            current_page: self.state.current_page(),
            total_pages: self.deck.len(),
            is_autoplaying: self.sequencer.is_autoplaying(),
            is_rewinding: self.sequencer.is_rewinding(),
            is_exporting: self.state.mode() == Mode::Exporting,
            animation_finished: self.state.finished(),
            animation_speed_ms: self.sequencer.speed_ms(),
            narration: self.narrator.state(),
        }
    }

    /// Manual forward turn. Only honored while idle.
    pub fn next_page(&mut self) -> bool {
        if !self.state.is_idle() {
            return false;
        }
        if self.state.advance() {
            self.state.set_finished(false);
            self.audio.flick();
            true
        } else {
            false
        }
    }

    /// Manual backward turn. Only honored while idle.
    pub fn prev_page(&mut self) -> bool {
        if !self.state.is_idle() {
            return false;
        }
        if self.state.retreat() {
            self.state.set_finished(false);
            self.audio.flick();
            true
        } else {
            false
        }
    }

    pub fn drag_begin(&mut self, pointer_x: f64) -> bool {
        self.drag.begin(&mut self.state, pointer_x)
    }

    pub fn drag_move(&mut self, pointer_x: f64) {
        self.drag.update(&mut self.state, pointer_x);
    }

    pub fn drag_end(&mut self) -> DragOutcome {
        let outcome = self.drag.end(&mut self.state);
        if outcome == DragOutcome::Committed {
            self.audio.flick();
        }
        outcome
    }

    /// Play/pause toggle. A finished book restarts from page 0.
    pub fn toggle_play(&mut self, now_ms: f64) {
        if self.sequencer.is_autoplaying() {
            self.sequencer
                .stop_autoplay(&mut self.state, self.audio.as_mut());
            if self.narrator.state() == NarrationState::Playing {
                self.narrator.pause();
            }
            return;
        }
        if self.state.finished() {
            self.state.rewind_to_start();
        }
        if self
            .sequencer
            .start_autoplay(&mut self.state, now_ms, self.audio.as_mut())
        {
            self.narrator.resume();
        }
    }

    /// Stop everything and rewind to page 0 at the fixed rewind cadence.
    pub fn reset(&mut self, now_ms: f64) {
        self.narrator.cancel();
        self.sequencer
            .cancel_all(&mut self.state, self.audio.as_mut());
        self.drag.abort(&mut self.state);
        if self.state.current_page() > 0 {
            self.sequencer.start_rewind(&mut self.state, now_ms);
        } else {
            self.state.set_finished(false);
        }
    }

    pub fn set_speed(&mut self, speed_ms: f64, now_ms: f64) {
        self.sequencer.set_speed_ms(speed_ms, now_ms);
    }

    /// Apply every timer tick due at `now_ms`.
    pub fn tick(&mut self, now_ms: f64) {
        self.sequencer
            .tick(&mut self.state, now_ms, self.audio.as_mut());
    }

    /// Speak `script` while autoplaying, pacing the turns so the final page
    /// lands with the end of the speech.
    pub fn narrate(&mut self, script: &str, now_ms: f64) -> FlipbookResult<()> {
        if self.deck.len() < 2 {
            return Err(FlipbookError::narration(
                "narration needs at least 2 pages to pace turns against",
            ));
        }
        if !self.state.is_idle() {
            return Err(FlipbookError::narration(
                "cannot start narration while another driver holds the page-turn state",
            ));
        }
        let duration_ms = self.narrator.begin(script)?;
        self.state.rewind_to_start();
        self.sequencer
            .set_speed_ms(pace_ms(duration_ms, self.deck.len()), now_ms);
        self.sequencer
            .start_autoplay(&mut self.state, now_ms, self.audio.as_mut());
        Ok(())
    }

    pub fn stop_narration(&mut self) {
        self.narrator.cancel();
        self.sequencer
            .stop_autoplay(&mut self.state, self.audio.as_mut());
    }

    /// Swap the whole deck. Cancels every driver and clamps the cursor into
    /// the new page range.
    pub fn replace_deck(&mut self, deck: PageDeck) -> FlipbookResult<()> {
        deck.validate()?;
        self.narrator.cancel();
        self.sequencer
            .cancel_all(&mut self.state, self.audio.as_mut());
        self.drag.abort(&mut self.state);
        self.state.resize(deck.len());
        self.deck = deck;
        Ok(())
    }

    /// Repoint one page at new content without disturbing playback.
    pub fn replace_page_content(&mut self, id: PageId, content: String) -> FlipbookResult<()> {
        self.deck.replace_content(id, content)
    }

    /// Record a full forward traversal to video. Stops every live driver
    /// first; the session is idle again when this returns.
    pub fn export<F>(
        &mut self,
        surface: &mut dyn CaptureSurface,
        make_sink: F,
        opts: ExportOptions,
        on_progress: &mut dyn FnMut(f64),
    ) -> FlipbookResult<ExportStats>
    where
        F: FnOnce(u32, u32) -> FlipbookResult<Box<dyn VideoSink>>,
    {
        self.narrator.cancel();
        self.sequencer
            .cancel_all(&mut self.state, self.audio.as_mut());
        self.drag.abort(&mut self.state);
        export_video(
            &self.deck,
            &mut self.state,
            surface,
            make_sink,
            opts,
            on_progress,
        )
    }
}

impl Drop for FlipbookSession {
    fn drop(&mut self) {
        self.narrator.cancel();
        self.sequencer
            .cancel_all(&mut self.state, self.audio.as_mut());
    }
}
