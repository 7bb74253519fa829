//! The export sweep end to end, against an instrumented surface and sink.

use std::{cell::RefCell, rc::Rc};

use flipbook::{
    CaptureSurface, ExportOptions, FlipbookError, FlipbookResult, FrameRGBA, Mode, PageDeck,
    SceneFrame, TurnState, VideoSink, export_video,
};

fn deck(n: usize) -> PageDeck {
    PageDeck::from_content_keys((0..n).map(|i| format!("page_{i:02}.png")), 42)
}

#[derive(Default)]
struct Recorder {
    frames: Vec<FrameRGBA>,
    /// Visibility flags per rasterized frame, in deck order.
    visibility: Vec<Vec<bool>>,
    finished: bool,
}

struct MockSurface {
    rec: Rc<RefCell<Recorder>>,
    fail_acquire: bool,
    fail_at_frame: Option<usize>,
    rasterized: usize,
}

impl MockSurface {
    fn new(rec: Rc<RefCell<Recorder>>) -> Self {
        Self {
            rec,
            fail_acquire: false,
            fail_at_frame: None,
            rasterized: 0,
        }
    }
}

impl CaptureSurface for MockSurface {
    fn dimensions(&self) -> (u32, u32) {
        (4, 4)
    }

    fn acquire(&mut self, _deck: &PageDeck) -> FlipbookResult<()> {
        if self.fail_acquire {
            return Err(FlipbookError::capture("surface unavailable"));
        }
        Ok(())
    }

    fn rasterize(&mut self, scene: &SceneFrame<'_>) -> FlipbookResult<FrameRGBA> {
        if self.fail_at_frame == Some(self.rasterized) {
            return Err(FlipbookError::capture("surface lost mid-sweep"));
        }
        self.rasterized += 1;
        self.rec
            .borrow_mut()
            .visibility
            .push(scene.visuals.iter().map(|v| v.visible).collect());
        Ok(FrameRGBA {
            width: 4,
            height: 4,
            data: vec![0; 4 * 4 * 4],
            premultiplied: true,
        })
    }
}

struct SharedSink(Rc<RefCell<Recorder>>);

impl VideoSink for SharedSink {
    fn write_frame(&mut self, frame: &FrameRGBA) -> FlipbookResult<()> {
        self.0.borrow_mut().frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> FlipbookResult<()> {
        self.0.borrow_mut().finished = true;
        Ok(())
    }
}

fn opts_100ms() -> ExportOptions {
    ExportOptions {
        fps: 30,
        speed_ms: 100.0,
        hold_frames: 1,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn three_pages_at_100ms_produce_exactly_seven_frames() {
    init_tracing();
    let rec = Rc::new(RefCell::new(Recorder::default()));
    let mut surface = MockSurface::new(rec.clone());
    let mut state = TurnState::new(3);

    let sink_rec = rec.clone();
    let stats = export_video(
        &deck(3),
        &mut state,
        &mut surface,
        move |_w, _h| Ok(Box::new(SharedSink(sink_rec)) as Box<dyn VideoSink>),
        opts_100ms(),
        &mut |_| {},
    )
    .unwrap();

    // 2 transitions x 3 frames each, plus one held final frame.
    assert_eq!(stats.sweep_frames, 6);
    assert_eq!(stats.hold_frames, 1);
    assert_eq!(stats.frames_total(), 7);

    let rec = rec.borrow();
    assert_eq!(rec.frames.len(), 7);
    assert!(rec.finished);
    assert!(state.is_idle());
}

#[test]
fn pages_past_the_sweep_are_hidden_until_reached() {
    let rec = Rc::new(RefCell::new(Recorder::default()));
    let mut surface = MockSurface::new(rec.clone());
    let mut state = TurnState::new(4);

    let sink_rec = rec.clone();
    export_video(
        &deck(4),
        &mut state,
        &mut surface,
        move |_w, _h| Ok(Box::new(SharedSink(sink_rec)) as Box<dyn VideoSink>),
        opts_100ms(),
        &mut |_| {},
    )
    .unwrap();

    let rec = rec.borrow();
    // While page 0 turns, only pages 0 and 1 exist on screen.
    assert_eq!(rec.visibility[0], vec![true, true, false, false]);
    // While page 1 turns, page 2 has appeared but page 3 has not.
    assert_eq!(rec.visibility[3], vec![true, true, true, false]);
    // The held final frame shows everything.
    assert_eq!(rec.visibility.last().unwrap(), &vec![true, true, true, true]);
}

#[test]
fn unavailable_surface_aborts_before_the_sink_exists() {
    let rec = Rc::new(RefCell::new(Recorder::default()));
    let mut surface = MockSurface::new(rec.clone());
    surface.fail_acquire = true;
    let mut state = TurnState::new(3);

    let sink_created = Rc::new(RefCell::new(false));
    let flag = sink_created.clone();
    let sink_rec = rec.clone();
    let err = export_video(
        &deck(3),
        &mut state,
        &mut surface,
        move |_w, _h| {
            *flag.borrow_mut() = true;
            Ok(Box::new(SharedSink(sink_rec)) as Box<dyn VideoSink>)
        },
        opts_100ms(),
        &mut |_| {},
    )
    .unwrap_err();

    assert!(matches!(err, FlipbookError::Capture(_)));
    assert!(!*sink_created.borrow());
    assert!(state.is_idle());
    assert_eq!(rec.borrow().frames.len(), 0);
}

#[test]
fn frame_failure_mid_sweep_is_an_export_error_and_releases_the_state() {
    let rec = Rc::new(RefCell::new(Recorder::default()));
    let mut surface = MockSurface::new(rec.clone());
    surface.fail_at_frame = Some(3);
    let mut state = TurnState::new(3);

    let sink_rec = rec.clone();
    let err = export_video(
        &deck(3),
        &mut state,
        &mut surface,
        move |_w, _h| Ok(Box::new(SharedSink(sink_rec)) as Box<dyn VideoSink>),
        opts_100ms(),
        &mut |_| {},
    )
    .unwrap_err();

    assert!(matches!(err, FlipbookError::Export(_)));
    let rec = rec.borrow();
    assert_eq!(rec.frames.len(), 3);
    assert!(!rec.finished);
    assert!(state.is_idle());
    assert_eq!(state.mode(), Mode::Idle);
}

#[test]
fn export_refused_while_another_driver_holds_the_state() {
    let rec = Rc::new(RefCell::new(Recorder::default()));
    let mut surface = MockSurface::new(rec.clone());
    let mut state = TurnState::new(3);
    assert!(state.enter(Mode::Dragging));

    let sink_rec = rec.clone();
    let err = export_video(
        &deck(3),
        &mut state,
        &mut surface,
        move |_w, _h| Ok(Box::new(SharedSink(sink_rec)) as Box<dyn VideoSink>),
        opts_100ms(),
        &mut |_| {},
    )
    .unwrap_err();

    assert!(matches!(err, FlipbookError::Validation(_)));
    // The drag still owns the state; export never stole it.
    assert_eq!(state.mode(), Mode::Dragging);
    assert_eq!(rec.borrow().frames.len(), 0);
}

#[test]
fn single_page_decks_cannot_export() {
    let rec = Rc::new(RefCell::new(Recorder::default()));
    let mut surface = MockSurface::new(rec.clone());
    let mut state = TurnState::new(1);

    let sink_rec = rec.clone();
    let err = export_video(
        &deck(1),
        &mut state,
        &mut surface,
        move |_w, _h| Ok(Box::new(SharedSink(sink_rec)) as Box<dyn VideoSink>),
        opts_100ms(),
        &mut |_| {},
    )
    .unwrap_err();
    assert!(matches!(err, FlipbookError::Validation(_)));
}

#[test]
fn progress_is_monotonic_and_ends_at_one_hundred() {
    let rec = Rc::new(RefCell::new(Recorder::default()));
    let mut surface = MockSurface::new(rec.clone());
    let mut state = TurnState::new(5);

    let mut seen = Vec::new();
    let sink_rec = rec.clone();
    export_video(
        &deck(5),
        &mut state,
        &mut surface,
        move |_w, _h| Ok(Box::new(SharedSink(sink_rec)) as Box<dyn VideoSink>),
        ExportOptions {
            fps: 30,
            speed_ms: 180.0,
            hold_frames: 2,
        },
        &mut |pct| seen.push(pct),
    )
    .unwrap();

    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*seen.first().unwrap(), 0.0);
    assert_eq!(*seen.last().unwrap(), 100.0);
}
