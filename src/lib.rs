#![forbid(unsafe_code)]

pub mod audio;
pub mod composite;
pub mod deck;
pub mod encode_ffmpeg;
pub mod error;
pub mod export;
pub mod gesture;
pub mod narration;
pub mod page_store;
pub mod render_cpu;
pub mod scene;
pub mod sequencer;
pub mod session;
pub mod stack;
pub mod state;

pub use audio::{AudioCue, NullAudio};
pub use deck::{PageDeck, PageId, PageKind, PageRecord};
pub use encode_ffmpeg::{EncodeConfig, FfmpegSink};
pub use error::{FlipbookError, FlipbookResult};
pub use export::{
    CaptureSurface, ExportOptions, ExportStats, MemorySink, SceneFrame, VideoSink, export_video,
    frames_per_turn,
};
pub use gesture::{DragController, DragOutcome};
pub use narration::{NarrationState, Narrator, NullNarrator};
pub use page_store::{MemoryPageStore, PageStore, RgbaPage, load_directory};
pub use render_cpu::{CanvasSpec, CpuCompositor, FrameRGBA};
pub use scene::{ExportFrameState, PageVisual, StackCounts, page_visuals, stack_counts};
pub use sequencer::{IntervalTask, Sequencer};
pub use session::{FlipbookSession, SessionView};
pub use stack::{DepthVisual, StackSide, depth_visual};
pub use state::{Mode, TurnState};
