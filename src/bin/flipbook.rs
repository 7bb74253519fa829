use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use flipbook::{
    CanvasSpec, CpuCompositor, EncodeConfig, ExportFrameState, ExportOptions, FfmpegSink,
    SceneFrame, TurnState, export_video, load_directory,
};

#[derive(Parser, Debug)]
#[command(name = "flipbook", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single mid-turn frame as a PNG.
    Frame(FrameArgs),
    /// Record a full page-by-page traversal as an MP4 (requires `ffmpeg` on PATH).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Directory of page images, flipped in sorted file-name order.
    #[arg(long)]
    pages: PathBuf,

    /// Page index being turned (0-based).
    #[arg(long, default_value_t = 0)]
    page: usize,

    /// Turn progress in [0, 1]: 0 is flat, 1 is fully turned.
    #[arg(long, default_value_t = 0.0)]
    progress: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Print the loaded deck (page ids and content keys) as JSON.
    #[arg(long)]
    dump_deck: bool,

    #[command(flatten)]
    canvas: CanvasArgs,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Directory of page images, flipped in sorted file-name order.
    #[arg(long)]
    pages: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Milliseconds per page turn.
    #[arg(long, default_value_t = 180.0)]
    speed_ms: f64,

    /// How long the finished book stays on screen at the end, in milliseconds.
    #[arg(long, default_value_t = 500.0)]
    hold_ms: f64,

    /// Output frame rate.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    #[command(flatten)]
    canvas: CanvasArgs,
}

#[derive(Parser, Debug)]
struct CanvasArgs {
    /// Canvas width in pixels.
    #[arg(long, default_value_t = 760)]
    width: u32,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = 560)]
    height: u32,

    /// Deterministic seed for the per-page resting jitter.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl CanvasArgs {
    fn spec(&self) -> CanvasSpec {
        CanvasSpec {
            width: self.width,
            height: self.height,
            ..Default::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let (deck, store) = load_directory(&args.pages, args.canvas.seed)?;
    if args.dump_deck {
        let json = serde_json::to_string_pretty(&deck).with_context(|| "serialize deck")?;
        eprintln!("{json}");
    }
    if args.page >= deck.len() {
        anyhow::bail!("page {} out of range (deck has {} pages)", args.page, deck.len());
    }
    if !(0.0..=1.0).contains(&args.progress) {
        anyhow::bail!("progress must be in [0, 1], got {}", args.progress);
    }

    let compositor = CpuCompositor::new(args.canvas.spec(), store)?;
    let state = TurnState::new(deck.len());
    let sweep = ExportFrameState {
        sweep_page_index: args.page,
        sweep_progress: args.progress,
    };
    let frame = compositor.render(&SceneFrame::for_export(&deck, &state, &sweep))?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let (deck, store) = load_directory(&args.pages, args.canvas.seed)?;
    let mut surface = CpuCompositor::new(args.canvas.spec(), store)?;
    let mut state = TurnState::new(deck.len());

    let ms_per_frame = 1000.0 / f64::from(args.fps.max(1));
    let opts = ExportOptions {
        fps: args.fps,
        speed_ms: args.speed_ms,
        hold_frames: ((args.hold_ms / ms_per_frame).round() as u32).max(1),
    };

    let out = args.out.clone();
    let stats = export_video(
        &deck,
        &mut state,
        &mut surface,
        move |width, height| {
            let cfg = EncodeConfig::new(out, width, height, args.fps);
            Ok(Box::new(FfmpegSink::new(cfg)?) as Box<dyn flipbook::VideoSink>)
        },
        opts,
        &mut |pct| eprint!("\rexporting... {pct:5.1}%"),
    )?;
    eprintln!();

    eprintln!("wrote {} ({} frames)", args.out.display(), stats.frames_total());
    Ok(())
}
