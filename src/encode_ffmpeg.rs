use std::{
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::{
    error::{FlipbookError, FlipbookResult},
    export::VideoSink,
    render_cpu::FrameRGBA,
};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// Background flattened under any non-opaque pixels.
    pub bg_rgba: [u8; 4],
}

impl EncodeConfig {
    pub fn new(out_path: impl Into<PathBuf>, width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
        }
    }

    pub fn validate(&self) -> FlipbookResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FlipbookError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(FlipbookError::validation("encode fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // Default settings target yuv420p output for maximum compatibility.
            return Err(FlipbookError::validation(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn ensure_parent_dir(path: &Path) -> FlipbookResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// MP4 recorder backed by the system `ffmpeg` binary: raw RGBA frames go in
/// over stdin, libx264/yuv420p comes out. Shelling out avoids native FFmpeg
/// dev header/lib requirements.
///
/// Dropping the sink without [`VideoSink::finish`] kills the encoder and
/// deletes the partial output file.
pub struct FfmpegSink {
    cfg: EncodeConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
    finished: bool,
}

impl FfmpegSink {
    pub fn new(cfg: EncodeConfig) -> FlipbookResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(FlipbookError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(FlipbookError::export(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if cfg.overwrite { "-y" } else { "-n" });
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            FlipbookError::export(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FlipbookError::export("failed to open ffmpeg stdin (unexpected)"))?;

        Ok(Self {
            scratch: vec![0u8; (cfg.width * cfg.height * 4) as usize],
            cfg,
            child,
            stdin: Some(stdin),
            finished: false,
        })
    }
}

impl VideoSink for FfmpegSink {
    fn write_frame(&mut self, frame: &FrameRGBA) -> FlipbookResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(FlipbookError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }
        if frame.data.len() != self.scratch.len() {
            return Err(FlipbookError::validation(
                "frame.data size mismatch with width*height*4",
            ));
        }

        flatten_premul_over(&mut self.scratch, &frame.data, self.cfg.bg_rgba);

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(FlipbookError::export("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            FlipbookError::export(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn finish(&mut self) -> FlipbookResult<()> {
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| FlipbookError::export(format!("failed to wait for ffmpeg: {e}")))?;
        self.finished = true;

        if !status.success() {
            let mut stderr = String::new();
            if let Some(pipe) = self.child.stderr.as_mut() {
                use std::io::Read as _;
                let _ = pipe.read_to_string(&mut stderr);
            }
            return Err(FlipbookError::export(format!(
                "ffmpeg exited with status {status}: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Aborted export: stop the encoder and discard the partial stream.
        drop(self.stdin.take());
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.cfg.out_path);
    }
}

/// Flatten premultiplied RGBA over an opaque background color.
fn flatten_premul_over(dst: &mut [u8], src: &[u8], bg_rgba: [u8; 4]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for i in 0..3 {
            let bg = u16::from(bg_rgba[i]);
            d[i] = (u16::from(s[i]) + ((bg * inv + 127) / 255)).min(255) as u8;
        }
        d[3] = 255;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation_catches_bad_values() {
        assert!(EncodeConfig::new("out.mp4", 0, 10, 30).validate().is_err());
        assert!(EncodeConfig::new("out.mp4", 11, 10, 30).validate().is_err());
        assert!(EncodeConfig::new("out.mp4", 10, 10, 0).validate().is_err());
        assert!(EncodeConfig::new("out.mp4", 10, 10, 30).validate().is_ok());
    }

    #[test]
    fn flatten_passes_opaque_pixels_through() {
        let src = [200u8, 100, 50, 255];
        let mut dst = [0u8; 4];
        flatten_premul_over(&mut dst, &src, [9, 9, 9, 255]);
        assert_eq!(dst, src);
    }

    #[test]
    fn flatten_blends_translucent_pixels_over_background() {
        // Premultiplied red at 50% over black stays 128,0,0.
        let src = [128u8, 0, 0, 128];
        let mut dst = [0u8; 4];
        flatten_premul_over(&mut dst, &src, [0, 0, 0, 255]);
        assert_eq!(dst, [128, 0, 0, 255]);
    }
}
