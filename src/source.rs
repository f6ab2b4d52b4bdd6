use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command as ProcCommand, ExitStatus, Stdio};

use image::GrayImage;

use crate::config::FfmpegConfig;
use crate::error::PlayError;

/// Something that yields grayscale frames one at a time.
///
/// The player owns its source for the whole run and drops it exactly once
/// when playback ends, whatever the reason; implementations release their
/// decoder resources in `Drop`.
pub trait FrameSource {
    /// Frame rate reported by the stream, if any.
    fn frame_rate(&self) -> Option<f64>;

    /// Pull the next frame. `Ok(None)` means the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<GrayImage>, PlayError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn frame_rate(&self) -> Option<f64> {
        (**self).frame_rate()
    }

    fn next_frame(&mut self) -> Result<Option<GrayImage>, PlayError> {
        (**self).next_frame()
    }
}

/// Stream properties reported by `ffprobe`.
///
/// `width` and `height` are the size of the frames ffmpeg writes, i.e. after
/// it applies the stream's rotation metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second; 0.0 when the container does not say.
    pub fps: f64,
}

/// Query `ffprobe` for the first video stream of `path`.
///
/// # Errors
///
/// Returns [`PlayError::Open`] when ffprobe cannot be run, rejects the file,
/// or finds no video stream in it.
pub fn probe(path: &Path, ffmpeg: &FfmpegConfig) -> Result<VideoInfo, PlayError> {
    let open_err = |reason: String| PlayError::Open {
        path: path.to_path_buf(),
        reason,
    };

    let output = ProcCommand::new(ffmpeg.ffprobe_cmd())
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate:stream_tags=rotate:stream_side_data=rotation",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| open_err(format!("running {}: {}", ffmpeg.ffprobe_cmd(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr.trim();
        return Err(open_err(if reason.is_empty() {
            format!("ffprobe exited with {}", output.status)
        } else {
            reason.to_string()
        }));
    }

    let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| open_err("no video stream found".to_string()))?;
    log::info!(
        "probed {}: {}x{} @ {:.3} fps",
        path.display(),
        info.width,
        info.height,
        info.fps
    );
    Ok(info)
}

/// Parse `key=value` lines printed by ffprobe. Returns `None` unless both
/// dimensions are present and non-zero.
///
/// A quarter-turn rotation (display matrix side data, or the older `rotate`
/// tag) swaps width and height, since ffmpeg auto-rotates what it decodes.
pub fn parse_probe_output(text: &str) -> Option<VideoInfo> {
    let mut width = 0u32;
    let mut height = 0u32;
    let mut r_rate = 0.0;
    let mut avg_rate = 0.0;
    let mut rotation = 0.0f64;

    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "width" => width = value.parse().unwrap_or(0),
            "height" => height = value.parse().unwrap_or(0),
            "r_frame_rate" => r_rate = parse_rate(value),
            "avg_frame_rate" => avg_rate = parse_rate(value),
            "rotation" | "TAG:rotate" => rotation = value.parse().unwrap_or(0.0),
            _ => {}
        }
    }

    if width == 0 || height == 0 {
        return None;
    }
    if (rotation.round() as i64).rem_euclid(180) == 90 {
        std::mem::swap(&mut width, &mut height);
    }
    // avg_frame_rate tracks what plays back; r_frame_rate can be a timebase
    let fps = if avg_rate > 0.0 { avg_rate } else { r_rate };
    Some(VideoInfo { width, height, fps })
}

/// Parse a rate such as `24/1`, `30000/1001` or `25`. Unknown rates
/// (`0/0`, garbage) come back as 0.0.
pub fn parse_rate(s: &str) -> f64 {
    let rate = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().unwrap_or(0.0);
            let den: f64 = den.trim().parse().unwrap_or(0.0);
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => s.trim().parse().unwrap_or(0.0),
    };
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        0.0
    }
}

/// Parse a start offset like `83.5`, `01:23.5` or `00:01:23.5` into seconds.
pub fn parse_timestamp(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    parts.iter().rev().enumerate().try_fold(0.0, |acc, (i, v)| {
        let v: f64 = v.parse().ok()?;
        if !v.is_finite() || v < 0.0 {
            return None;
        }
        Some(acc + v * 60f64.powi(i as i32))
    })
}

/// Reads `buf.len()` bytes unless the reader hits EOF first; returns how
/// many bytes were read.
fn fill_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Decoder backed by an `ffmpeg` child process writing raw 8-bit gray
/// frames (`width * height` bytes each) to its stdout.
///
/// Dropping the decoder kills and reaps the child.
#[derive(Debug)]
pub struct FfmpegDecoder {
    path: PathBuf,
    info: VideoInfo,
    child: Child,
    stdout: ChildStdout,
    exit: Option<ExitStatus>,
    frames_read: u64,
}

impl FfmpegDecoder {
    /// Probe `path` and start decoding it, optionally from `start_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`PlayError::Open`] if the file cannot be probed or ffmpeg
    /// cannot be started.
    pub fn open(path: &Path, ffmpeg: &FfmpegConfig, start_secs: Option<f64>) -> Result<Self, PlayError> {
        let info = probe(path, ffmpeg)?;

        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
        if let Some(start) = start_secs.filter(|s| *s > 0.0) {
            args.push("-ss".into());
            args.push(format!("{start:.3}"));
        }

        let mut cmd = ProcCommand::new(ffmpeg.ffmpeg_cmd());
        cmd.args(&args)
            .arg("-i")
            .arg(path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "gray", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        // Keep terminal Ctrl+C away from ffmpeg; the player stops it on drop.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let mut child = cmd
            .spawn()
            .map_err(|e| PlayError::Open {
                path: path.to_path_buf(),
                reason: format!("running {}: {}", ffmpeg.ffmpeg_cmd(), e),
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PlayError::Open {
                path: path.to_path_buf(),
                reason: "ffmpeg stdout was not captured".to_string(),
            });
        };

        log::debug!("ffmpeg started for {} ({:?})", path.display(), args);
        Ok(Self {
            path: path.to_path_buf(),
            info,
            child,
            stdout,
            exit: None,
            frames_read: 0,
        })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    fn frame_len(&self) -> usize {
        self.info.width as usize * self.info.height as usize
    }

    fn finish(&mut self) -> Result<ExitStatus, PlayError> {
        let status = self
            .child
            .wait()
            .map_err(|e| PlayError::Decode(format!("waiting for ffmpeg: {e}")))?;
        self.exit = Some(status);
        Ok(status)
    }
}

impl FrameSource for FfmpegDecoder {
    fn frame_rate(&self) -> Option<f64> {
        Some(self.info.fps).filter(|fps| *fps > 0.0)
    }

    fn next_frame(&mut self) -> Result<Option<GrayImage>, PlayError> {
        if self.exit.is_some() {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.frame_len()];
        let n = fill_or_eof(&mut self.stdout, &mut buf)
            .map_err(|e| PlayError::Decode(format!("reading frame {}: {}", self.frames_read + 1, e)))?;

        if n == 0 {
            let status = self.finish()?;
            if !status.success() {
                return Err(PlayError::Decode(format!(
                    "ffmpeg exited with {} after {} frames of {}",
                    status,
                    self.frames_read,
                    self.path.display()
                )));
            }
            log::debug!("end of stream after {} frames", self.frames_read);
            return Ok(None);
        }
        if n < buf.len() {
            return Err(PlayError::Decode(format!(
                "truncated frame {} ({} of {} bytes)",
                self.frames_read + 1,
                n,
                buf.len()
            )));
        }

        self.frames_read += 1;
        GrayImage::from_raw(self.info.width, self.info.height, buf)
            .map(Some)
            .ok_or_else(|| PlayError::Decode("frame buffer size mismatch".to_string()))
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        if self.exit.is_none() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        log::info!("video resources released ({})", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_probe_output() {
        let text = "width=1280\nheight=720\nr_frame_rate=30000/1001\navg_frame_rate=30000/1001\n";
        let info = parse_probe_output(text).unwrap();
        assert_eq!(info.width, 1280);
        assert_eq!(info.height, 720);
        assert!((info.fps - 29.97).abs() < 0.01);
    }

    #[test]
    fn falls_back_to_r_frame_rate() {
        let text = "width=320\nheight=240\nr_frame_rate=25/1\navg_frame_rate=0/0\n";
        assert_eq!(parse_probe_output(text).unwrap().fps, 25.0);
    }

    #[test]
    fn unknown_rate_is_zero() {
        let text = "width=320\nheight=240\nr_frame_rate=0/0\navg_frame_rate=0/0\n";
        assert_eq!(parse_probe_output(text).unwrap().fps, 0.0);
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let text = "width=1920\nheight=1080\nr_frame_rate=30/1\navg_frame_rate=30/1\nrotation=-90\n";
        let info = parse_probe_output(text).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));

        let text = "width=1920\nheight=1080\nr_frame_rate=30/1\navg_frame_rate=30/1\nTAG:rotate=270\n";
        let info = parse_probe_output(text).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));
    }

    #[test]
    fn half_turn_keeps_dimensions() {
        let text = "width=1920\nheight=1080\nr_frame_rate=30/1\navg_frame_rate=30/1\nrotation=180\n";
        let info = parse_probe_output(text).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
    }

    #[test]
    fn missing_stream_is_none() {
        assert!(parse_probe_output("").is_none());
        assert!(parse_probe_output("width=0\nheight=0\n").is_none());
        assert!(parse_probe_output("width=N/A\nheight=240\n").is_none());
    }

    #[test]
    fn rates() {
        assert_eq!(parse_rate("24/1"), 24.0);
        assert_eq!(parse_rate("25"), 25.0);
        assert_eq!(parse_rate("0/0"), 0.0);
        assert_eq!(parse_rate("N/A"), 0.0);
        assert_eq!(parse_rate("-5/1"), 0.0);
    }

    #[test]
    fn timestamps() {
        assert_eq!(parse_timestamp("83.5"), Some(83.5));
        assert_eq!(parse_timestamp("01:23.5"), Some(83.5));
        assert_eq!(parse_timestamp("00:01:23.5"), Some(83.5));
        assert_eq!(parse_timestamp("1:00:00"), Some(3600.0));
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("abc"), None);
        assert_eq!(parse_timestamp("1:2:3:4"), None);
        assert_eq!(parse_timestamp("-3"), None);
    }

    #[test]
    fn fill_or_eof_reports_short_reads() {
        let data = [7u8; 5];
        let mut buf = [0u8; 8];
        assert_eq!(fill_or_eof(&mut &data[..], &mut buf).unwrap(), 5);
        let mut buf = [0u8; 4];
        assert_eq!(fill_or_eof(&mut &data[..], &mut buf).unwrap(), 4);
        assert_eq!(buf, [7; 4]);
    }
}
