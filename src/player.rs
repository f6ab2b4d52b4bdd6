use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::convert::FrameConverter;
use crate::error::PlayError;
use crate::screen::Screen;
use crate::source::{FfmpegDecoder, FrameSource};
use crate::PlayOptions;

/// Frame rate used when the stream reports none.
pub const FALLBACK_FPS: f64 = 24.0;

/// Longest single sleep between cancellation checks.
const NAP_SLICE: Duration = Duration::from_millis(50);

/// Time budget for one frame at `fps`, falling back to 24 fps when `fps` is
/// not a positive number.
///
/// ```
/// use termreel::frame_interval;
/// assert_eq!(frame_interval(0.0).as_micros(), 41_666);
/// assert_eq!(frame_interval(50.0).as_millis(), 20);
/// ```
pub fn frame_interval(fps: f64) -> Duration {
    frame_interval_or(fps, FALLBACK_FPS)
}

/// Like [`frame_interval`] with a caller-chosen fallback rate.
pub fn frame_interval_or(fps: f64, fallback: f64) -> Duration {
    let rate = if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        log::warn!("stream reports {fps} fps, pacing at {fallback} fps");
        fallback
    };
    Duration::from_secs_f64(1.0 / rate)
}

/// Shared stop flag, set from the Ctrl+C handler and polled by the player.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Route Ctrl+C to this token instead of killing the process.
    ///
    /// Can only be installed once per process.
    pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let token = self.clone();
        ctrlc::set_handler(move || token.cancel())
    }
}

/// Lifecycle of one playback run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Opening,
    Playing,
    /// The stream ran out of frames.
    Draining,
    /// The user asked to stop.
    Interrupted,
    /// Decoding or rendering failed.
    Failed,
    /// Decoder released.
    Closed,
}

/// Why a successful run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    UserCancelled,
}

/// Summary of a run that ended without error.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    pub stop: StopReason,
    /// Frames drawn.
    pub frames: u64,
    /// Frames whose processing used up the whole interval.
    pub late_frames: u64,
    /// Target time per frame.
    pub interval: Duration,
    /// Wall-clock time from the first pull to the stop.
    pub elapsed: Duration,
}

/// Pulls frames from a source, converts them and draws them at the
/// source's frame rate. Frames are never skipped: when conversion and
/// drawing overrun the interval the next frame starts immediately and
/// playback falls behind real time.
pub struct Player<W: Write> {
    screen: Screen<W>,
    converter: FrameConverter,
    cancel: CancelToken,
    fallback_fps: f64,
    fps_override: Option<f64>,
    start_delay: Duration,
    state: PlaybackState,
}

impl<W: Write> Player<W> {
    pub fn new(screen: Screen<W>, converter: FrameConverter, cancel: CancelToken) -> Self {
        Self {
            screen,
            converter,
            cancel,
            fallback_fps: FALLBACK_FPS,
            fps_override: None,
            start_delay: Duration::ZERO,
            state: PlaybackState::Opening,
        }
    }

    pub fn with_fallback_fps(mut self, fps: f64) -> Self {
        self.fallback_fps = fps;
        self
    }

    /// Pace at `fps` regardless of what the source reports.
    pub fn with_fps_override(mut self, fps: Option<f64>) -> Self {
        self.fps_override = fps;
        self
    }

    /// Show a start banner and wait this long before the first frame.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn screen(&self) -> &Screen<W> {
        &self.screen
    }

    fn transition(&mut self, next: PlaybackState) {
        log::debug!("playback {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Play `source` to the end, until cancelled, or until it fails.
    ///
    /// The source is dropped before this returns, on every path.
    ///
    /// # Errors
    ///
    /// Returns [`PlayError::Decode`], [`PlayError::Convert`] or
    /// [`PlayError::Render`] when a frame cannot be pulled, converted or
    /// drawn. Cancellation is not an error.
    pub fn play<S: FrameSource>(&mut self, mut source: S) -> Result<PlaybackReport, PlayError> {
        self.transition(PlaybackState::Playing);
        let result = self.run(&mut source);
        self.transition(match &result {
            Ok(report) if report.stop == StopReason::UserCancelled => PlaybackState::Interrupted,
            Ok(_) => PlaybackState::Draining,
            Err(_) => PlaybackState::Failed,
        });
        drop(source);
        self.transition(PlaybackState::Closed);
        result
    }

    fn run<S: FrameSource>(&mut self, source: &mut S) -> Result<PlaybackReport, PlayError> {
        let fps = self.fps_override.or_else(|| source.frame_rate()).unwrap_or(0.0);
        let interval = frame_interval_or(fps, self.fallback_fps);
        log::debug!("frame interval {:?}", interval);

        if !self.start_delay.is_zero() {
            self.screen.notice("Starting playback... Press Ctrl+C to stop.")?;
            self.nap(self.start_delay);
        }

        let mut report = PlaybackReport {
            stop: StopReason::EndOfStream,
            frames: 0,
            late_frames: 0,
            interval,
            elapsed: Duration::ZERO,
        };
        let started = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                report.stop = StopReason::UserCancelled;
                break;
            }

            let tick = Instant::now();
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                // The decoder can die from the same Ctrl+C that set the flag.
                Err(e) if self.cancel.is_cancelled() => {
                    log::debug!("ignoring decoder error after cancel: {e}");
                    report.stop = StopReason::UserCancelled;
                    break;
                }
                Err(e) => return Err(e),
            };
            let text = self.converter.convert(&frame)?;
            self.screen.draw(&text)?;
            report.frames += 1;

            match interval.checked_sub(tick.elapsed()) {
                Some(rest) if !rest.is_zero() => self.nap(rest),
                _ => {
                    report.late_frames += 1;
                    log::trace!("frame {} over budget", report.frames);
                }
            }
        }

        report.elapsed = started.elapsed();
        log::info!(
            "playback stopped ({:?}) after {} frames, {} late",
            report.stop,
            report.frames,
            report.late_frames
        );
        Ok(report)
    }

    // Sleep for `total`, waking early if cancelled.
    fn nap(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while !self.cancel.is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(NAP_SLICE));
        }
    }
}

/// Play the video at `path` on stdout.
///
/// # Errors
///
/// [`PlayError::InvalidPath`] if `path` does not exist (no decoder is
/// started), [`PlayError::Open`] if it cannot be decoded, or any error
/// [`Player::play`] returns.
pub fn play_file(path: &Path, options: &PlayOptions, cancel: &CancelToken) -> Result<PlaybackReport, PlayError> {
    if !path.exists() {
        return Err(PlayError::InvalidPath {
            path: path.to_path_buf(),
        });
    }

    let source = FfmpegDecoder::open(path, &options.ffmpeg, options.start_secs)?;
    let converter = FrameConverter::new(options.ramp.clone(), options.width).with_filter(options.resample);
    let mut player = Player::new(Screen::stdout(), converter, cancel.clone())
        .with_fallback_fps(options.fallback_fps)
        .with_fps_override(options.fps)
        .with_start_delay(options.start_delay);
    player.play(source)
}
