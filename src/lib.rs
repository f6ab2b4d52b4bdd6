//! # termreel - ASCII video player for the terminal
//!
//! `termreel` decodes a video with `ffmpeg`, turns every frame into
//! grayscale ASCII art and redraws the terminal at the video's frame rate.
//!
//! ## Features
//!
//! - Frame to ASCII conversion with aspect-ratio correction for terminal cells
//! - Configurable glyph ramp and resampling filter
//! - Frame pacing from the stream's reported rate (24 fps when unknown)
//! - Ctrl+C stops playback cleanly; the decoder is always released
//!
//! ## Example
//!
//! ```no_run
//! use termreel::{AsciiPlayer, CancelToken};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let player = AsciiPlayer::new();
//! let options = player.options().with_width(120);
//! let cancel = CancelToken::new();
//! cancel.install_ctrlc_handler()?;
//! let report = player.play(Path::new("clip.mp4"), &options, &cancel)?;
//! println!("{} frames", report.frames);
//! # Ok(())
//! # }
//! ```
//!
//! ## Converting single frames
//!
//! ```
//! use image::{GrayImage, Luma};
//! use termreel::{frame_to_ascii, GlyphRamp};
//!
//! let white = GrayImage::from_pixel(40, 20, Luma([255]));
//! let text = frame_to_ascii(&white, 20, &GlyphRamp::default()).unwrap();
//! assert_eq!(text.lines().count(), 5);
//! assert!(text.chars().filter(|c| *c != '\n').all(|c| c == '@'));
//! ```

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

pub mod config;
pub mod convert;
pub mod error;
pub mod player;
pub mod ramp;
pub mod screen;
pub mod source;

pub use config::{load_config, AppConfig, FfmpegConfig};
pub use convert::{frame_to_ascii, output_dimensions, FrameConverter, Resample, MAX_CELLS, MAX_WIDTH};
pub use error::{ConvertError, PlayError};
pub use player::{
    frame_interval, frame_interval_or, play_file, CancelToken, PlaybackReport, PlaybackState, Player, StopReason,
    FALLBACK_FPS,
};
pub use ramp::{GlyphRamp, DEFAULT_RAMP};
pub use screen::Screen;
pub use source::{FfmpegDecoder, FrameSource, VideoInfo};

/// Options for one playback run
#[derive(Debug, Clone)]
pub struct PlayOptions {
    /// Target width in characters (columns)
    pub width: u32,
    /// Glyphs from darkest to lightest
    pub ramp: GlyphRamp,
    /// Filter used to shrink frames to the character grid
    pub resample: Resample,
    /// Pace at this rate instead of the stream's
    pub fps: Option<f64>,
    /// Rate used when the stream reports none
    pub fallback_fps: f64,
    /// Wait between the start banner and the first frame
    pub start_delay: Duration,
    /// Seek this many seconds into the video before playing
    pub start_secs: Option<f64>,
    /// Locations of the ffmpeg tools
    pub ffmpeg: FfmpegConfig,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            width: 80,
            ramp: GlyphRamp::default(),
            resample: Resample::default(),
            fps: None,
            fallback_fps: FALLBACK_FPS,
            start_delay: Duration::from_secs(1),
            start_secs: None,
            ffmpeg: FfmpegConfig::default(),
        }
    }
}

impl PlayOptions {
    /// Build options from a validated config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            width: config.default_width,
            ramp: GlyphRamp::new(&config.glyph_ramp)?,
            resample: config.resample,
            fps: None,
            fallback_fps: config.fallback_fps,
            start_delay: Duration::from_millis(config.start_delay_ms),
            start_secs: None,
            ffmpeg: config.ffmpeg.clone(),
        })
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_ramp(mut self, ramp: GlyphRamp) -> Self {
        self.ramp = ramp;
        self
    }

    pub fn with_fps(mut self, fps: Option<f64>) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn with_start_secs(mut self, start: Option<f64>) -> Self {
        self.start_secs = start;
        self
    }
}

/// Parse a user-supplied width. Anything that is not a positive integer
/// gives `default`; widths above [`MAX_WIDTH`] are clamped to it.
///
/// ```
/// assert_eq!(termreel::parse_width("120", 80), 120);
/// assert_eq!(termreel::parse_width("wide", 80), 80);
/// assert_eq!(termreel::parse_width("4000000000", 80), termreel::MAX_WIDTH);
/// ```
pub fn parse_width(input: &str, default: u32) -> u32 {
    let input = input.trim();
    if input.is_empty() {
        return default;
    }
    match input.parse::<u32>() {
        Ok(w) if w > MAX_WIDTH && input.bytes().all(|b| b.is_ascii_digit()) => {
            log::warn!("width {w} is too wide, using {MAX_WIDTH}");
            MAX_WIDTH
        }
        Ok(w) if w > 0 && input.bytes().all(|b| b.is_ascii_digit()) => w,
        // digits that overflow u32
        Err(_) if input.bytes().all(|b| b.is_ascii_digit()) => {
            log::warn!("width {input} is too wide, using {MAX_WIDTH}");
            MAX_WIDTH
        }
        _ => {
            log::warn!("width '{input}' is not a positive integer, using {default}");
            default
        }
    }
}

/// Remove quote characters from a path typed or dropped into a prompt.
pub fn clean_input_path(input: &str) -> String {
    input.trim().replace(['"', '\''], "")
}

/// Entry point tying a config to playback.
pub struct AsciiPlayer {
    config: AppConfig,
}

impl AsciiPlayer {
    /// Create a player with default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Create a player with custom configuration
    pub fn with_config(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load configuration from a file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: AppConfig::from_file(path)?,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Playback options derived from the config.
    pub fn options(&self) -> PlayOptions {
        // validated on construction, so the ramp is always accepted
        PlayOptions::from_config(&self.config).unwrap_or_default()
    }

    /// Play a video file on stdout. See [`play_file`].
    pub fn play(&self, input: &Path, options: &PlayOptions, cancel: &CancelToken) -> Result<PlaybackReport, PlayError> {
        play_file(input, options, cancel)
    }
}

impl Default for AsciiPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_parsing() {
        assert_eq!(parse_width("80", 80), 80);
        assert_eq!(parse_width(" 40 ", 80), 40);
        assert_eq!(parse_width("", 80), 80);
        assert_eq!(parse_width("0", 80), 80);
        assert_eq!(parse_width("-5", 80), 80);
        assert_eq!(parse_width("+5", 80), 80);
        assert_eq!(parse_width("12.5", 80), 80);
        assert_eq!(parse_width("abc", 100), 100);
        assert_eq!(parse_width("2000", 80), 2000);
        assert_eq!(parse_width("2001", 80), MAX_WIDTH);
        assert_eq!(parse_width("4000000000", 80), MAX_WIDTH);
        assert_eq!(parse_width("99999999999999999999", 80), MAX_WIDTH);
    }

    #[test]
    fn strips_quotes_from_dropped_paths() {
        assert_eq!(clean_input_path("  \"/tmp/my clip.mp4\" "), "/tmp/my clip.mp4");
        assert_eq!(clean_input_path("'/tmp/a.mkv'"), "/tmp/a.mkv");
    }

    #[test]
    fn options_follow_config() {
        let cfg = AppConfig {
            default_width: 100,
            glyph_ramp: " #".to_string(),
            start_delay_ms: 0,
            ..AppConfig::default()
        };
        let opts = AsciiPlayer::with_config(cfg).unwrap().options();
        assert_eq!(opts.width, 100);
        assert_eq!(opts.ramp.as_str(), " #");
        assert_eq!(opts.start_delay, Duration::ZERO);
        assert_eq!(opts.fallback_fps, 24.0);
    }

    #[test]
    fn with_config_rejects_invalid() {
        let cfg = AppConfig {
            glyph_ramp: String::new(),
            ..AppConfig::default()
        };
        assert!(AsciiPlayer::with_config(cfg).is_err());
    }
}
