use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::convert::{Resample, MAX_WIDTH};
use crate::ramp::DEFAULT_RAMP;

/// Name of the config file looked up in the data directory and the
/// working directory.
pub const CONFIG_FILE: &str = "termreel.json";

fn default_width() -> u32 {
    80
}

fn default_ramp() -> String {
    DEFAULT_RAMP.to_string()
}

fn default_fallback_fps() -> f64 {
    24.0
}

fn default_start_delay_ms() -> u64 {
    1000
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

/// Where to find the ffmpeg tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FfmpegConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,
}

impl FfmpegConfig {
    pub fn ffmpeg_cmd(&self) -> &str {
        &self.ffmpeg_path
    }

    pub fn ffprobe_cmd(&self) -> &str {
        &self.ffprobe_path
    }
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
        }
    }
}

/// Application configuration. Every field has a default, so an empty JSON
/// object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Columns used when no width is given or the given one is not a number
    #[serde(default = "default_width")]
    pub default_width: u32,
    /// Glyphs from darkest to lightest
    #[serde(default = "default_ramp")]
    pub glyph_ramp: String,
    /// Frame rate used when the stream does not report a positive one
    #[serde(default = "default_fallback_fps")]
    pub fallback_fps: f64,
    /// Pause between the start banner and the first frame
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
    #[serde(default)]
    pub resample: Resample,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_width: default_width(),
            glyph_ramp: default_ramp(),
            fallback_fps: default_fallback_fps(),
            start_delay_ms: default_start_delay_ms(),
            resample: Resample::default(),
            ffmpeg: FfmpegConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let cfg: AppConfig = serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        cfg.validate().with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.glyph_ramp.is_empty() {
            return Err(anyhow!("glyph_ramp cannot be empty"));
        }
        if !self.glyph_ramp.is_ascii() {
            return Err(anyhow!(
                "glyph_ramp contains non-ASCII characters. This will cause corrupted output. Please use only ASCII characters."
            ));
        }
        if self.default_width == 0 {
            return Err(anyhow!("default_width must be a positive integer"));
        }
        if self.default_width > MAX_WIDTH {
            return Err(anyhow!(
                "default_width {} is larger than the maximum of {}",
                self.default_width,
                MAX_WIDTH
            ));
        }
        if !(self.fallback_fps.is_finite() && self.fallback_fps > 0.0) {
            return Err(anyhow!("fallback_fps must be positive, got {}", self.fallback_fps));
        }
        Ok(())
    }
}

/// Places searched for a config file, in order.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut tried: Vec<PathBuf> = Vec::new();
    if let Some(mut d) = dirs::data_dir() {
        d.push("termreel");
        d.push(CONFIG_FILE);
        tried.push(d);
    }
    tried.push(PathBuf::from(CONFIG_FILE));
    tried
}

/// Load the config from `explicit` if given, else from the first search
/// path that exists, else the built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::from_file(path);
    }

    for p in config_search_paths() {
        if p.exists() {
            log::debug!("loading config from {}", p.display());
            return AppConfig::from_file(&p);
        }
    }

    Ok(AppConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_is_all_defaults() {
        let cfg: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.default_width, 80);
        assert_eq!(cfg.glyph_ramp, " .:-=+*#%@");
        assert_eq!(cfg.fallback_fps, 24.0);
        assert_eq!(cfg.resample, Resample::Triangle);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{"default_width": 120, "resample": "lanczos3", "ffmpeg": {"ffmpeg_path": "/opt/ffmpeg"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.default_width, 120);
        assert_eq!(cfg.resample, Resample::Lanczos3);
        assert_eq!(cfg.ffmpeg.ffmpeg_cmd(), "/opt/ffmpeg");
        assert_eq!(cfg.ffmpeg.ffprobe_cmd(), "ffprobe");
        assert_eq!(cfg.start_delay_ms, 1000);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.glyph_ramp = "░▒▓".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.fallback_fps = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.default_width = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.default_width = MAX_WIDTH + 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"glyph_ramp": " #", "start_delay_ms": 0}}"#).unwrap();
        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.glyph_ramp, " #");
        assert_eq!(cfg.start_delay_ms, 0);
    }

    #[test]
    fn explicit_file_errors_name_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"glyph_ramp": ""}}"#).unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains(&file.path().display().to_string()));
    }
}
