use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::ramp::GlyphRamp;

/// Widest output accepted from user input, in columns.
pub const MAX_WIDTH: u32 = 2000;

/// Largest character grid the converter will allocate.
pub const MAX_CELLS: u64 = 4_000_000;

/// Resampling filter used to shrink a frame to the character grid.
///
/// The choice only affects visual fidelity, never the output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resample {
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl Resample {
    fn filter_type(self) -> FilterType {
        match self {
            Resample::Nearest => FilterType::Nearest,
            Resample::Triangle => FilterType::Triangle,
            Resample::CatmullRom => FilterType::CatmullRom,
            Resample::Gaussian => FilterType::Gaussian,
            Resample::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Character grid size for a `frame_w` x `frame_h` frame rendered `width`
/// columns wide.
///
/// Returns `(columns, rows)` where `rows = round(frame_h * width / frame_w / 2)`.
/// Terminal cells are roughly twice as tall as they are wide, hence the halving.
/// `frame_w` must be non-zero.
pub fn output_dimensions(frame_w: u32, frame_h: u32, width: u32) -> (u32, u32) {
    let rows = (f64::from(frame_h) * f64::from(width) / f64::from(frame_w) / 2.0).round();
    (width, rows as u32)
}

/// Convert one grayscale frame into ASCII art `width` columns wide.
///
/// Rows are joined with `\n`, without a trailing newline. A frame so wide
/// that it rounds to zero rows produces an empty string.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidWidth`] when `width` is zero and
/// [`ConvertError::EmptyFrame`] when the frame has no pixels and
/// [`ConvertError::GridTooLarge`] when the grid would exceed [`MAX_CELLS`].
///
/// # Example
///
/// ```
/// use image::GrayImage;
/// use termreel::{frame_to_ascii, GlyphRamp};
///
/// let frame = GrayImage::new(20, 20);
/// let text = frame_to_ascii(&frame, 10, &GlyphRamp::default()).unwrap();
/// assert_eq!(text.lines().count(), 5);
/// assert!(text.lines().all(|line| line == "          "));
/// ```
pub fn frame_to_ascii(frame: &GrayImage, width: u32, ramp: &GlyphRamp) -> Result<String, ConvertError> {
    render(frame, width, ramp, Resample::default())
}

fn render(frame: &GrayImage, width: u32, ramp: &GlyphRamp, filter: Resample) -> Result<String, ConvertError> {
    if width == 0 {
        return Err(ConvertError::InvalidWidth);
    }
    let (frame_w, frame_h) = frame.dimensions();
    if frame_w == 0 || frame_h == 0 {
        return Err(ConvertError::EmptyFrame {
            width: frame_w,
            height: frame_h,
        });
    }

    let (cols, rows) = output_dimensions(frame_w, frame_h, width);
    if rows == 0 {
        return Ok(String::new());
    }
    if u64::from(cols) * u64::from(rows) > MAX_CELLS {
        return Err(ConvertError::GridTooLarge { cols, rows });
    }

    let grid = imageops::resize(frame, cols, rows, filter.filter_type());

    let mut out = String::with_capacity((cols as usize + 1) * rows as usize);
    for (i, row) in grid.as_raw().chunks_exact(cols as usize).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        ramp.map_into(row, &mut out);
    }
    Ok(out)
}

/// A converter bound to one ramp, width and filter for a whole session.
#[derive(Debug, Clone)]
pub struct FrameConverter {
    ramp: GlyphRamp,
    width: u32,
    filter: Resample,
}

impl FrameConverter {
    pub fn new(ramp: GlyphRamp, width: u32) -> Self {
        Self {
            ramp,
            width,
            filter: Resample::default(),
        }
    }

    /// Use a different resampling filter
    pub fn with_filter(mut self, filter: Resample) -> Self {
        self.filter = filter;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn ramp(&self) -> &GlyphRamp {
        &self.ramp
    }

    pub fn convert(&self, frame: &GrayImage) -> Result<String, ConvertError> {
        render(frame, self.width, &self.ramp, self.filter)
    }
}
