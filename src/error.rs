use std::path::PathBuf;

use thiserror::Error;

/// Reasons the Frame Converter rejects its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// Target width must be at least one column.
    #[error("target width must be a positive integer")]
    InvalidWidth,

    /// The frame has no samples to convert.
    #[error("frame has zero size ({width}x{height})")]
    EmptyFrame {
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
    },

    /// The character grid for this frame and width is too large to build.
    #[error("output grid {cols}x{rows} is too large")]
    GridTooLarge {
        /// Requested columns.
        cols: u32,
        /// Rows derived from the frame's aspect ratio.
        rows: u32,
    },
}

/// Errors that end a playback run.
///
/// `InvalidPath` and `Open` happen before any decoder resource is held.
/// Every other variant is raised while playing, after which the decoder
/// is still released.
#[derive(Error, Debug)]
pub enum PlayError {
    /// The input file does not exist.
    #[error("the file '{}' does not exist", path.display())]
    InvalidPath {
        /// Path as given by the user.
        path: PathBuf,
    },

    /// The decoder could not open the file or found no video stream in it.
    #[error("could not open video file {}: {reason}", path.display())]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Decoder-provided detail.
        reason: String,
    },

    /// Pulling a frame failed mid-stream.
    #[error("decoding failed: {0}")]
    Decode(String),

    /// A decoded frame was rejected by the converter.
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// Writing to the terminal failed.
    #[error("writing to terminal: {0}")]
    Render(#[from] std::io::Error),
}

impl PlayError {
    /// Whether the error was raised before a decoder was acquired.
    pub fn before_open(&self) -> bool {
        matches!(self, PlayError::InvalidPath { .. } | PlayError::Open { .. })
    }
}
