//! Error types for the OSD compression codec.

/// Errors that can occur while encoding, decoding or drawing a canvas.
#[derive(Debug, thiserror::Error)]
pub enum OsdcError {
    /// The compressed stream does not fit the available buffer.
    /// `required` is always the true size of the stream.
    #[error("insufficient capacity: {required} bytes required, {capacity} available")]
    InsufficientCapacity { required: usize, capacity: usize },

    /// A pixel buffer is smaller than the frame it must hold.
    #[error("buffer too small: {required} bytes required, {actual} provided")]
    BufferTooSmall { required: usize, actual: usize },

    /// Invalid canvas or frame dimensions.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// A bit-depth setting is outside the range the wire format can carry.
    #[error("invalid {field}: {value}")]
    InvalidBitDepth { field: &'static str, value: u8 },

    /// The 4-bit format code is not one of the supported pixel formats.
    #[error("unsupported pixel format code: {0}")]
    UnsupportedFormat(u8),

    /// A palette entry was requested while palette mode is off.
    #[error("palette entry emitted with palette mode disabled")]
    PaletteDisabled,

    /// The stream ended before every pixel was decoded.
    #[error("stream ended with {remaining} pixels left to decode")]
    UnexpectedEnd { remaining: usize },

    /// A palette index points past the end of the cache.
    #[error("palette index {index} out of range for cache of {size}")]
    InvalidPaletteIndex { index: usize, size: usize },

    /// A run covers more pixels than remain in the frame.
    #[error("run of {run} pixels exceeds the {remaining} remaining")]
    RunOverflow { run: usize, remaining: usize },

    /// Canvas or codec configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OsdcError>;
