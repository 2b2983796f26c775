use crate::data_type::DataType;
use crate::rect::Rectangle;

/// How a failure should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The call failed; its result must not be used.
    Hard,
    /// Advisory: nothing to do, or an optional step was skipped.
    Soft,
}

impl Severity {
    /// Integer status in the `0 / >0 / <0` convention.
    pub const fn code(self) -> i32 {
        match self {
            Self::Hard => 1,
            Self::Soft => -1,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Array2dError {
    #[error("focus {focus} leaves the reserved data area {data_area}")]
    FocusOutsideDataArea {
        focus: Rectangle,
        data_area: Rectangle,
    },
    #[error("row {row} is outside the active window of {height} rows")]
    RowOutOfRange { row: usize, height: usize },
    #[error("span of {len} samples at column {col} exceeds the active width {width}")]
    SpanOutOfRange { col: usize, len: usize, width: usize },
    #[error("byte span of {len} is not a whole number of {sample_size}-byte samples")]
    PartialSample { len: usize, sample_size: usize },
    #[error("storage holds {actual} bytes but {expected} are required")]
    BufferTooSmall { expected: usize, actual: usize },
    #[error("expected {expected} rows, got {actual}")]
    RowCount { expected: usize, actual: usize },
    #[error("cannot allocate {width}x{height} samples of {sample_size} bytes")]
    Oversized {
        width: usize,
        height: usize,
        sample_size: usize,
    },
}

impl Array2dError {
    pub fn severity(&self) -> Severity {
        Severity::Hard
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error(transparent)]
    Array(#[from] Array2dError),
    #[error("invalid pixel layout: {0}")]
    InvalidLayout(String),
    #[error("region {region} is outside the image bounds {bounds}")]
    RegionOutOfBounds { region: Rectangle, bounds: Rectangle },
    #[error("region {0} is empty")]
    EmptyRegion(Rectangle),
    #[error("image has no pixel data")]
    NoPixelData,
    #[error("unsupported pixel access: {0}")]
    Unsupported(&'static str),
    #[error("array of {width}x{height} samples cannot hold region {region}")]
    ArrayTooSmall {
        region: Rectangle,
        width: usize,
        height: usize,
    },
    #[error("array holds {actual} samples but the image stores {expected}")]
    TypeMismatch { expected: DataType, actual: DataType },
    #[error("pixel {x},{y} is outside the {width}x{height} image")]
    PixelOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("pixel provider error: {0}")]
    Provider(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImageError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::EmptyRegion(_) => Severity::Soft,
            Self::Array(e) => e.severity(),
            _ => Severity::Hard,
        }
    }

    pub fn code(&self) -> i32 {
        self.severity().code()
    }
}
