// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the panorama capture pipeline
//!
//! Every component reports a specific failure kind instead of unwinding.
//! The capture state machine maps each kind to a defined next state:
//!
//! | Kind | Severity | Handling |
//! |------|----------|----------|
//! | [`SensorError::SensorUnavailable`] | fatal at startup | reported to caller |
//! | [`SensorError::FrameSizeMismatch`] | transient | frame pair dropped |
//! | [`LinkError`] | recoverable | motion step aborted, sweep finishes early |
//! | [`PersistenceError`] | recoverable | logged, image counter still advances |

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Depth/color sensor errors
    Sensor(SensorError),
    /// Serial link errors from the drive controller
    Link(LinkError),
    /// Capture persistence errors
    Persistence(PersistenceError),
    /// Calibration table errors
    Calibration(CalibrationError),
    /// Configuration errors
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Which of the two sensor streams an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Depth,
    Color,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Depth => write!(f, "depth"),
            StreamKind::Color => write!(f, "color"),
        }
    }
}

/// Sensor-side errors
#[derive(Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Sensor not present or could not be opened
    SensorUnavailable(String),
    /// Reported frame geometry does not match the canonical buffers
    FrameSizeMismatch {
        stream: StreamKind,
        expected: (u32, u32, usize),
        actual: (u32, u32, usize),
    },
    /// One half of the pair was absent from the arrival event
    MissingFrame(StreamKind),
    /// Pixel format cannot be converted into the canonical format
    UnsupportedFormat {
        stream: StreamKind,
        format: String,
    },
}

/// Serial link errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Port could not be opened
    PortUnavailable(String),
    /// Write returned an error
    WriteFailed(String),
    /// Write did not complete within the write timeout
    Timeout,
    /// Port was closed underneath us
    Closed,
}

/// Capture persistence errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Raster encoding failed
    EncodingFailed(String),
    /// File could not be written
    WriteFailed(String),
}

/// Calibration table errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    /// Table length does not match the depth sensor geometry
    LengthMismatch { expected: usize, actual: usize },
    /// Dump ended in the middle of an entry
    Truncated(usize),
    /// Dump could not be read or written
    Io(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Sensor(e) => write!(f, "Sensor error: {}", e),
            AppError::Link(e) => write!(f, "Link error: {}", e),
            AppError::Persistence(e) => write!(f, "Persistence error: {}", e),
            AppError::Calibration(e) => write!(f, "Calibration error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::SensorUnavailable(msg) => write!(f, "Sensor unavailable: {}", msg),
            SensorError::FrameSizeMismatch {
                stream,
                expected,
                actual,
            } => write!(
                f,
                "{} frame size mismatch: expected {}x{} ({} bytes), got {}x{} ({} bytes)",
                stream, expected.0, expected.1, expected.2, actual.0, actual.1, actual.2
            ),
            SensorError::MissingFrame(stream) => write!(f, "Missing {} frame", stream),
            SensorError::UnsupportedFormat { stream, format } => {
                write!(f, "Unsupported {} pixel format: {}", stream, format)
            }
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::PortUnavailable(msg) => write!(f, "Serial port unavailable: {}", msg),
            LinkError::WriteFailed(msg) => write!(f, "Write failed: {}", msg),
            LinkError::Timeout => write!(f, "Write timed out"),
            LinkError::Closed => write!(f, "Serial port closed"),
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            PersistenceError::WriteFailed(msg) => write!(f, "Write failed: {}", msg),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::LengthMismatch { expected, actual } => write!(
                f,
                "Table has {} entries, expected {}",
                actual, expected
            ),
            CalibrationError::Truncated(len) => {
                write!(f, "Dump truncated ({} bytes is not a whole number of entries)", len)
            }
            CalibrationError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SensorError {}
impl std::error::Error for LinkError {}
impl std::error::Error for PersistenceError {}
impl std::error::Error for CalibrationError {}

// Conversions from sub-errors to AppError
impl From<SensorError> for AppError {
    fn from(err: SensorError) -> Self {
        AppError::Sensor(err)
    }
}

impl From<LinkError> for AppError {
    fn from(err: LinkError) -> Self {
        AppError::Link(err)
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        AppError::Persistence(err)
    }
}

impl From<CalibrationError> for AppError {
    fn from(err: CalibrationError) -> Self {
        AppError::Calibration(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::WriteFailed(err.to_string())
    }
}

impl From<image::ImageError> for PersistenceError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => PersistenceError::WriteFailed(e.to_string()),
            other => PersistenceError::EncodingFailed(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CalibrationError {
    fn from(err: std::io::Error) -> Self {
        CalibrationError::Io(err.to_string())
    }
}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => LinkError::Timeout,
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected => LinkError::Closed,
            _ => LinkError::WriteFailed(err.to_string()),
        }
    }
}

impl From<serialport::Error> for LinkError {
    fn from(err: serialport::Error) -> Self {
        LinkError::PortUnavailable(err.to_string())
    }
}
