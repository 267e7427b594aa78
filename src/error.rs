use std::{error::Error, fmt, io};

/// An error occured while reading or writing an SLD file.
#[derive(Debug)]
pub enum SldError {
    /// The input data was malformed. String contains detailed message.
    InvalidInput(String),
    /// A layer requested pixel data from the previous frame, but no
    /// previous frame (or no such layer in it) exists. String contains
    /// detailed message.
    MissingReference(String),
    /// A value produced during encoding does not fit its wire field.
    /// String contains detailed message.
    CapacityExceeded(String),
    /// An IO error occured. Also includes errors where the input was
    /// shorter than expected.
    IoError(io::Error),
}

impl From<io::Error> for SldError {
    fn from(err: io::Error) -> Self {
        SldError::IoError(err)
    }
}

impl fmt::Display for SldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SldError::InvalidInput(msg) => write!(f, "Invalid SLD input: {}", msg),
            SldError::MissingReference(msg) => {
                write!(f, "Missing frame reference: {}", msg)
            }
            SldError::CapacityExceeded(msg) => {
                write!(f, "Value out of range for SLD output: {}", msg)
            }
            SldError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for SldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SldError::IoError(err) => Some(err),
            _ => None,
        }
    }
}
