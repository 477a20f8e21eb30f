use thiserror::Error;

#[derive(Error, Debug)]
pub enum XdfError {
    #[error("No stream found matching {0}")]
    NoStreamFound(String),

    #[error("Invalid XDF file: {0}")]
    InvalidFile(String),

    #[error("Invalid stream header: {0}")]
    InvalidHeader(String),

    #[error("Failed to parse XDF chunk: {0}")]
    ParseError(String),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Channel count mismatch: declared {declared}, found {actual}")]
    ChannelCountMismatch { declared: usize, actual: usize },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("Stream '{0}' does not carry numeric samples")]
    NonNumericStream(String),

    #[error("Stream '{0}' has no samples")]
    EmptyStream(String),

    #[error("Invalid annotations: {0}")]
    InvalidAnnotations(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, XdfError>;
