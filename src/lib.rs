//! Load XDF (Lab Streaming Layer) recordings as raw multichannel recordings.
//!
//! One data stream is selected by name or type and becomes a
//! channels × samples matrix; marker streams become zero-duration
//! annotations aligned to the first data sample.
//!
//! ```no_run
//! use xdf_raw::{read_raw_xdf, ReadXdfOptions};
//!
//! let raw = read_raw_xdf("session.xdf", &ReadXdfOptions::default())?;
//! for annotation in raw.annotations() {
//!     println!("{:.3}s {}", annotation.onset, annotation.description);
//! }
//! # Ok::<(), xdf_raw::XdfError>(())
//! ```

pub mod chunks;
pub mod clock;
pub mod error;
pub mod loader;
pub mod mmap_utils;
pub mod profiling;
pub mod raw;
pub mod reader;
pub mod stream;
pub mod types;
pub mod xml;

pub use error::{Result, XdfError};
pub use loader::{load_xdf, StreamLoader, XdfLoader};
pub use raw::{create_info, Annotation, Annotations, ChannelType, RawRecording, RecordingInfo};
pub use reader::{
    extract_channel_metadata, read_raw_xdf, read_raw_xdf_with, select_data_stream,
    select_marker_streams, ChannelMetadata,
};
pub use stream::{ChannelFormat, FileHeader, Stream, StreamInfo, TimeSeries};
pub use types::{LoadOptions, ReadXdfOptions};
pub use xml::XmlElement;
