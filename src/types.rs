use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DATA_TYPE: &str = "EEG";
pub const DEFAULT_MARKER_TYPE: &str = "Markers";

/// Timestamp post-processing applied by the XDF loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Correct timestamps with the stream's recorded clock offsets
    pub synchronize_clocks: bool,
    /// Replace jittered timestamps of regular streams by a least-squares fit
    pub dejitter_timestamps: bool,
    /// Gap (seconds) that starts a new dejitter segment
    pub jitter_break_threshold_seconds: f64,
    /// Gap (in nominal sample periods) that starts a new dejitter segment
    pub jitter_break_threshold_samples: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            synchronize_clocks: true,
            dejitter_timestamps: true,
            jitter_break_threshold_seconds: 1.0,
            jitter_break_threshold_samples: 500.0,
        }
    }
}

impl LoadOptions {
    /// Options that leave recorded timestamps untouched
    pub fn raw_timestamps() -> Self {
        Self {
            synchronize_clocks: false,
            dejitter_timestamps: false,
            ..Self::default()
        }
    }
}

/// Options for reading an XDF file into a raw recording
///
/// `stream_name` takes precedence over `data_type` when selecting the data
/// stream. `marker_stream_name` picks a single marker stream; without it every
/// stream of `marker_type` is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadXdfOptions {
    pub stream_name: Option<String>,
    pub marker_stream_name: Option<String>,
    pub data_type: String,
    pub marker_type: String,
    /// Forwarded to the recording constructor
    pub first_samp: u64,
    /// Forwarded to the loader
    pub load: LoadOptions,
}

impl Default for ReadXdfOptions {
    fn default() -> Self {
        Self {
            stream_name: None,
            marker_stream_name: None,
            data_type: DEFAULT_DATA_TYPE.to_string(),
            marker_type: DEFAULT_MARKER_TYPE.to_string(),
            first_samp: 0,
            load: LoadOptions::default(),
        }
    }
}

impl ReadXdfOptions {
    pub fn with_stream_name(mut self, name: impl Into<String>) -> Self {
        self.stream_name = Some(name.into());
        self
    }

    pub fn with_marker_stream_name(mut self, name: impl Into<String>) -> Self {
        self.marker_stream_name = Some(name.into());
        self
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    pub fn with_marker_type(mut self, marker_type: impl Into<String>) -> Self {
        self.marker_type = marker_type.into();
        self
    }

    pub fn with_first_samp(mut self, first_samp: u64) -> Self {
        self.first_samp = first_samp;
        self
    }

    pub fn with_load_options(mut self, load: LoadOptions) -> Self {
        self.load = load;
        self
    }

    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
