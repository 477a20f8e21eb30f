use crate::error::{Result, XdfError};
use crate::xml::XmlElement;
use nalgebra::DMatrix;
use std::fmt;
use std::str::FromStr;

/// Value format declared in a stream header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFormat {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Double64,
    String,
}

impl ChannelFormat {
    /// Encoded size of one value, `None` for variable-length strings
    pub fn value_size(&self) -> Option<usize> {
        match self {
            ChannelFormat::Int8 => Some(1),
            ChannelFormat::Int16 => Some(2),
            ChannelFormat::Int32 | ChannelFormat::Float32 => Some(4),
            ChannelFormat::Int64 | ChannelFormat::Double64 => Some(8),
            ChannelFormat::String => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ChannelFormat::String)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelFormat::Int8 => "int8",
            ChannelFormat::Int16 => "int16",
            ChannelFormat::Int32 => "int32",
            ChannelFormat::Int64 => "int64",
            ChannelFormat::Float32 => "float32",
            ChannelFormat::Double64 => "double64",
            ChannelFormat::String => "string",
        }
    }
}

impl FromStr for ChannelFormat {
    type Err = XdfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int8" => Ok(ChannelFormat::Int8),
            "int16" => Ok(ChannelFormat::Int16),
            "int32" => Ok(ChannelFormat::Int32),
            "int64" => Ok(ChannelFormat::Int64),
            "float32" => Ok(ChannelFormat::Float32),
            "double64" | "double" => Ok(ChannelFormat::Double64),
            "string" => Ok(ChannelFormat::String),
            other => Err(XdfError::InvalidHeader(format!(
                "unsupported channel format '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ChannelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary written to the end of a stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamFooter {
    pub first_timestamp: Option<f64>,
    pub last_timestamp: Option<f64>,
    pub sample_count: Option<u64>,
    pub xml: XmlElement,
}

impl StreamFooter {
    pub fn from_xml(xml: XmlElement) -> Self {
        Self {
            first_timestamp: xml.child_text("first_timestamp").and_then(|t| t.parse().ok()),
            last_timestamp: xml.child_text("last_timestamp").and_then(|t| t.parse().ok()),
            sample_count: xml.child_text("sample_count").and_then(|t| t.parse().ok()),
            xml,
        }
    }
}

/// A clock offset measurement between the recording host and a stream source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockOffset {
    pub collection_time: f64,
    pub offset: f64,
}

/// Stream metadata from the stream header chunk
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub stream_id: u32,
    pub name: String,
    pub stream_type: String,
    pub channel_count: usize,
    pub nominal_srate: f64,
    pub channel_format: ChannelFormat,
    /// Free-form `<desc>` subtree, absent when the header has none
    pub desc: Option<XmlElement>,
    /// Whole `<info>` header
    pub xml: XmlElement,
    pub footer: Option<StreamFooter>,
    pub clock_offsets: Vec<ClockOffset>,
    /// Sampling rate measured from the (processed) timestamps, 0 when undefined
    pub effective_srate: f64,
}

impl StreamInfo {
    /// Build stream info from a parsed `<info>` header
    pub fn from_header(stream_id: u32, xml: XmlElement) -> Result<Self> {
        let channel_count = required_field(&xml, "channel_count")?
            .parse::<usize>()
            .map_err(|e| {
                XdfError::InvalidHeader(format!("stream {}: channel_count: {}", stream_id, e))
            })?;
        let nominal_srate = required_field(&xml, "nominal_srate")?
            .parse::<f64>()
            .map_err(|e| {
                XdfError::InvalidHeader(format!("stream {}: nominal_srate: {}", stream_id, e))
            })?;
        let channel_format = required_field(&xml, "channel_format")?.parse::<ChannelFormat>()?;

        Ok(Self {
            stream_id,
            name: xml.child_text("name").unwrap_or_default().to_string(),
            stream_type: xml.child_text("type").unwrap_or_default().to_string(),
            channel_count,
            nominal_srate,
            channel_format,
            desc: xml.child("desc").cloned(),
            xml,
            footer: None,
            clock_offsets: Vec::new(),
            effective_srate: 0.0,
        })
    }

    /// Minimal info for streams built in memory
    pub fn new(
        stream_id: u32,
        name: impl Into<String>,
        stream_type: impl Into<String>,
        channel_count: usize,
        nominal_srate: f64,
        channel_format: ChannelFormat,
    ) -> Self {
        Self {
            stream_id,
            name: name.into(),
            stream_type: stream_type.into(),
            channel_count,
            nominal_srate,
            channel_format,
            desc: None,
            xml: XmlElement::new("info"),
            footer: None,
            clock_offsets: Vec::new(),
            effective_srate: 0.0,
        }
    }

    pub fn with_desc(mut self, desc: XmlElement) -> Self {
        self.desc = Some(desc);
        self
    }
}

fn required_field<'a>(xml: &'a XmlElement, name: &str) -> Result<&'a str> {
    xml.child_text(name)
        .map(str::trim)
        .ok_or_else(|| XdfError::InvalidHeader(format!("missing <{}>", name)))
}

/// Sample values of a stream
#[derive(Debug, Clone, PartialEq)]
pub enum TimeSeries {
    /// samples × channels
    Numeric(DMatrix<f64>),
    /// One value list per sample
    Strings(Vec<Vec<String>>),
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        match self {
            TimeSeries::Numeric(m) => m.nrows(),
            TimeSeries::Strings(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values of one sample rendered as strings
    pub fn sample_values(&self, index: usize) -> Option<Vec<String>> {
        match self {
            TimeSeries::Numeric(m) if index < m.nrows() => {
                Some(m.row(index).iter().map(|v| v.to_string()).collect())
            }
            TimeSeries::Strings(rows) => rows.get(index).cloned(),
            _ => None,
        }
    }
}

/// One stream of an XDF recording
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub info: StreamInfo,
    pub time_series: TimeSeries,
    pub time_stamps: Vec<f64>,
}

impl Stream {
    pub fn first_timestamp(&self) -> Option<f64> {
        self.time_stamps.first().copied()
    }
}

/// Recording-level metadata from the file header chunk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileHeader {
    pub version: Option<String>,
    pub datetime: Option<String>,
    pub xml: XmlElement,
}

impl FileHeader {
    pub fn from_xml(xml: XmlElement) -> Self {
        Self {
            version: xml.child_text("version").map(str::to_string),
            datetime: xml.child_text("datetime").map(str::to_string),
            xml,
        }
    }

    /// Recording start parsed from the header `datetime`, if present and well-formed
    pub fn measurement_date(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let raw = self.datetime.as_deref()?.trim();
        chrono::DateTime::parse_from_rfc3339(raw)
            .or_else(|_| chrono::DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
            .or_else(|_| chrono::DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .ok()
    }
}
