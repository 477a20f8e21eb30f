#![allow(dead_code)]

use std::path::{Path, PathBuf};
use xdf_raw::ChannelFormat;

const CHUNK_FILE_HEADER: u16 = 1;
const CHUNK_STREAM_HEADER: u16 = 2;
const CHUNK_SAMPLES: u16 = 3;
const CHUNK_CLOCK_OFFSET: u16 = 4;
const CHUNK_BOUNDARY: u16 = 5;
const CHUNK_STREAM_FOOTER: u16 = 6;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Writes XDF files chunk by chunk for tests
pub struct XdfBuilder {
    bytes: Vec<u8>,
}

impl XdfBuilder {
    pub fn new() -> Self {
        Self::with_datetime(None)
    }

    pub fn with_datetime(datetime: Option<&str>) -> Self {
        let mut builder = Self {
            bytes: b"XDF:".to_vec(),
        };
        let datetime = datetime
            .map(|d| format!("<datetime>{}</datetime>", d))
            .unwrap_or_default();
        let header = format!(
            "<?xml version=\"1.0\"?><info><version>1.0</version>{}</info>",
            datetime
        );
        builder.push_chunk(CHUNK_FILE_HEADER, header.as_bytes());
        builder
    }

    /// Start without a file header chunk
    pub fn headerless() -> Self {
        Self {
            bytes: b"XDF:".to_vec(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn stream(
        mut self,
        stream_id: u32,
        name: &str,
        stream_type: &str,
        channel_count: usize,
        nominal_srate: f64,
        format: ChannelFormat,
        labels: Option<&[&str]>,
    ) -> Self {
        let desc = match labels {
            Some(labels) => {
                let channels: String = labels
                    .iter()
                    .map(|label| {
                        format!(
                            "<channel><label>{}</label><unit>microvolts</unit><type>EEG</type></channel>",
                            label
                        )
                    })
                    .collect();
                format!("<desc><channels>{}</channels></desc>", channels)
            }
            None => "<desc/>".to_string(),
        };
        let xml = format!(
            "<?xml version=\"1.0\"?><info><name>{}</name><type>{}</type>\
             <channel_count>{}</channel_count><nominal_srate>{}</nominal_srate>\
             <channel_format>{}</channel_format><source_id>test-{}</source_id>{}</info>",
            name, stream_type, channel_count, nominal_srate, format, stream_id, desc
        );

        let mut content = stream_id.to_le_bytes().to_vec();
        content.extend_from_slice(xml.as_bytes());
        self.push_chunk(CHUNK_STREAM_HEADER, &content);
        self
    }

    /// Numeric samples; a `None` timestamp is left for the reader to deduce
    pub fn samples(mut self, stream_id: u32, format: ChannelFormat, rows: &[(Option<f64>, Vec<f64>)]) -> Self {
        let mut content = stream_id.to_le_bytes().to_vec();
        push_varlen(&mut content, rows.len() as u64);
        for (timestamp, values) in rows {
            push_timestamp(&mut content, *timestamp);
            for &value in values {
                match format {
                    ChannelFormat::Int8 => content.push(value as i8 as u8),
                    ChannelFormat::Int16 => content.extend_from_slice(&(value as i16).to_le_bytes()),
                    ChannelFormat::Int32 => content.extend_from_slice(&(value as i32).to_le_bytes()),
                    ChannelFormat::Int64 => content.extend_from_slice(&(value as i64).to_le_bytes()),
                    ChannelFormat::Float32 => content.extend_from_slice(&(value as f32).to_le_bytes()),
                    ChannelFormat::Double64 => content.extend_from_slice(&value.to_le_bytes()),
                    ChannelFormat::String => panic!("use string_samples for string streams"),
                }
            }
        }
        self.push_chunk(CHUNK_SAMPLES, &content);
        self
    }

    pub fn string_samples(mut self, stream_id: u32, rows: &[(Option<f64>, Vec<&str>)]) -> Self {
        let mut content = stream_id.to_le_bytes().to_vec();
        push_varlen(&mut content, rows.len() as u64);
        for (timestamp, values) in rows {
            push_timestamp(&mut content, *timestamp);
            for value in values {
                push_varlen(&mut content, value.len() as u64);
                content.extend_from_slice(value.as_bytes());
            }
        }
        self.push_chunk(CHUNK_SAMPLES, &content);
        self
    }

    pub fn markers(self, stream_id: u32, events: &[(f64, &str)]) -> Self {
        let rows: Vec<(Option<f64>, Vec<&str>)> = events
            .iter()
            .map(|(ts, label)| (Some(*ts), vec![*label]))
            .collect();
        self.string_samples(stream_id, &rows)
    }

    pub fn clock_offset(mut self, stream_id: u32, collection_time: f64, offset: f64) -> Self {
        let mut content = stream_id.to_le_bytes().to_vec();
        content.extend_from_slice(&collection_time.to_le_bytes());
        content.extend_from_slice(&offset.to_le_bytes());
        self.push_chunk(CHUNK_CLOCK_OFFSET, &content);
        self
    }

    pub fn boundary(mut self) -> Self {
        self.push_chunk(CHUNK_BOUNDARY, &[0x43u8; 16]);
        self
    }

    pub fn footer(mut self, stream_id: u32, first: f64, last: f64, count: u64) -> Self {
        let xml = format!(
            "<?xml version=\"1.0\"?><info><first_timestamp>{}</first_timestamp>\
             <last_timestamp>{}</last_timestamp><sample_count>{}</sample_count></info>",
            first, last, count
        );
        let mut content = stream_id.to_le_bytes().to_vec();
        content.extend_from_slice(xml.as_bytes());
        self.push_chunk(CHUNK_STREAM_FOOTER, &content);
        self
    }

    pub fn raw_chunk(mut self, tag: u16, content: &[u8]) -> Self {
        self.push_chunk(tag, content);
        self
    }

    /// Append bytes without framing, e.g. a cut-off chunk
    pub fn raw_bytes(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write(self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.bytes).unwrap();
        path
    }

    fn push_chunk(&mut self, tag: u16, content: &[u8]) {
        push_varlen(&mut self.bytes, content.len() as u64 + 2);
        self.bytes.extend_from_slice(&tag.to_le_bytes());
        self.bytes.extend_from_slice(content);
    }
}

fn push_varlen(out: &mut Vec<u8>, value: u64) {
    if value <= u8::MAX as u64 {
        out.push(1);
        out.push(value as u8);
    } else if value <= u32::MAX as u64 {
        out.push(4);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(8);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn push_timestamp(out: &mut Vec<u8>, timestamp: Option<f64>) {
    match timestamp {
        Some(ts) => {
            out.push(8);
            out.extend_from_slice(&ts.to_le_bytes());
        }
        None => out.push(0),
    }
}

/// Regular samples `value = sample * 10 + channel`, timestamps from `t0` at `srate`
pub fn regular_rows(samples: usize, channels: usize, t0: f64, srate: f64) -> Vec<(Option<f64>, Vec<f64>)> {
    (0..samples)
        .map(|i| {
            let values = (0..channels).map(|c| (i * 10 + c) as f64).collect();
            (Some(t0 + i as f64 / srate), values)
        })
        .collect()
}
