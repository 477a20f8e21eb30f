use crate::error::{Result, XdfError};
use crate::stream::ChannelFormat;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

pub const XDF_MAGIC: &[u8] = b"XDF:";

// XDF chunk types
pub const CHUNK_FILE_HEADER: u16 = 1;
pub const CHUNK_STREAM_HEADER: u16 = 2;
pub const CHUNK_SAMPLES: u16 = 3;
pub const CHUNK_CLOCK_OFFSET: u16 = 4;
pub const CHUNK_BOUNDARY: u16 = 5;
pub const CHUNK_STREAM_FOOTER: u16 = 6;

/// One framed chunk; `content` excludes the length prefix and tag
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub tag: u16,
    pub offset: usize,
    pub content: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// Split the leading stream id off a stream-scoped chunk
    pub fn stream_id(&self) -> Result<(u32, &'a [u8])> {
        if self.content.len() < 4 {
            return Err(XdfError::ParseError(format!(
                "chunk at offset {} too short for a stream id",
                self.offset
            )));
        }
        let (id, rest) = self.content.split_at(4);
        Ok((u32::from_le_bytes([id[0], id[1], id[2], id[3]]), rest))
    }
}

/// Iterates over the chunks following the `XDF:` magic
///
/// Framing errors (truncated length, tag or content) are yielded once and end
/// the iteration.
pub struct ChunkIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ChunkIter<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < XDF_MAGIC.len() || &data[..XDF_MAGIC.len()] != XDF_MAGIC {
            return Err(XdfError::InvalidFile("missing magic string".to_string()));
        }
        Ok(Self {
            data,
            pos: XDF_MAGIC.len(),
        })
    }

    fn next_chunk(&mut self) -> Result<Chunk<'a>> {
        let offset = self.pos;
        let mut cursor = Cursor::new(&self.data[offset..]);

        let chunk_len = read_varlen_int(&mut cursor)
            .map_err(|e| truncated(offset, &format!("length: {}", e)))?;
        if chunk_len < 2 {
            return Err(truncated(offset, &format!("invalid length {}", chunk_len)));
        }
        let tag = cursor
            .read_u16::<LittleEndian>()
            .map_err(|e| truncated(offset, &format!("tag: {}", e)))?;

        let start = offset + cursor.position() as usize;
        let content_len = usize::try_from(chunk_len - 2)
            .map_err(|_| truncated(offset, "length overflow"))?;
        let end = start
            .checked_add(content_len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                truncated(
                    offset,
                    &format!("content needs {} bytes, {} left", content_len, self.data.len() - start),
                )
            })?;

        self.pos = end;
        Ok(Chunk {
            tag,
            offset,
            content: &self.data[start..end],
        })
    }
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Result<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        let chunk = self.next_chunk();
        if chunk.is_err() {
            self.pos = self.data.len();
        }
        Some(chunk)
    }
}

fn truncated(offset: usize, detail: &str) -> XdfError {
    XdfError::ParseError(format!("truncated chunk at offset {}: {}", offset, detail))
}

/// Read an XDF variable-length integer (width byte of 1, 4 or 8, then the value)
pub fn read_varlen_int<R: Read>(reader: &mut R) -> std::io::Result<u64> {
    match reader.read_u8()? {
        1 => Ok(reader.read_u8()? as u64),
        4 => Ok(reader.read_u32::<LittleEndian>()? as u64),
        8 => reader.read_u64::<LittleEndian>(),
        width => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid variable-length integer width {}", width),
        )),
    }
}

/// Samples decoded from one or more samples chunks of a stream
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValues {
    /// Row-major, `channel_count` values per sample
    Numeric(Vec<f64>),
    Strings(Vec<Vec<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub time_stamps: Vec<f64>,
    pub values: SampleValues,
    /// Last seen timestamp, the base for samples recorded without one
    pub last_timestamp: f64,
}

impl SampleBuffer {
    pub fn new(format: ChannelFormat) -> Self {
        let values = if format.is_numeric() {
            SampleValues::Numeric(Vec::new())
        } else {
            SampleValues::Strings(Vec::new())
        };
        Self {
            time_stamps: Vec::new(),
            values,
            last_timestamp: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.time_stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_stamps.is_empty()
    }
}

/// Decode the body of a samples chunk (after the stream id) into `buffer`
///
/// The buffer is only extended when the whole chunk decodes.
pub fn decode_samples(
    content: &[u8],
    format: ChannelFormat,
    channel_count: usize,
    nominal_srate: f64,
    buffer: &mut SampleBuffer,
) -> Result<usize> {
    let mut cursor = Cursor::new(content);
    let num_samples = read_varlen_int(&mut cursor)? as usize;
    let tdiff = if nominal_srate > 0.0 {
        1.0 / nominal_srate
    } else {
        0.0
    };

    let mut stamps = Vec::with_capacity(num_samples.min(content.len()));
    let mut numeric = Vec::new();
    let mut strings = Vec::new();
    let mut last_timestamp = buffer.last_timestamp;

    for _ in 0..num_samples {
        let timestamp = match cursor.read_u8()? {
            8 => cursor.read_f64::<LittleEndian>()?,
            0 => last_timestamp + tdiff,
            other => {
                return Err(XdfError::ParseError(format!(
                    "invalid timestamp size {}",
                    other
                )))
            }
        };
        last_timestamp = timestamp;
        stamps.push(timestamp);

        match format {
            ChannelFormat::String => {
                // channel_count is untrusted header input
                let mut row = Vec::with_capacity(channel_count.min(content.len()));
                for _ in 0..channel_count {
                    let len = read_varlen_int(&mut cursor)? as usize;
                    let remaining = content.len() - cursor.position() as usize;
                    if len > remaining {
                        return Err(XdfError::ParseError(format!(
                            "string value of {} bytes with {} left",
                            len, remaining
                        )));
                    }
                    let mut bytes = vec![0u8; len];
                    cursor.read_exact(&mut bytes)?;
                    row.push(String::from_utf8_lossy(&bytes).into_owned());
                }
                strings.push(row);
            }
            _ => {
                for _ in 0..channel_count {
                    numeric.push(read_numeric(&mut cursor, format)?);
                }
            }
        }
    }

    buffer.time_stamps.extend_from_slice(&stamps);
    buffer.last_timestamp = last_timestamp;
    match &mut buffer.values {
        SampleValues::Numeric(values) => values.extend_from_slice(&numeric),
        SampleValues::Strings(rows) => rows.extend(strings),
    }

    Ok(num_samples)
}

fn read_numeric<R: Read>(reader: &mut R, format: ChannelFormat) -> std::io::Result<f64> {
    Ok(match format {
        ChannelFormat::Int8 => reader.read_i8()? as f64,
        ChannelFormat::Int16 => reader.read_i16::<LittleEndian>()? as f64,
        ChannelFormat::Int32 => reader.read_i32::<LittleEndian>()? as f64,
        ChannelFormat::Int64 => reader.read_i64::<LittleEndian>()? as f64,
        ChannelFormat::Float32 => reader.read_f32::<LittleEndian>()? as f64,
        ChannelFormat::Double64 => reader.read_f64::<LittleEndian>()?,
        ChannelFormat::String => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "string values are not numeric",
            ))
        }
    })
}
