use crate::chunks::{
    decode_samples, Chunk, ChunkIter, SampleBuffer, SampleValues, CHUNK_BOUNDARY,
    CHUNK_CLOCK_OFFSET, CHUNK_FILE_HEADER, CHUNK_SAMPLES, CHUNK_STREAM_FOOTER,
    CHUNK_STREAM_HEADER,
};
use crate::clock;
use crate::error::{Result, XdfError};
use crate::mmap_utils::read_file_bytes;
use crate::profile_scope;
use crate::stream::{ClockOffset, FileHeader, Stream, StreamFooter, StreamInfo, TimeSeries};
use crate::types::LoadOptions;
use crate::xml::XmlElement;
use byteorder::{LittleEndian, ReadBytesExt};
use nalgebra::DMatrix;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

/// Source of stream records for a recording file
///
/// The XDF reader only depends on this contract; `XdfLoader` implements it for
/// files on disk.
pub trait StreamLoader {
    fn load(&self, path: &Path) -> Result<(Vec<Stream>, FileHeader)>;
}

/// XDF (Extensible Data Format) loader
///
/// XDF is the file format used by Lab Streaming Layer (LSL) for multi-stream
/// recordings: a sequence of binary chunks with XML headers for each stream.
/// Streams are returned in the order their headers appear in the file.
#[derive(Debug, Clone, Default)]
pub struct XdfLoader {
    options: LoadOptions,
}

/// Stream being assembled while chunks are read
struct PendingStream {
    info: StreamInfo,
    samples: SampleBuffer,
}

impl XdfLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Parse an in-memory XDF file
    pub fn load_bytes(&self, data: &[u8]) -> Result<(Vec<Stream>, FileHeader)> {
        let mut header: Option<FileHeader> = None;
        let mut order: Vec<u32> = Vec::new();
        let mut pending: HashMap<u32, PendingStream> = HashMap::new();

        for chunk in ChunkIter::new(data)? {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    log::warn!("Stopped reading XDF data: {}", e);
                    break;
                }
            };

            match chunk.tag {
                CHUNK_FILE_HEADER => {
                    let file_header = FileHeader::from_xml(XmlElement::parse(chunk.content)?);
                    log::debug!("XDF file header, version {:?}", file_header.version);
                    header = Some(file_header);
                }
                CHUNK_STREAM_HEADER => {
                    let (stream_id, xml) = chunk.stream_id()?;
                    let info = StreamInfo::from_header(stream_id, XmlElement::parse(xml)?)?;
                    log::info!(
                        "Found XDF stream: {} (ID: {}, type: {}, {} x {})",
                        info.name,
                        stream_id,
                        info.stream_type,
                        info.channel_count,
                        info.channel_format
                    );
                    if pending.contains_key(&stream_id) {
                        log::warn!("Duplicate header for stream {}, keeping the first", stream_id);
                        continue;
                    }
                    order.push(stream_id);
                    let samples = SampleBuffer::new(info.channel_format);
                    pending.insert(stream_id, PendingStream { info, samples });
                }
                CHUNK_SAMPLES => Self::read_samples(&chunk, &mut pending)?,
                CHUNK_CLOCK_OFFSET => match Self::read_clock_offset(&chunk) {
                    Ok((stream_id, offset)) => match pending.get_mut(&stream_id) {
                        Some(stream) => stream.info.clock_offsets.push(offset),
                        None => log::warn!("Clock offset for unknown stream {}", stream_id),
                    },
                    Err(e) => log::warn!(
                        "Skipping clock offset chunk at offset {}: {}",
                        chunk.offset,
                        e
                    ),
                },
                CHUNK_BOUNDARY => {
                    log::debug!("Boundary chunk at offset {}", chunk.offset);
                }
                CHUNK_STREAM_FOOTER => {
                    let (stream_id, xml) = chunk.stream_id()?;
                    let footer = StreamFooter::from_xml(XmlElement::parse(xml)?);
                    match pending.get_mut(&stream_id) {
                        Some(stream) => stream.info.footer = Some(footer),
                        None => log::warn!("Footer for unknown stream {}", stream_id),
                    }
                }
                other => {
                    log::warn!("Unknown chunk type: {}", other);
                }
            }
        }

        let header = header.ok_or_else(|| {
            XdfError::InvalidFile("missing file header chunk".to_string())
        })?;

        let mut streams = Vec::with_capacity(order.len());
        for stream_id in order {
            if let Some(stream) = pending.remove(&stream_id) {
                streams.push(self.finish_stream(stream)?);
            }
        }

        log::info!("Loaded {} XDF streams", streams.len());
        Ok((streams, header))
    }

    fn read_samples(chunk: &Chunk<'_>, pending: &mut HashMap<u32, PendingStream>) -> Result<()> {
        let (stream_id, body) = chunk.stream_id()?;
        let stream = match pending.get_mut(&stream_id) {
            Some(stream) => stream,
            None => {
                log::warn!("Samples for unknown stream {}, skipping", stream_id);
                return Ok(());
            }
        };

        let info = &stream.info;
        if let Err(e) = decode_samples(
            body,
            info.channel_format,
            info.channel_count,
            info.nominal_srate,
            &mut stream.samples,
        ) {
            log::warn!(
                "Skipping samples chunk at offset {} for stream {}: {}",
                chunk.offset,
                stream_id,
                e
            );
        }
        Ok(())
    }

    fn read_clock_offset(chunk: &Chunk<'_>) -> Result<(u32, ClockOffset)> {
        let (stream_id, body) = chunk.stream_id()?;
        let mut cursor = Cursor::new(body);
        let offset = ClockOffset {
            collection_time: cursor.read_f64::<LittleEndian>()?,
            offset: cursor.read_f64::<LittleEndian>()?,
        };
        Ok((stream_id, offset))
    }

    fn finish_stream(&self, stream: PendingStream) -> Result<Stream> {
        let PendingStream { mut info, samples } = stream;
        let SampleBuffer {
            mut time_stamps,
            values,
            ..
        } = samples;

        if self.options.synchronize_clocks && !info.clock_offsets.is_empty() {
            clock::synchronize_clocks(&mut time_stamps, &info.clock_offsets);
        }

        info.effective_srate = if self.options.dejitter_timestamps && info.nominal_srate > 0.0 {
            clock::dejitter(
                &mut time_stamps,
                info.nominal_srate,
                self.options.jitter_break_threshold_seconds,
                self.options.jitter_break_threshold_samples,
            )
        } else {
            clock::effective_srate(&time_stamps)
        };

        let time_series = match values {
            SampleValues::Numeric(flat) => {
                let rows = time_stamps.len();
                if rows.checked_mul(info.channel_count) != Some(flat.len()) {
                    return Err(XdfError::ParseError(format!(
                        "stream {} holds {} values for {} samples of {} channels",
                        info.stream_id,
                        flat.len(),
                        rows,
                        info.channel_count
                    )));
                }
                TimeSeries::Numeric(DMatrix::from_row_slice(rows, info.channel_count, &flat))
            }
            SampleValues::Strings(rows) => TimeSeries::Strings(rows),
        };

        log::debug!(
            "Stream {} ({}): {} samples, effective srate {:.3} Hz",
            info.stream_id,
            info.name,
            time_stamps.len(),
            info.effective_srate
        );

        Ok(Stream {
            info,
            time_series,
            time_stamps,
        })
    }
}

impl StreamLoader for XdfLoader {
    fn load(&self, path: &Path) -> Result<(Vec<Stream>, FileHeader)> {
        profile_scope!(format!("load_xdf {}", path.display()));
        let data = read_file_bytes(path)?;
        self.load_bytes(&data)
    }
}

/// Load an XDF file with the given timestamp processing options
pub fn load_xdf<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<(Vec<Stream>, FileHeader)> {
    XdfLoader::new(options).load(path.as_ref())
}
