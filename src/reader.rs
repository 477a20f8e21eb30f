use crate::error::{Result, XdfError};
use crate::loader::{StreamLoader, XdfLoader};
use crate::profile_scope;
use crate::raw::{create_info, Annotations, ChannelType, RawRecording};
use crate::stream::{Stream, StreamInfo, TimeSeries};
use crate::types::ReadXdfOptions;
use std::path::Path;

/// Channel layout derived from a data stream header
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMetadata {
    pub n_chans: usize,
    pub sfreq: f64,
    pub labels: Vec<String>,
}

/// Read an XDF file into a raw recording with marker annotations
///
/// The data stream is picked by `stream_name` if set, otherwise by
/// `data_type`. Marker streams are attached as zero-duration annotations whose
/// onsets are relative to the first data sample.
pub fn read_raw_xdf<P: AsRef<Path>>(path: P, options: &ReadXdfOptions) -> Result<RawRecording> {
    let loader = XdfLoader::new(options.load.clone());
    read_raw_xdf_with(&loader, path, options)
}

/// Same as [`read_raw_xdf`] with a caller-provided stream loader
pub fn read_raw_xdf_with<L, P>(loader: &L, path: P, options: &ReadXdfOptions) -> Result<RawRecording>
where
    L: StreamLoader + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    profile_scope!(format!("read_raw_xdf {}", path.display()));

    let (streams, header) = loader.load(path)?;

    let data_stream = select_data_stream(
        &streams,
        options.stream_name.as_deref(),
        &options.data_type,
    )?;
    log::info!(
        "Selected data stream '{}' (ID: {}, type: {})",
        data_stream.info.name,
        data_stream.info.stream_id,
        data_stream.info.stream_type
    );

    let metadata = extract_channel_metadata(&data_stream.info);

    let samples = match &data_stream.time_series {
        TimeSeries::Numeric(samples) => samples,
        TimeSeries::Strings(_) => {
            return Err(XdfError::NonNumericStream(data_stream.info.name.clone()))
        }
    };
    if samples.ncols() != metadata.n_chans {
        return Err(XdfError::ChannelCountMismatch {
            declared: metadata.n_chans,
            actual: samples.ncols(),
        });
    }

    let info = create_info(
        metadata.labels,
        metadata.sfreq,
        vec![ChannelType::Eeg; metadata.n_chans],
    )?
    .with_meas_date(header.measurement_date());

    let mut raw = RawRecording::new(samples.transpose(), info, options.first_samp)?
        .with_filename(path);

    let first_timestamp = data_stream
        .first_timestamp()
        .ok_or_else(|| XdfError::EmptyStream(data_stream.info.name.clone()))?;

    let marker_streams = select_marker_streams(
        &streams,
        options.marker_stream_name.as_deref(),
        &options.marker_type,
    );
    for marker_stream in marker_streams {
        let annotations = marker_annotations(marker_stream, first_timestamp)?;
        log::info!(
            "Adding {} annotations from marker stream '{}'",
            annotations.len(),
            marker_stream.info.name
        );
        raw.add_annotations(annotations);
    }

    log::info!(
        "Loaded {} channels x {} samples at {} Hz with {} annotations",
        raw.n_chans(),
        raw.n_times(),
        raw.sfreq(),
        raw.annotations().len()
    );
    Ok(raw)
}

/// Pick the data stream: the first exact name match if `name` is given,
/// otherwise the first stream of `data_type`.
pub fn select_data_stream<'a>(
    streams: &'a [Stream],
    name: Option<&str>,
    data_type: &str,
) -> Result<&'a Stream> {
    let found = match name {
        Some(name) => streams.iter().find(|s| s.info.name == name),
        None => streams.iter().find(|s| s.info.stream_type == data_type),
    };

    found.ok_or_else(|| {
        XdfError::NoStreamFound(match name {
            Some(name) => format!("name '{}'", name),
            None => format!("type '{}'", data_type),
        })
    })
}

/// Pick marker streams: at most the first exact name match if `name` is
/// given, otherwise every stream of `marker_type`.
///
/// Unlike [`select_data_stream`] this may return several streams, or none.
pub fn select_marker_streams<'a>(
    streams: &'a [Stream],
    name: Option<&str>,
    marker_type: &str,
) -> Vec<&'a Stream> {
    match name {
        Some(name) => streams.iter().find(|s| s.info.name == name).into_iter().collect(),
        None => streams
            .iter()
            .filter(|s| s.info.stream_type == marker_type)
            .collect(),
    }
}

/// Channel count, sampling rate and labels of a data stream
pub fn extract_channel_metadata(info: &StreamInfo) -> ChannelMetadata {
    let n_chans = info.channel_count;
    let labels = channel_labels(info).unwrap_or_else(|| {
        log::debug!("No channel labels in stream '{}', using defaults", info.name);
        default_labels(n_chans)
    });

    ChannelMetadata {
        n_chans,
        sfreq: info.nominal_srate,
        labels,
    }
}

/// Labels from `desc/channels/channel/label`, `None` if any step is missing
pub fn channel_labels(info: &StreamInfo) -> Option<Vec<String>> {
    let channels = info.desc.as_ref()?.child("channels")?;
    let labels = channels
        .children("channel")
        .map(|channel| channel.child_text("label").map(str::to_string))
        .collect::<Option<Vec<_>>>()?;

    if labels.is_empty() {
        None
    } else {
        Some(labels)
    }
}

/// `EEG 0` .. `EEG {n-1}`
pub fn default_labels(n_chans: usize) -> Vec<String> {
    (0..n_chans).map(|i| format!("EEG {}", i)).collect()
}

/// Zero-duration annotations for every event of a marker stream, with onsets
/// relative to `reference` (the first data timestamp).
pub fn marker_annotations(stream: &Stream, reference: f64) -> Result<Annotations> {
    let onsets: Vec<f64> = stream.time_stamps.iter().map(|ts| ts - reference).collect();
    if let Some(first) = onsets.first().filter(|onset| **onset < 0.0) {
        log::debug!(
            "Marker stream '{}' starts {:.3}s before the data",
            stream.info.name,
            -first
        );
    }

    let descriptions = (0..onsets.len())
        .map(|i| {
            stream
                .time_series
                .sample_values(i)
                .map(|values| describe(&values))
                .unwrap_or_default()
        })
        .collect();

    let durations = vec![0.0; onsets.len()];
    Annotations::from_parts(onsets, durations, descriptions)
}

/// A single value is used directly; anything else is rendered as a list
fn describe(values: &[String]) -> String {
    match values {
        [single] => single.clone(),
        _ => format!("[{}]", values.join(", ")),
    }
}
