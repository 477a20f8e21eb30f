use crate::error::{Result, XdfError};
use chrono::{DateTime, Utc};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Channel type of a recording channel
///
/// XDF data streams are loaded with one type for every channel; mixed-type
/// streams are not distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Eeg,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Eeg => f.write_str("eeg"),
        }
    }
}

/// Channel metadata of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub ch_names: Vec<String>,
    pub sfreq: f64,
    pub ch_types: Vec<ChannelType>,
    pub meas_date: Option<DateTime<Utc>>,
}

/// Build recording info, checking that names and types line up and the
/// sampling rate is usable.
pub fn create_info(
    ch_names: Vec<String>,
    sfreq: f64,
    ch_types: Vec<ChannelType>,
) -> Result<RecordingInfo> {
    if ch_names.len() != ch_types.len() {
        return Err(XdfError::ChannelCountMismatch {
            declared: ch_types.len(),
            actual: ch_names.len(),
        });
    }
    if !sfreq.is_finite() || sfreq <= 0.0 {
        return Err(XdfError::InvalidSampleRate(sfreq));
    }

    Ok(RecordingInfo {
        ch_names,
        sfreq,
        ch_types,
        meas_date: None,
    })
}

impl RecordingInfo {
    pub fn n_chans(&self) -> usize {
        self.ch_names.len()
    }

    pub fn with_meas_date(mut self, meas_date: Option<DateTime<Utc>>) -> Self {
        self.meas_date = meas_date;
        self
    }
}

/// A point or interval event on a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Seconds relative to the first sample
    pub onset: f64,
    pub duration: f64,
    pub description: String,
}

/// Ordered annotation collection; insertion order is kept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    items: Vec<Annotation>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build annotations from parallel onset, duration and description lists
    pub fn from_parts(
        onsets: Vec<f64>,
        durations: Vec<f64>,
        descriptions: Vec<String>,
    ) -> Result<Self> {
        if onsets.len() != durations.len() || onsets.len() != descriptions.len() {
            return Err(XdfError::InvalidAnnotations(format!(
                "{} onsets, {} durations, {} descriptions",
                onsets.len(),
                durations.len(),
                descriptions.len()
            )));
        }

        let items = onsets
            .into_iter()
            .zip(durations)
            .zip(descriptions)
            .map(|((onset, duration), description)| Annotation {
                onset,
                duration,
                description,
            })
            .collect();
        Ok(Self { items })
    }

    pub fn push(&mut self, annotation: Annotation) {
        self.items.push(annotation);
    }

    /// Append all of `other` after the existing annotations
    pub fn extend(&mut self, other: Annotations) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.items.iter()
    }

    pub fn onsets(&self) -> Vec<f64> {
        self.items.iter().map(|a| a.onset).collect()
    }

    pub fn durations(&self) -> Vec<f64> {
        self.items.iter().map(|a| a.duration).collect()
    }

    pub fn descriptions(&self) -> Vec<&str> {
        self.items.iter().map(|a| a.description.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a Annotations {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Raw multichannel recording held in memory
///
/// `data` is laid out channels × samples.
#[derive(Debug, Clone)]
pub struct RawRecording {
    data: DMatrix<f64>,
    info: RecordingInfo,
    annotations: Annotations,
    filenames: Vec<PathBuf>,
    first_samp: u64,
}

impl RawRecording {
    pub fn new(data: DMatrix<f64>, info: RecordingInfo, first_samp: u64) -> Result<Self> {
        if data.nrows() != info.n_chans() {
            return Err(XdfError::ChannelCountMismatch {
                declared: info.n_chans(),
                actual: data.nrows(),
            });
        }

        Ok(Self {
            data,
            info,
            annotations: Annotations::new(),
            filenames: Vec::new(),
            first_samp,
        })
    }

    pub fn with_filename(mut self, path: impl AsRef<Path>) -> Self {
        self.filenames.push(path.as_ref().to_path_buf());
        self
    }

    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn info(&self) -> &RecordingInfo {
        &self.info
    }

    pub fn ch_names(&self) -> &[String] {
        &self.info.ch_names
    }

    pub fn sfreq(&self) -> f64 {
        self.info.sfreq
    }

    pub fn n_chans(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    pub fn first_samp(&self) -> u64 {
        self.first_samp
    }

    /// Time of the first sample in seconds
    pub fn first_time(&self) -> f64 {
        self.first_samp as f64 / self.info.sfreq
    }

    /// Duration covered by the samples in seconds
    pub fn duration(&self) -> f64 {
        self.n_times() as f64 / self.info.sfreq
    }

    /// Sample times in seconds, starting at 0
    pub fn times(&self) -> Vec<f64> {
        (0..self.n_times())
            .map(|i| i as f64 / self.info.sfreq)
            .collect()
    }

    pub fn filenames(&self) -> &[PathBuf] {
        &self.filenames
    }

    /// Samples of one channel by name
    pub fn channel(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.info.ch_names.iter().position(|n| n == name)?;
        Some(self.data.row(index).iter().copied().collect())
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Replace all annotations
    pub fn set_annotations(&mut self, annotations: Annotations) {
        self.annotations = annotations;
    }

    /// Append annotations after the existing ones
    pub fn add_annotations(&mut self, annotations: Annotations) {
        self.annotations.extend(annotations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("C{}", i)).collect()
    }

    #[test]
    fn test_create_info_validation() {
        assert!(create_info(names(2), 256.0, vec![ChannelType::Eeg; 2]).is_ok());
        assert!(matches!(
            create_info(names(2), 256.0, vec![ChannelType::Eeg; 3]),
            Err(XdfError::ChannelCountMismatch { declared: 3, actual: 2 })
        ));
        assert!(matches!(
            create_info(names(1), 0.0, vec![ChannelType::Eeg]),
            Err(XdfError::InvalidSampleRate(_))
        ));
        assert!(create_info(names(1), f64::NAN, vec![ChannelType::Eeg]).is_err());
    }

    #[test]
    fn test_raw_recording_shape() {
        let info = create_info(names(2), 100.0, vec![ChannelType::Eeg; 2]).unwrap();
        let data = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let raw = RawRecording::new(data, info, 50).unwrap().with_filename("rec.xdf");

        assert_eq!(raw.n_chans(), 2);
        assert_eq!(raw.n_times(), 3);
        assert_eq!(raw.channel("C1"), Some(vec![4.0, 5.0, 6.0]));
        assert_eq!(raw.channel("C9"), None);
        assert_eq!(raw.times(), vec![0.0, 0.01, 0.02]);
        assert_eq!(raw.first_time(), 0.5);
        assert_eq!(raw.duration(), 0.03);
        assert_eq!(raw.filenames(), &[PathBuf::from("rec.xdf")]);
        assert!(raw.annotations().is_empty());
    }

    #[test]
    fn test_raw_recording_rejects_mismatched_data() {
        let info = create_info(names(3), 100.0, vec![ChannelType::Eeg; 3]).unwrap();
        let data = DMatrix::zeros(2, 10);
        assert!(matches!(
            RawRecording::new(data, info, 0),
            Err(XdfError::ChannelCountMismatch { declared: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_annotations_accumulate_in_order() {
        let info = create_info(names(1), 10.0, vec![ChannelType::Eeg]).unwrap();
        let mut raw = RawRecording::new(DMatrix::zeros(1, 5), info, 0).unwrap();

        raw.add_annotations(
            Annotations::from_parts(vec![3.0, 1.0], vec![0.0, 0.0], vec!["b".into(), "a".into()])
                .unwrap(),
        );
        raw.add_annotations(
            Annotations::from_parts(vec![2.0], vec![0.0], vec!["c".into()]).unwrap(),
        );

        assert_eq!(raw.annotations().onsets(), vec![3.0, 1.0, 2.0]);
        assert_eq!(raw.annotations().descriptions(), vec!["b", "a", "c"]);

        raw.set_annotations(Annotations::new());
        assert!(raw.annotations().is_empty());
    }

    #[test]
    fn test_annotations_reject_ragged_parts() {
        let result = Annotations::from_parts(vec![0.0, 1.0], vec![0.0], vec!["x".into()]);
        assert!(matches!(result, Err(XdfError::InvalidAnnotations(_))));
    }

    #[test]
    fn test_channel_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChannelType::Eeg).unwrap(), "\"eeg\"");
        assert_eq!(ChannelType::Eeg.to_string(), "eeg");
    }
}
