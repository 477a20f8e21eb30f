use crate::stream::ClockOffset;

/// Ordinary least-squares line `y = intercept + slope * x`
///
/// Returns `None` for empty input. A single point, or points with no spread in
/// `x`, give a flat line through the mean of `y`.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n == 0 {
        return None;
    }

    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x[..n].iter().zip(&y[..n]) {
        let dx = xi - mean_x;
        sxx += dx * dx;
        sxy += dx * (yi - mean_y);
    }

    if sxx <= f64::EPSILON * n as f64 {
        return Some((mean_y, 0.0));
    }

    let slope = sxy / sxx;
    Some((mean_y - slope * mean_x, slope))
}

/// Map timestamps onto the recording host clock using the measured offsets
pub fn synchronize_clocks(time_stamps: &mut [f64], offsets: &[ClockOffset]) {
    if time_stamps.is_empty() {
        return;
    }

    let times: Vec<f64> = offsets.iter().map(|o| o.collection_time).collect();
    let values: Vec<f64> = offsets.iter().map(|o| o.offset).collect();

    if let Some((intercept, slope)) = fit_line(&times, &values) {
        for ts in time_stamps.iter_mut() {
            *ts += intercept + slope * *ts;
        }
    }
}

/// Split points of a regular stream: `(start, stop)` index pairs, inclusive
pub fn segments(time_stamps: &[f64], break_threshold: f64) -> Vec<(usize, usize)> {
    if time_stamps.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut start = 0;
    for (i, pair) in time_stamps.windows(2).enumerate() {
        if pair[1] - pair[0] > break_threshold {
            result.push((start, i));
            start = i + 1;
        }
    }
    result.push((start, time_stamps.len() - 1));
    result
}

/// Replace the timestamps of each segment by a least-squares line over the
/// sample index and return the effective sampling rate.
pub fn dejitter(
    time_stamps: &mut [f64],
    nominal_srate: f64,
    threshold_seconds: f64,
    threshold_samples: f64,
) -> f64 {
    if time_stamps.is_empty() || nominal_srate <= 0.0 {
        return 0.0;
    }

    let tdiff = 1.0 / nominal_srate;
    let break_threshold = threshold_seconds.max(threshold_samples * tdiff);
    let segs = segments(time_stamps, break_threshold);

    let mut total_count = 0usize;
    let mut total_duration = 0.0;

    for &(start, stop) in &segs {
        let idx: Vec<f64> = (start..=stop).map(|i| i as f64).collect();
        if let Some((intercept, slope)) = fit_line(&idx, &time_stamps[start..=stop]) {
            for (offset, ts) in time_stamps[start..=stop].iter_mut().enumerate() {
                *ts = intercept + slope * (start + offset) as f64;
            }
        }
        total_count += stop + 1 - start;
        total_duration += time_stamps[stop] + tdiff - time_stamps[start];
    }

    log::debug!(
        "Dejittered {} samples in {} segment(s)",
        time_stamps.len(),
        segs.len()
    );

    if total_duration > 0.0 {
        total_count as f64 / total_duration
    } else {
        0.0
    }
}

/// Rate implied by the first and last timestamp
pub fn effective_srate(time_stamps: &[f64]) -> f64 {
    match (time_stamps.first(), time_stamps.last()) {
        (Some(&first), Some(&last)) if time_stamps.len() > 1 && last > first => {
            (time_stamps.len() - 1) as f64 / (last - first)
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_fit_line() {
        let (intercept, slope) = fit_line(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
        assert_close(intercept, 1.0);
        assert_close(slope, 2.0);

        assert_eq!(fit_line(&[], &[]), None);
        assert_eq!(fit_line(&[4.0], &[0.25]), Some((0.25, 0.0)));
    }

    #[test]
    fn test_constant_clock_offset() {
        let mut ts = vec![10.0, 11.0, 12.0];
        let offsets = [
            ClockOffset { collection_time: 5.0, offset: -2.0 },
            ClockOffset { collection_time: 15.0, offset: -2.0 },
        ];
        synchronize_clocks(&mut ts, &offsets);
        assert_close(ts[0], 8.0);
        assert_close(ts[2], 10.0);
    }

    #[test]
    fn test_drifting_clock_offset() {
        let mut ts = vec![0.0, 100.0];
        let offsets = [
            ClockOffset { collection_time: 0.0, offset: 1.0 },
            ClockOffset { collection_time: 100.0, offset: 2.0 },
        ];
        synchronize_clocks(&mut ts, &offsets);
        assert_close(ts[0], 1.0);
        assert_close(ts[1], 102.0);
    }

    #[test]
    fn test_no_offsets_leaves_timestamps() {
        let mut ts = vec![1.0, 2.0];
        synchronize_clocks(&mut ts, &[]);
        assert_eq!(ts, vec![1.0, 2.0]);
    }

    #[test]
    fn test_segments_split_on_gaps() {
        let ts = [0.0, 0.1, 0.2, 5.0, 5.1];
        assert_eq!(segments(&ts, 1.0), vec![(0, 2), (3, 4)]);
        assert!(segments(&[], 1.0).is_empty());
    }

    #[test]
    fn test_dejitter_straightens_timestamps() {
        let mut ts: Vec<f64> = (0..100)
            .map(|i| 2.0 + i as f64 * 0.01 + if i % 2 == 0 { 0.002 } else { -0.002 })
            .collect();
        let srate = dejitter(&mut ts, 100.0, 1.0, 500.0);

        let step = ts[1] - ts[0];
        assert!((step - 0.01).abs() < 1e-5, "step {}", step);
        for pair in ts.windows(2) {
            assert_close(pair[1] - pair[0], step);
        }
        assert!((srate - 100.0).abs() < 0.5, "effective srate {}", srate);
    }

    #[test]
    fn test_dejitter_skips_irregular_streams() {
        let mut ts = vec![0.0, 0.7, 0.9];
        assert_eq!(dejitter(&mut ts, 0.0, 1.0, 500.0), 0.0);
        assert_eq!(ts, vec![0.0, 0.7, 0.9]);
    }

    #[test]
    fn test_effective_srate() {
        assert_close(effective_srate(&[0.0, 0.5, 1.0]), 2.0);
        assert_eq!(effective_srate(&[3.0]), 0.0);
    }
}
