use crate::detectors::segment::BeatSegments;
use log::warn;
use serde::{Deserialize, Serialize};

/// Durations derived from one beat's segments, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intervals {
    pub p_duration_ms: f64,
    pub pr_ms: f64,
    pub qrs_ms: f64,
    pub st_ms: f64,
    pub qt_ms: f64,
    pub t_duration_ms: f64,
    /// Distance to the previous R-peak; absent for the first beat.
    pub rr_ms: Option<f64>,
    /// Previous R-peak to this beat's P onset; absent for the first beat.
    pub rp_ms: Option<f64>,
    /// `60000 / rr_ms`; absent when `rr_ms` is absent or zero.
    pub heart_rate_bpm: Option<f64>,
    /// At least one duration came out negative and was clamped to zero.
    pub clamped: bool,
}

/// Compute per-beat durations and RR / instantaneous rate for an ordered beat list.
pub fn compute_intervals(beats: &[BeatSegments], rate_hz: u32) -> Vec<Intervals> {
    let mut out = Vec::with_capacity(beats.len());
    for (i, beat) in beats.iter().enumerate() {
        let mut clamped = false;
        let mut span = |from: usize, to: usize| {
            let (ms, negative) = span_ms(from, to, rate_hz);
            clamped |= negative;
            ms
        };
        let p = &beat.p_wave;
        let qrs = &beat.qrs_complex;
        let t = &beat.t_wave;
        let p_duration_ms = span(p.onset_sample, p.offset_sample);
        let pr_ms = span(p.onset_sample, qrs.onset_sample);
        let qrs_ms = span(qrs.onset_sample, qrs.offset_sample);
        let st_ms = span(qrs.offset_sample, t.onset_sample);
        let qt_ms = span(qrs.onset_sample, t.offset_sample);
        let t_duration_ms = span(t.onset_sample, t.offset_sample);
        let prev_r = i.checked_sub(1).map(|prev| beats[prev].r_peak_sample);
        let rr_ms = prev_r.map(|prev| span(prev, beat.r_peak_sample));
        let rp_ms = prev_r.map(|prev| span(prev, p.onset_sample));
        let heart_rate_bpm = rr_ms.and_then(instantaneous_rate);

        if clamped {
            warn!(
                "beat {} at sample {}: negative duration clamped to 0",
                i, beat.r_peak_sample
            );
        }
        out.push(Intervals {
            p_duration_ms,
            pr_ms,
            qrs_ms,
            st_ms,
            qt_ms,
            t_duration_ms,
            rr_ms,
            rp_ms,
            heart_rate_bpm,
            clamped,
        });
    }
    out
}

/// Arithmetic mean of the defined instantaneous rates; absent under two beats.
pub fn mean_heart_rate(intervals: &[Intervals]) -> Option<f64> {
    if intervals.len() < 2 {
        return None;
    }
    let rates: Vec<f64> = intervals.iter().filter_map(|i| i.heart_rate_bpm).collect();
    if rates.is_empty() {
        return None;
    }
    Some(rates.iter().sum::<f64>() / rates.len() as f64)
}

/// Mean of the defined RR intervals.
pub fn mean_rr_ms(intervals: &[Intervals]) -> Option<f64> {
    let rr: Vec<f64> = intervals.iter().filter_map(|i| i.rr_ms).collect();
    if rr.is_empty() {
        None
    } else {
        Some(rr.iter().sum::<f64>() / rr.len() as f64)
    }
}

fn instantaneous_rate(rr_ms: f64) -> Option<f64> {
    if rr_ms > 0.0 {
        Some(60_000.0 / rr_ms)
    } else {
        None
    }
}

/// `(to - from)` in milliseconds, clamped at zero. The flag reports a clamp.
fn span_ms(from: usize, to: usize, rate_hz: u32) -> (f64, bool) {
    if to < from {
        return (0.0, true);
    }
    ((to - from) as f64 * 1000.0 / rate_hz as f64, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::segment::Segment;

    fn seg(onset: usize, peak: usize, offset: usize) -> Segment {
        Segment {
            onset_sample: onset,
            peak_sample: peak,
            offset_sample: offset,
            amplitude: 0.0,
        }
    }

    fn beat(r: usize) -> BeatSegments {
        BeatSegments {
            r_peak_sample: r,
            p_wave: seg(r - 55, r - 40, r - 25),
            qrs_complex: seg(r - 12, r, r + 12),
            t_wave: seg(r + 40, r + 75, r + 100),
            truncated: false,
        }
    }

    #[test]
    fn durations_follow_segment_boundaries() {
        let beats = vec![beat(300), beat(550)];
        let iv = compute_intervals(&beats, 250);
        assert_eq!(iv.len(), 2);
        let first = &iv[0];
        assert_eq!(first.p_duration_ms, 120.0);
        assert_eq!(first.pr_ms, 172.0);
        assert_eq!(first.qrs_ms, 96.0);
        assert_eq!(first.st_ms, 112.0);
        assert_eq!(first.qt_ms, 448.0);
        assert_eq!(first.t_duration_ms, 240.0);
        assert_eq!(first.rr_ms, None);
        assert_eq!(first.rp_ms, None);
        assert_eq!(first.heart_rate_bpm, None);
        assert!(!first.clamped);

        assert_eq!(iv[1].rr_ms, Some(1000.0));
        // P onset of the second beat is 195 samples after the first R.
        assert_eq!(iv[1].rp_ms, Some(780.0));
        assert!(!iv[1].clamped);
        assert_eq!(iv[1].heart_rate_bpm, Some(60.0));
    }

    #[test]
    fn negative_durations_clamp_and_flag() {
        let mut b = beat(300);
        b.t_wave = seg(305, 306, 307);
        let iv = compute_intervals(&[b], 250);
        assert_eq!(iv[0].st_ms, 0.0);
        assert!(iv[0].clamped);
    }

    #[test]
    fn zero_rr_leaves_rate_undefined() {
        let iv = compute_intervals(&[beat(300), beat(300)], 250);
        assert_eq!(iv[1].rr_ms, Some(0.0));
        assert_eq!(iv[1].heart_rate_bpm, None);
        assert_eq!(mean_heart_rate(&iv), None);
    }

    #[test]
    fn mean_rate_needs_two_beats() {
        assert_eq!(mean_heart_rate(&[]), None);
        let single = compute_intervals(&[beat(300)], 250);
        assert_eq!(mean_heart_rate(&single), None);
        assert_eq!(mean_rr_ms(&single), None);

        let iv = compute_intervals(&[beat(100), beat(350), beat(550)], 250);
        // 60 bpm and 75 bpm
        assert_eq!(mean_heart_rate(&iv), Some(67.5));
        assert_eq!(mean_rr_ms(&iv), Some(900.0));
    }
}
