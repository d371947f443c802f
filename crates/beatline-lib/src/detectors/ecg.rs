use crate::{config::DetectorConfig, signal::Events, signal::Waveform};
use log::debug;
use std::collections::VecDeque;

/// Detect R-peaks with a Pan–Tompkins style energy envelope, an adaptive
/// threshold, and greedy refractory suppression.
///
/// Returned indices are strictly increasing, lie strictly inside the record
/// (at least `edge_guard_s` from either end), and are at least
/// [`refractory_samples`] apart. A record without a qualifying QRS complex
/// yields an empty result.
pub fn detect_r_peaks(wave: &Waveform, cfg: &DetectorConfig) -> Events {
    let data = wave.samples();
    if data.len() < 3 {
        return Events::from_indices(Vec::new());
    }
    let fs = wave.rate_hz() as f64;

    let envelope = energy_envelope(data, fs, cfg);
    let half_window = ((cfg.adaptive_window_s * fs) / 2.0).round() as usize;
    let thresholds: Vec<f64> = sliding_max(&envelope, half_window)
        .into_iter()
        .map(|m| m * cfg.energy_threshold)
        .collect();
    let candidates = envelope_maxima(&envelope, &thresholds);

    // Search-back runs on a lightly smoothed lead; amplitudes stay raw.
    let smoothing_half = ((cfg.peak_smoothing_s * fs) / 2.0).round() as usize;
    let smoothed = centered_average(data, smoothing_half);
    let baseline = median(data);
    let search = ((cfg.search_back_s * fs).round() as usize).max(1);
    let guard = ((cfg.edge_guard_s * fs).ceil() as usize).max(1);
    let mut refined = Vec::with_capacity(candidates.len());
    for &c in &candidates {
        let start = c.saturating_sub(search);
        let idx = argmax(&smoothed, start, c);
        let amplitude = data[idx] - baseline;
        if amplitude < cfg.min_amplitude {
            continue;
        }
        if idx < guard || idx + guard >= data.len() {
            continue;
        }
        refined.push((idx, amplitude));
    }

    let refractory = refractory_samples(wave.rate_hz(), cfg.min_rr_s);
    let peaks = suppress_refractory(refined, refractory);
    debug!(
        "r-peak detection: {} samples, {} envelope candidates, {} peaks (refractory {} samples)",
        data.len(),
        candidates.len(),
        peaks.len(),
        refractory
    );
    Events::from_indices(peaks)
}

/// Smallest whole-sample gap that is at least `min_rr_s` seconds.
pub fn refractory_samples(rate_hz: u32, min_rr_s: f64) -> usize {
    ((min_rr_s * rate_hz as f64).ceil() as usize).max(1)
}

fn energy_envelope(data: &[f64], fs: f64, cfg: &DetectorConfig) -> Vec<f64> {
    let bandpassed = bandpass(data, fs, cfg.lowcut_hz, cfg.highcut_hz);
    let derivative = derivative(&bandpassed);
    let squared = square(&derivative);
    let win = ((cfg.integration_window_s * fs).round() as usize).max(1);
    moving_average(&squared, win)
}

fn bandpass(data: &[f64], fs: f64, low: f64, high: f64) -> Vec<f64> {
    let hp = if low > 0.0 {
        single_pole_highpass(data, fs, low)
    } else {
        data.to_vec()
    };
    if high <= 0.0 || high >= fs * 0.5 {
        hp
    } else {
        single_pole_lowpass(&hp, fs, high)
    }
}

fn single_pole_highpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let Some(&first) = data.first() else {
        return Vec::new();
    };
    let dt = 1.0 / fs;
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff.max(0.01));
    let alpha = rc / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev_y = 0.0;
    let mut prev_x = first;
    for &x in data {
        let y = alpha * (prev_y + x - prev_x);
        out.push(y);
        prev_y = y;
        prev_x = x;
    }
    out
}

fn single_pole_lowpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let Some(&first) = data.first() else {
        return Vec::new();
    };
    let dt = 1.0 / fs;
    let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff.max(0.01));
    let alpha = dt / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev = first;
    for &x in data {
        prev += alpha * (x - prev);
        out.push(prev);
    }
    out
}

fn derivative(data: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for i in 1..data.len() {
        out[i] = data[i] - data[i - 1];
    }
    out
}

fn square(data: &[f64]) -> Vec<f64> {
    data.iter().map(|x| x * x).collect()
}

/// Trailing moving average over `win` samples.
fn moving_average(data: &[f64], win: usize) -> Vec<f64> {
    if win <= 1 {
        return data.to_vec();
    }
    let mut out = vec![0.0; data.len()];
    let mut acc = 0.0;
    for (i, &sample) in data.iter().enumerate() {
        acc += sample;
        if i >= win {
            acc -= data[i - win];
        }
        out[i] = acc / win as f64;
    }
    out
}

/// Maximum of `data[i - half ..= i + half]` (clipped to the slice) for every `i`.
fn sliding_max(data: &[f64], half: usize) -> Vec<f64> {
    let n = data.len();
    let mut out = Vec::with_capacity(n);
    let mut window: VecDeque<usize> = VecDeque::new();
    for j in 0..n + half {
        if j < n {
            while let Some(&back) = window.back() {
                if data[back] <= data[j] {
                    window.pop_back();
                } else {
                    break;
                }
            }
            window.push_back(j);
        }
        if j >= half {
            let i = j - half;
            while let Some(&front) = window.front() {
                if front + half < i {
                    window.pop_front();
                } else {
                    break;
                }
            }
            if let Some(&front) = window.front() {
                out.push(data[front]);
            }
        }
    }
    out
}

fn envelope_maxima(envelope: &[f64], thresholds: &[f64]) -> Vec<usize> {
    let mut out = Vec::new();
    for i in 1..envelope.len().saturating_sub(1) {
        let e = envelope[i];
        if e > 0.0 && e >= thresholds[i] && e > envelope[i - 1] && e >= envelope[i + 1] {
            out.push(i);
        }
    }
    out
}

/// Index of the first maximum of `data[start..=end]`.
pub(crate) fn argmax(data: &[f64], start: usize, end: usize) -> usize {
    let mut idx = start;
    let mut max_val = f64::MIN;
    for (j, &v) in data.iter().enumerate().take(end + 1).skip(start) {
        if v > max_val {
            max_val = v;
            idx = j;
        }
    }
    idx
}

/// Mean of `data[i - half ..= i + half]`, clipped at the slice ends.
pub(crate) fn centered_average(data: &[f64], half: usize) -> Vec<f64> {
    if half == 0 {
        return data.to_vec();
    }
    let mut prefix = Vec::with_capacity(data.len() + 1);
    prefix.push(0.0);
    let mut acc = 0.0;
    for &x in data {
        acc += x;
        prefix.push(acc);
    }
    (0..data.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(data.len() - 1);
            (prefix[hi + 1] - prefix[lo]) / (hi + 1 - lo) as f64
        })
        .collect()
}

pub(crate) fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

/// Keep the tallest peak of every cluster closer than `refractory` samples.
fn suppress_refractory(mut candidates: Vec<(usize, f64)>, refractory: usize) -> Vec<usize> {
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut kept: Vec<usize> = Vec::new();
    for (idx, _) in candidates {
        let clear = kept.iter().all(|&k| k.abs_diff(idx) >= refractory);
        if clear {
            kept.push(idx);
        }
    }
    kept.sort_unstable();
    kept.dedup();
    kept
}
