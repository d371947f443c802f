//! Engine entry points and the flat per-beat annotation rows they produce.
//!
//! `analyze*` run the whole pipeline: source, R-peak detection, segmentation,
//! intervals, rhythm label, then [`assemble`]. Nothing is retained between
//! calls, so runs may execute concurrently.

use crate::{
    config::EngineConfig,
    detectors::{detect_r_peaks, segment_beats, BeatSegments},
    error::Result,
    metrics::{
        classify_rhythm, compute_intervals, intervals::mean_rr_ms, mean_heart_rate, Intervals,
        RhythmLabel,
    },
    signal::{Events, RRSeries, Waveform},
    synth::synthesize,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// One exported row per beat: segments, durations, and the record's rhythm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub beat_index: usize,
    pub r_peak_sample: usize,
    pub r_peak_time_s: f64,
    pub p_onset_sample: usize,
    pub p_peak_sample: usize,
    pub p_offset_sample: usize,
    pub p_amplitude_mv: f64,
    pub qrs_onset_sample: usize,
    pub qrs_peak_sample: usize,
    pub qrs_offset_sample: usize,
    pub qrs_amplitude_mv: f64,
    pub t_onset_sample: usize,
    pub t_peak_sample: usize,
    pub t_offset_sample: usize,
    pub t_amplitude_mv: f64,
    pub p_duration_ms: f64,
    pub pr_interval_ms: f64,
    pub qrs_duration_ms: f64,
    pub st_segment_ms: f64,
    pub qt_interval_ms: f64,
    pub t_duration_ms: f64,
    pub rr_interval_ms: Option<f64>,
    pub rp_interval_ms: Option<f64>,
    pub heart_rate_bpm: Option<f64>,
    pub segments_truncated: bool,
    pub rhythm: RhythmLabel,
}

/// Record-level result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub beat_count: usize,
    pub mean_heart_rate_bpm: Option<f64>,
    pub mean_rr_ms: Option<f64>,
    pub rhythm_label: RhythmLabel,
}

/// Everything one run produces. The waveform and R-peaks are kept for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub waveform: Waveform,
    pub r_peaks: Events,
    pub records: Vec<AnnotationRecord>,
    pub summary: Summary,
}

/// Synthesize and annotate with the default configuration.
pub fn analyze(rate_hz: u32, duration_s: f64, seed: Option<u64>) -> Result<AnalysisResult> {
    analyze_with_config(rate_hz, duration_s, seed, &EngineConfig::default())
}

/// Synthesize and annotate. Parameters are validated before any sample is generated.
pub fn analyze_with_config(
    rate_hz: u32,
    duration_s: f64,
    seed: Option<u64>,
    cfg: &EngineConfig,
) -> Result<AnalysisResult> {
    let wave = synthesize(rate_hz, duration_s, seed, &cfg.synth, &cfg.bounds)?;
    analyze_waveform(wave, cfg)
}

/// Annotate an ingested lead. Only the sampling rate is bounds-checked.
pub fn analyze_waveform(wave: Waveform, cfg: &EngineConfig) -> Result<AnalysisResult> {
    cfg.bounds.check_rate(wave.rate_hz())?;

    let r_peaks = detect_r_peaks(&wave, &cfg.detector);
    let beats = segment_beats(&wave, &r_peaks, &cfg.segmenter);
    let intervals = compute_intervals(&beats, wave.rate_hz());
    let mean_hr = mean_heart_rate(&intervals);
    let rr = RRSeries::from_events(&r_peaks, wave.rate_hz());
    let rhythm = classify_rhythm(&rr, mean_hr, &cfg.rhythm);
    debug!("rhythm {} from {} RR intervals", rhythm, rr.rr_ms.len());

    let (records, summary) = assemble(wave.rate_hz(), &beats, &intervals, mean_hr, rhythm);
    info!(
        "annotated {:.2} s at {} Hz: {} beats, mean rate {}, {}",
        wave.duration_s(),
        wave.rate_hz(),
        summary.beat_count,
        summary
            .mean_heart_rate_bpm
            .map_or_else(|| "n/a".to_string(), |hr| format!("{hr:.1} bpm")),
        summary.rhythm_label
    );
    Ok(AnalysisResult {
        waveform: wave,
        r_peaks,
        records,
        summary,
    })
}

/// Flatten beats and their intervals into rows, preserving beat order.
pub fn assemble(
    rate_hz: u32,
    beats: &[BeatSegments],
    intervals: &[Intervals],
    mean_heart_rate_bpm: Option<f64>,
    rhythm: RhythmLabel,
) -> (Vec<AnnotationRecord>, Summary) {
    let records: Vec<AnnotationRecord> = beats
        .iter()
        .zip(intervals)
        .enumerate()
        .map(|(beat_index, (beat, iv))| {
            let p = &beat.p_wave;
            let qrs = &beat.qrs_complex;
            let t = &beat.t_wave;
            AnnotationRecord {
                beat_index,
                r_peak_sample: beat.r_peak_sample,
                r_peak_time_s: beat.r_peak_sample as f64 / rate_hz as f64,
                p_onset_sample: p.onset_sample,
                p_peak_sample: p.peak_sample,
                p_offset_sample: p.offset_sample,
                p_amplitude_mv: p.amplitude,
                qrs_onset_sample: qrs.onset_sample,
                qrs_peak_sample: qrs.peak_sample,
                qrs_offset_sample: qrs.offset_sample,
                qrs_amplitude_mv: qrs.amplitude,
                t_onset_sample: t.onset_sample,
                t_peak_sample: t.peak_sample,
                t_offset_sample: t.offset_sample,
                t_amplitude_mv: t.amplitude,
                p_duration_ms: iv.p_duration_ms,
                pr_interval_ms: iv.pr_ms,
                qrs_duration_ms: iv.qrs_ms,
                st_segment_ms: iv.st_ms,
                qt_interval_ms: iv.qt_ms,
                t_duration_ms: iv.t_duration_ms,
                rr_interval_ms: iv.rr_ms,
                rp_interval_ms: iv.rp_ms,
                heart_rate_bpm: iv.heart_rate_bpm,
                segments_truncated: beat.truncated,
                rhythm,
            }
        })
        .collect();
    let summary = Summary {
        beat_count: records.len(),
        mean_heart_rate_bpm,
        mean_rr_ms: mean_rr_ms(intervals),
        rhythm_label: rhythm,
    };
    (records, summary)
}
