use crate::error::{check_range, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Full engine configuration. Every section defaults independently, so a
/// TOML file only needs to name the keys it overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bounds: Bounds,
    pub synth: SynthConfig,
    pub detector: DetectorConfig,
    pub segmenter: SegmenterConfig,
    pub rhythm: RhythmConfig,
}

/// Accepted ranges for caller-supplied run parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    pub min_rate_hz: u32,
    pub max_rate_hz: u32,
    pub min_duration_s: f64,
    pub max_duration_s: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_rate_hz: 100,
            max_rate_hz: 500,
            min_duration_s: 1.0,
            max_duration_s: 10.0,
        }
    }
}

impl Bounds {
    pub fn check_rate(&self, rate_hz: u32) -> Result<()> {
        check_range(
            "sampling_rate",
            rate_hz as f64,
            self.min_rate_hz as f64,
            self.max_rate_hz as f64,
        )
    }

    pub fn check_duration(&self, duration_s: f64) -> Result<()> {
        check_range(
            "duration_seconds",
            duration_s,
            self.min_duration_s,
            self.max_duration_s,
        )
    }
}

/// One Gaussian deflection of the beat template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveShape {
    /// Peak deflection (mV).
    pub amplitude: f64,
    /// Gaussian width σ (seconds).
    pub width_s: f64,
    /// Centre relative to the R-peak (seconds).
    pub offset_s: f64,
}

impl WaveShape {
    const fn new(amplitude: f64, width_s: f64, offset_s: f64) -> Self {
        Self {
            amplitude,
            width_s,
            offset_s,
        }
    }
}

/// Parameters of the synthetic signal source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Template beat rate.
    pub heart_rate_bpm: f64,
    /// Each RR interval is drawn uniformly from `rr * (1 ± rr_jitter)`.
    pub rr_jitter: f64,
    /// Standard deviation of additive Gaussian noise (mV).
    pub noise_std: f64,
    /// Amplitude of a slow 0.3 Hz baseline sinusoid (mV).
    pub baseline_wander: f64,
    /// Seed used when the caller does not provide one.
    pub default_seed: u64,
    pub p: WaveShape,
    pub q: WaveShape,
    pub r: WaveShape,
    pub s: WaveShape,
    /// T offset is stretched by `sqrt(rr / 1 s)`.
    pub t: WaveShape,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            heart_rate_bpm: 72.0,
            rr_jitter: 0.0,
            noise_std: 0.01,
            baseline_wander: 0.0,
            default_seed: 42,
            p: WaveShape::new(0.15, 0.025, -0.16),
            q: WaveShape::new(-0.10, 0.010, -0.025),
            r: WaveShape::new(1.0, 0.010, 0.0),
            s: WaveShape::new(-0.20, 0.010, 0.025),
            t: WaveShape::new(0.30, 0.040, 0.30),
        }
    }
}

/// R-peak detector parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Lower cutoff for the single-pole high-pass filter (Hz).
    pub lowcut_hz: f64,
    /// Upper cutoff for the single-pole low-pass filter (Hz).
    pub highcut_hz: f64,
    /// Moving window integration length (seconds).
    pub integration_window_s: f64,
    /// Minimum physiological RR distance / refractory period (seconds).
    pub min_rr_s: f64,
    /// Fraction of the local envelope maximum a candidate must reach.
    pub energy_threshold: f64,
    /// Span (seconds) of the neighbourhood the envelope maximum is taken over.
    pub adaptive_window_s: f64,
    /// How far back to search (seconds) for the precise R-peak after a detection.
    pub search_back_s: f64,
    /// Centred moving-average span applied to the lead before the search-back (seconds).
    pub peak_smoothing_s: f64,
    /// Minimum R deflection above the signal baseline (mV).
    pub min_amplitude: f64,
    /// Peaks closer than this to either record edge are dropped (seconds).
    pub edge_guard_s: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            lowcut_hz: 5.0,
            highcut_hz: 15.0,
            integration_window_s: 0.150,
            min_rr_s: 60.0 / 220.0,
            energy_threshold: 0.3,
            adaptive_window_s: 2.0,
            search_back_s: 0.150,
            peak_smoothing_s: 0.02,
            min_amplitude: 0.4,
            edge_guard_s: 0.05,
        }
    }
}

/// Wave-boundary search priors, all relative to the R-peak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Centred moving-average span applied before the boundary walk (seconds).
    pub smoothing_s: f64,
    /// Furthest the QRS onset/offset may lie from R (seconds).
    pub qrs_search_s: f64,
    /// P peak expected this far before R: `[nearest, furthest]` (seconds).
    pub p_window_s: [f64; 2],
    /// T peak expected this far after R: `[nearest, furthest]` (seconds).
    pub t_window_s: [f64; 2],
    /// Extra room beyond the outer edge of a peak window for the boundary walk (seconds).
    pub boundary_margin_s: f64,
    /// A wave has returned to baseline once within this fraction of its amplitude.
    pub baseline_tolerance: f64,
    /// RR at which the T window is used unscaled (seconds).
    pub reference_rr_s: f64,
    /// Clamp on the `sqrt(rr / reference)` T window scale.
    pub rr_scale_limits: [f64; 2],
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            smoothing_s: 0.02,
            qrs_search_s: 0.06,
            p_window_s: [0.08, 0.20],
            t_window_s: [0.10, 0.40],
            boundary_margin_s: 0.10,
            baseline_tolerance: 0.1,
            reference_rr_s: 1.0,
            rr_scale_limits: [0.5, 1.5],
        }
    }
}

/// Rate and regularity thresholds for the rhythm label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmConfig {
    /// Mean rate strictly below this is bradycardia.
    pub brady_below_bpm: f64,
    /// Mean rate strictly above this is tachycardia.
    pub tachy_above_bpm: f64,
    /// RR coefficient of variation above this is irregular.
    pub cv_tolerance: f64,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            brady_below_bpm: 60.0,
            tachy_above_bpm: 100.0,
            cv_tolerance: 0.15,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let cfg: EngineConfig = toml::from_str(text).context("parsing engine config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let b = &self.bounds;
        check_range("bounds.min_rate_hz", b.min_rate_hz as f64, 1.0, b.max_rate_hz as f64)?;
        check_range(
            "bounds.min_duration_s",
            b.min_duration_s,
            f64::MIN_POSITIVE,
            b.max_duration_s,
        )?;

        let s = &self.synth;
        check_range("synth.heart_rate_bpm", s.heart_rate_bpm, 1.0, 400.0)?;
        check_range("synth.rr_jitter", s.rr_jitter, 0.0, 0.9)?;
        check_range("synth.noise_std", s.noise_std, 0.0, f64::MAX)?;
        check_range("synth.baseline_wander", s.baseline_wander, 0.0, f64::MAX)?;
        for (name, wave) in [
            ("synth.p.width_s", s.p),
            ("synth.q.width_s", s.q),
            ("synth.r.width_s", s.r),
            ("synth.s.width_s", s.s),
            ("synth.t.width_s", s.t),
        ] {
            check_range(name, wave.width_s, f64::MIN_POSITIVE, 1.0)?;
        }

        let d = &self.detector;
        check_range("detector.highcut_hz", d.highcut_hz, f64::MIN_POSITIVE, 1000.0)?;
        check_range("detector.lowcut_hz", d.lowcut_hz, 0.0, d.highcut_hz)?;
        check_range("detector.min_amplitude", d.min_amplitude, 0.0, f64::MAX)?;
        check_range("detector.min_rr_s", d.min_rr_s, f64::MIN_POSITIVE, 10.0)?;
        check_range("detector.energy_threshold", d.energy_threshold, 0.0, 1.0)?;
        check_range("detector.integration_window_s", d.integration_window_s, 0.0, 1.0)?;
        check_range("detector.adaptive_window_s", d.adaptive_window_s, 0.0, 60.0)?;
        check_range("detector.search_back_s", d.search_back_s, 0.0, 1.0)?;
        check_range("detector.peak_smoothing_s", d.peak_smoothing_s, 0.0, 0.2)?;
        check_range("detector.edge_guard_s", d.edge_guard_s, 0.0, 1.0)?;

        let g = &self.segmenter;
        check_range("segmenter.smoothing_s", g.smoothing_s, 0.0, 0.2)?;
        check_range("segmenter.qrs_search_s", g.qrs_search_s, 0.0, 0.5)?;
        check_range("segmenter.p_window_s[1]", g.p_window_s[1], 0.0, 2.0)?;
        check_range("segmenter.p_window_s[0]", g.p_window_s[0], 0.0, g.p_window_s[1])?;
        check_range("segmenter.t_window_s[1]", g.t_window_s[1], 0.0, 2.0)?;
        check_range("segmenter.t_window_s[0]", g.t_window_s[0], 0.0, g.t_window_s[1])?;
        check_range("segmenter.boundary_margin_s", g.boundary_margin_s, 0.0, 2.0)?;
        check_range("segmenter.baseline_tolerance", g.baseline_tolerance, 0.0, 1.0)?;
        check_range(
            "segmenter.reference_rr_s",
            g.reference_rr_s,
            f64::MIN_POSITIVE,
            10.0,
        )?;
        check_range(
            "segmenter.rr_scale_limits[1]",
            g.rr_scale_limits[1],
            f64::MIN_POSITIVE,
            4.0,
        )?;
        check_range(
            "segmenter.rr_scale_limits[0]",
            g.rr_scale_limits[0],
            f64::MIN_POSITIVE,
            g.rr_scale_limits[1],
        )?;

        let r = &self.rhythm;
        check_range(
            "rhythm.brady_below_bpm",
            r.brady_below_bpm,
            0.0,
            r.tachy_above_bpm,
        )?;
        check_range("rhythm.cv_tolerance", r.cv_tolerance, 0.0, f64::MAX)?;
        Ok(())
    }
}

/// Read and validate a TOML engine configuration.
pub fn load_config(path: &Path) -> anyhow::Result<EngineConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    EngineConfig::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
}
