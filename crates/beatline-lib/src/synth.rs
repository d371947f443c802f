//! Synthetic single-lead ECG source.
//!
//! Each beat is a sum of five Gaussian deflections (P, Q, R, S, T) placed
//! relative to its R-peak. Beat `k = 0` is anchored at `t = 0`, so the first
//! R-peak inside the record lands one RR period in: a record shorter than one
//! beat period contains no complete QRS complex.

use crate::{
    config::{Bounds, SynthConfig, WaveShape},
    error::Result,
    signal::Waveform,
};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;

/// Generate `round(rate_hz * duration_s)` samples of synthetic ECG.
///
/// Fails with `InvalidParameter` before drawing any sample when the rate or
/// duration fall outside `bounds`. For a fixed `(rate_hz, duration_s, seed)`
/// and configuration the output is bit-identical across calls.
pub fn synthesize(
    rate_hz: u32,
    duration_s: f64,
    seed: Option<u64>,
    cfg: &SynthConfig,
    bounds: &Bounds,
) -> Result<Waveform> {
    bounds.check_rate(rate_hz)?;
    bounds.check_duration(duration_s)?;

    let seed = seed.unwrap_or(cfg.default_seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let n = (rate_hz as f64 * duration_s).round() as usize;
    let fs = rate_hz as f64;

    let beats = beat_times(duration_s, cfg, &mut rng);
    debug!(
        "synthesizing {} samples at {} Hz, {} template beats, seed {}",
        n,
        rate_hz,
        beats.len(),
        seed
    );

    let mut samples = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f64 / fs;
        let mut v = cfg.baseline_wander * (2.0 * PI * 0.3 * t).sin();
        for beat in &beats {
            // Deflections more than a second from R contribute nothing measurable.
            if (t - beat.r_time_s).abs() > 1.0 {
                continue;
            }
            v += beat_value(t - beat.r_time_s, beat.cycle_s, cfg);
        }
        if cfg.noise_std > 0.0 {
            v += cfg.noise_std * standard_normal(&mut rng);
        }
        samples.push(v);
    }

    Waveform::new(rate_hz, samples)
}

/// R-peak time and cycle length of one template beat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateBeat {
    pub r_time_s: f64,
    pub cycle_s: f64,
}

/// Lay out template beats from `t = 0` until one beat past the record end.
pub fn beat_times(duration_s: f64, cfg: &SynthConfig, rng: &mut StdRng) -> Vec<TemplateBeat> {
    let period = 60.0 / cfg.heart_rate_bpm;
    let mut beats = Vec::new();
    let mut t = 0.0;
    while t <= duration_s + period {
        let cycle = if cfg.rr_jitter > 0.0 {
            period * (1.0 + rng.gen_range(-cfg.rr_jitter..=cfg.rr_jitter))
        } else {
            period
        };
        beats.push(TemplateBeat {
            r_time_s: t,
            cycle_s: cycle,
        });
        t += cycle;
    }
    beats
}

fn beat_value(dt: f64, cycle_s: f64, cfg: &SynthConfig) -> f64 {
    let t_stretch = cycle_s.sqrt();
    gaussian(dt, &cfg.p, 1.0)
        + gaussian(dt, &cfg.q, 1.0)
        + gaussian(dt, &cfg.r, 1.0)
        + gaussian(dt, &cfg.s, 1.0)
        + gaussian(dt, &cfg.t, t_stretch)
}

fn gaussian(dt: f64, wave: &WaveShape, offset_scale: f64) -> f64 {
    let z = (dt - wave.offset_s * offset_scale) / wave.width_s;
    wave.amplitude * (-0.5 * z * z).exp()
}

/// Box–Muller draw from N(0, 1).
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn quiet() -> SynthConfig {
        SynthConfig {
            noise_std: 0.0,
            ..SynthConfig::default()
        }
    }

    #[test]
    fn length_matches_rate_and_duration() {
        let wave = synthesize(250, 5.0, Some(1), &SynthConfig::default(), &Bounds::default())
            .unwrap();
        assert_eq!(wave.len(), 1250);
        assert_eq!(wave.rate_hz(), 250);
        let wave = synthesize(333, 1.5, Some(1), &SynthConfig::default(), &Bounds::default())
            .unwrap();
        assert_eq!(wave.len(), 500);
    }

    #[test]
    fn same_seed_same_samples() {
        let cfg = SynthConfig {
            rr_jitter: 0.1,
            ..SynthConfig::default()
        };
        let a = synthesize(200, 4.0, Some(9), &cfg, &Bounds::default()).unwrap();
        let b = synthesize(200, 4.0, Some(9), &cfg, &Bounds::default()).unwrap();
        let c = synthesize(200, 4.0, Some(10), &cfg, &Bounds::default()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let cfg = SynthConfig::default();
        let bounds = Bounds::default();
        assert!(matches!(
            synthesize(50, 5.0, None, &cfg, &bounds),
            Err(EngineError::InvalidParameter {
                name: "sampling_rate",
                ..
            })
        ));
        assert!(matches!(
            synthesize(250, 0.5, None, &cfg, &bounds),
            Err(EngineError::InvalidParameter {
                name: "duration_seconds",
                ..
            })
        ));
        assert!(synthesize(250, 10.5, None, &cfg, &bounds).is_err());
    }

    #[test]
    fn r_peaks_sit_on_the_template_grid() {
        let wave = synthesize(250, 3.0, None, &quiet(), &Bounds::default()).unwrap();
        let s = wave.samples();
        // 72 bpm: 0.8333 s cycles.
        let r1 = (60.0 / 72.0 * 250.0_f64).round() as usize;
        assert!(s[r1] > 0.9, "R amplitude {}", s[r1]);
        assert!(s[r1] > s[r1 - 1] && s[r1] >= s[r1 + 1]);
        // Baseline between T and the next P stays near zero.
        let quiet_spot = r1 + (0.55 * 250.0) as usize;
        assert!(s[quiet_spot].abs() < 0.05, "baseline {}", s[quiet_spot]);
    }

    #[test]
    fn jitter_changes_cycle_lengths() {
        let cfg = SynthConfig {
            rr_jitter: 0.2,
            ..SynthConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let beats = beat_times(10.0, &cfg, &mut rng);
        let period = 60.0 / cfg.heart_rate_bpm;
        assert!(beats.iter().any(|b| (b.cycle_s - period).abs() > 1e-3));
        assert!(beats
            .iter()
            .all(|b| b.cycle_s >= period * 0.8 - 1e-12 && b.cycle_s <= period * 1.2 + 1e-12));
    }
}
