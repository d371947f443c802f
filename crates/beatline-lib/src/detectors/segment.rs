//! Per-beat P / QRS / T boundary estimation.
//!
//! Every wave is found inside a window placed relative to its R-peak. The
//! extremum is taken on a lightly smoothed copy of the lead, then the
//! boundaries are walked outward until the trace comes back to baseline or
//! turns around. Walks never leave their window, and each beat stays clear of
//! its neighbours' QRS reach, so the result is always ordered:
//! `p.offset <= qrs.onset <= r <= qrs.offset <= t.onset`.

use super::ecg::{argmax, centered_average, median};
use crate::{config::SegmenterConfig, signal::Events, signal::Waveform};
use log::debug;
use serde::{Deserialize, Serialize};

/// One wave of a beat, in sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub onset_sample: usize,
    pub peak_sample: usize,
    pub offset_sample: usize,
    /// Deflection at `peak_sample` relative to the record baseline (mV).
    pub amplitude: f64,
}

impl Segment {
    pub fn width_samples(&self) -> usize {
        self.offset_sample.saturating_sub(self.onset_sample)
    }
}

/// P, QRS and T segments of one beat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatSegments {
    pub r_peak_sample: usize,
    pub p_wave: Segment,
    pub qrs_complex: Segment,
    pub t_wave: Segment,
    /// A wave window was clipped by the record edge or a neighbouring beat.
    pub truncated: bool,
}

impl BeatSegments {
    pub fn is_ordered(&self) -> bool {
        let well_formed =
            |s: &Segment| s.onset_sample <= s.peak_sample && s.peak_sample <= s.offset_sample;
        well_formed(&self.p_wave)
            && well_formed(&self.qrs_complex)
            && well_formed(&self.t_wave)
            && self.p_wave.offset_sample <= self.qrs_complex.onset_sample
            && self.qrs_complex.peak_sample == self.r_peak_sample
            && self.qrs_complex.offset_sample <= self.t_wave.onset_sample
    }
}

/// An R-peak together with its immediate neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatContext {
    pub r_peak: usize,
    pub prev_r_peak: Option<usize>,
    pub next_r_peak: Option<usize>,
}

impl BeatContext {
    pub fn isolated(r_peak: usize) -> Self {
        Self {
            r_peak,
            prev_r_peak: None,
            next_r_peak: None,
        }
    }

    /// Local RR in samples, preferring the preceding interval. Neighbours on
    /// the wrong side of `r_peak` are ignored.
    fn local_rr(&self) -> Option<usize> {
        self.prev_r_peak
            .and_then(|p| self.r_peak.checked_sub(p))
            .or_else(|| self.next_r_peak.and_then(|n| n.checked_sub(self.r_peak)))
            .filter(|&rr| rr > 0)
    }
}

/// Segment every detected beat, in detection order.
pub fn segment_beats(
    wave: &Waveform,
    peaks: &Events,
    cfg: &SegmenterConfig,
) -> Vec<BeatSegments> {
    let lead = PreparedLead::new(wave, cfg);
    let idx = &peaks.indices;
    let beats: Vec<BeatSegments> = idx
        .iter()
        .enumerate()
        .map(|(i, &r_peak)| {
            let ctx = BeatContext {
                r_peak,
                prev_r_peak: i.checked_sub(1).map(|j| idx[j]),
                next_r_peak: idx.get(i + 1).copied(),
            };
            lead.segment(&ctx, cfg)
        })
        .collect();
    let truncated = beats.iter().filter(|b| b.truncated).count();
    debug!(
        "segmented {} beats ({} truncated), baseline {:.4}",
        beats.len(),
        truncated,
        lead.baseline
    );
    beats
}

/// Segment a single beat. An `r_peak` past the record end is clamped to the
/// last sample; neighbours on the wrong side of it only limit the search.
pub fn segment_beat(wave: &Waveform, ctx: &BeatContext, cfg: &SegmenterConfig) -> BeatSegments {
    PreparedLead::new(wave, cfg).segment(ctx, cfg)
}

struct PreparedLead<'a> {
    raw: &'a [f64],
    smooth: Vec<f64>,
    baseline: f64,
    fs: f64,
}

impl<'a> PreparedLead<'a> {
    fn new(wave: &'a Waveform, cfg: &SegmenterConfig) -> Self {
        let fs = wave.rate_hz() as f64;
        let half = ((cfg.smoothing_s * fs) / 2.0).round() as usize;
        let smooth = centered_average(wave.samples(), half);
        let baseline = median(&smooth);
        Self {
            raw: wave.samples(),
            smooth,
            baseline,
            fs,
        }
    }

    fn samples(&self, seconds: f64) -> usize {
        (seconds * self.fs).round().max(0.0) as usize
    }

    fn amplitude_at(&self, idx: usize) -> f64 {
        self.raw[idx] - self.baseline
    }

    fn collapsed(&self, at: usize) -> Segment {
        Segment {
            onset_sample: at,
            peak_sample: at,
            offset_sample: at,
            amplitude: self.amplitude_at(at),
        }
    }

    fn segment(&self, ctx: &BeatContext, cfg: &SegmenterConfig) -> BeatSegments {
        let last = self.raw.len() - 1;
        let r = ctx.r_peak.min(last);
        let reach = self.samples(cfg.qrs_search_s);
        let margin = self.samples(cfg.boundary_margin_s);

        // Stay clear of the neighbours' QRS reach.
        let lower_fence = ctx
            .prev_r_peak
            .map_or(0, |p| p.saturating_add(reach).saturating_add(1))
            .min(r);
        let upper_fence = ctx
            .next_r_peak
            .map_or(last, |n| n.saturating_sub(reach.saturating_add(1)))
            .clamp(r, last);

        let qrs_lo = r.saturating_sub(reach).max(lower_fence);
        let qrs_hi = r.saturating_add(reach).min(upper_fence);
        let qrs = self.qrs(r, qrs_lo, qrs_hi, cfg);

        let mut truncated = false;

        let p_near = self.samples(cfg.p_window_s[0]);
        let p_far = self.samples(cfg.p_window_s[1]);
        let p_walk_lo = r
            .saturating_sub(p_far.saturating_add(margin))
            .max(lower_fence)
            .min(qrs.onset_sample);
        let p_walk_hi = qrs.onset_sample;
        let p_peak_lo = r.saturating_sub(p_far).max(p_walk_lo);
        let p_peak_hi = r.checked_sub(p_near).map(|hi| hi.min(p_walk_hi));
        let p_wave = match p_peak_hi {
            Some(peak_hi) if p_peak_lo <= peak_hi => {
                if r.checked_sub(p_far.saturating_add(margin)) != Some(p_walk_lo) {
                    truncated = true;
                }
                self.positive_wave(p_peak_lo, peak_hi, p_walk_lo, p_walk_hi, cfg)
            }
            _ => {
                truncated = true;
                self.collapsed(p_walk_hi)
            }
        };

        let scale = ctx
            .local_rr()
            .map(|rr| (rr as f64 / self.fs / cfg.reference_rr_s).sqrt())
            .unwrap_or(1.0)
            .clamp(cfg.rr_scale_limits[0], cfg.rr_scale_limits[1]);
        let t_near = self.samples(cfg.t_window_s[0] * scale);
        let t_far = self.samples(cfg.t_window_s[1] * scale);
        let t_walk_lo = qrs.offset_sample;
        let t_reach = r.saturating_add(t_far).saturating_add(margin);
        let t_walk_hi = t_reach.min(upper_fence).max(t_walk_lo);
        let peak_lo = r.saturating_add(t_near).max(t_walk_lo);
        let peak_hi = r.saturating_add(t_far).min(t_walk_hi);
        let t_wave = if peak_lo <= peak_hi {
            if t_reach != t_walk_hi {
                truncated = true;
            }
            self.positive_wave(peak_lo, peak_hi, t_walk_lo, t_walk_hi, cfg)
        } else {
            truncated = true;
            self.collapsed(t_walk_lo)
        };

        BeatSegments {
            r_peak_sample: r,
            p_wave,
            qrs_complex: qrs,
            t_wave,
            truncated,
        }
    }

    /// QRS anchored on R: descend to the Q (or S) nadir, then, if that nadir
    /// dips below baseline, climb back until it is within tolerance of it.
    fn qrs(&self, r: usize, lo: usize, hi: usize, cfg: &SegmenterConfig) -> Segment {
        let onset = self.qrs_edge(r, lo, Direction::Left, cfg);
        let offset = self.qrs_edge(r, hi, Direction::Right, cfg);
        Segment {
            onset_sample: onset,
            peak_sample: r,
            offset_sample: offset,
            amplitude: self.amplitude_at(r),
        }
    }

    fn qrs_edge(&self, r: usize, limit: usize, dir: Direction, cfg: &SegmenterConfig) -> usize {
        let s = &self.smooth;
        let nadir = walk(r, limit, dir, |cur, next| s[next] <= s[cur]);
        let depth = self.baseline - s[nadir];
        if depth <= 0.0 {
            return nadir;
        }
        let tol = cfg.baseline_tolerance * depth;
        walk(nadir, limit, dir, |cur, next| {
            s[next] >= s[cur] && self.baseline - s[cur] > tol
        })
    }

    /// Upright wave: tallest smoothed sample in `[peak_lo, peak_hi]`, bounds
    /// walked outward within `[walk_lo, walk_hi]`.
    fn positive_wave(
        &self,
        peak_lo: usize,
        peak_hi: usize,
        walk_lo: usize,
        walk_hi: usize,
        cfg: &SegmenterConfig,
    ) -> Segment {
        let s = &self.smooth;
        let peak = argmax(s, peak_lo, peak_hi);
        let tol = cfg.baseline_tolerance * (s[peak] - self.baseline).max(0.0);
        let above = |i: usize| s[i] - self.baseline > tol;
        let onset = walk(peak, walk_lo, Direction::Left, |cur, next| {
            s[next] <= s[cur] && above(cur)
        });
        let offset = walk(peak, walk_hi, Direction::Right, |cur, next| {
            s[next] <= s[cur] && above(cur)
        });
        Segment {
            onset_sample: onset,
            peak_sample: peak,
            offset_sample: offset,
            amplitude: self.amplitude_at(peak),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Left,
    Right,
}

/// Step from `from` toward `limit` while `keep_going(current, next)` holds.
fn walk(
    from: usize,
    limit: usize,
    dir: Direction,
    keep_going: impl Fn(usize, usize) -> bool,
) -> usize {
    let mut cur = from;
    loop {
        let next = match dir {
            Direction::Left if cur > limit => cur - 1,
            Direction::Right if cur < limit => cur + 1,
            _ => return cur,
        };
        if !keep_going(cur, next) {
            return cur;
        }
        cur = next;
    }
}
