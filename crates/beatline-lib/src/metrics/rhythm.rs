use crate::{config::RhythmConfig, signal::RRSeries};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record-level rhythm label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RhythmLabel {
    #[serde(rename = "Normal Sinus Rhythm")]
    NormalSinusRhythm,
    #[serde(rename = "Bradycardia")]
    Bradycardia,
    #[serde(rename = "Tachycardia")]
    Tachycardia,
    #[serde(rename = "Irregular Rhythm")]
    IrregularRhythm,
    #[serde(rename = "Insufficient Data")]
    InsufficientData,
}

impl RhythmLabel {
    pub const ALL: [RhythmLabel; 5] = [
        RhythmLabel::NormalSinusRhythm,
        RhythmLabel::Bradycardia,
        RhythmLabel::Tachycardia,
        RhythmLabel::IrregularRhythm,
        RhythmLabel::InsufficientData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RhythmLabel::NormalSinusRhythm => "Normal Sinus Rhythm",
            RhythmLabel::Bradycardia => "Bradycardia",
            RhythmLabel::Tachycardia => "Tachycardia",
            RhythmLabel::IrregularRhythm => "Irregular Rhythm",
            RhythmLabel::InsufficientData => "Insufficient Data",
        }
    }
}

impl fmt::Display for RhythmLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RhythmLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RhythmLabel::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown rhythm label: {s}"))
    }
}

/// Population standard deviation of the RR intervals over their mean.
pub fn rr_coefficient_of_variation(rr: &RRSeries) -> f64 {
    let Some(mean) = rr.mean() else {
        return 0.0;
    };
    if mean == 0.0 {
        return 0.0;
    }
    let n = rr.rr_ms.len() as f64;
    let sd = (rr.rr_ms.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
    sd / mean
}

/// Assign one label to the whole record.
///
/// Rate bands are inclusive of their limits: exactly 60 or 100 bpm is in the
/// regular band.
pub fn classify_rhythm(
    rr: &RRSeries,
    mean_heart_rate: Option<f64>,
    cfg: &RhythmConfig,
) -> RhythmLabel {
    let Some(rate) = mean_heart_rate else {
        return RhythmLabel::InsufficientData;
    };
    if rr.rr_ms.is_empty() {
        return RhythmLabel::InsufficientData;
    }
    if rate < cfg.brady_below_bpm {
        RhythmLabel::Bradycardia
    } else if rate > cfg.tachy_above_bpm {
        RhythmLabel::Tachycardia
    } else if rr_coefficient_of_variation(rr) > cfg.cv_tolerance {
        RhythmLabel::IrregularRhythm
    } else {
        RhythmLabel::NormalSinusRhythm
    }
}
