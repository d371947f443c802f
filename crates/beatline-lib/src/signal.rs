use crate::error::{check_range, EngineError, Result};
use serde::{Deserialize, Serialize};

/// A single sampled ECG lead.
///
/// Immutable once built: fields are private and only read accessors are
/// exposed, so every stage downstream sees the same samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    rate_hz: u32,
    samples: Vec<f64>,
}

impl Waveform {
    /// Wrap digitized samples. Rejects a zero rate, empty input and NaN/inf samples.
    pub fn new(rate_hz: u32, samples: Vec<f64>) -> Result<Self> {
        check_range("sampling_rate", rate_hz as f64, 1.0, f64::MAX)?;
        if samples.is_empty() {
            return Err(EngineError::EmptyWaveform);
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(EngineError::NonFiniteSample { index });
        }
        Ok(Self { rate_hz, samples })
    }

    pub fn rate_hz(&self) -> u32 {
        self.rate_hz
    }
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn duration_s(&self) -> f64 {
        self.samples.len() as f64 / self.rate_hz as f64
    }
    /// Time in seconds of sample `index` (`t_i = i / rate`).
    pub fn time_of(&self, index: usize) -> f64 {
        index as f64 / self.rate_hz as f64
    }
    pub fn time_axis(&self) -> Vec<f64> {
        (0..self.samples.len()).map(|i| self.time_of(i)).collect()
    }
    /// Convert a span in seconds to a whole number of samples at this rate.
    pub fn seconds_to_samples(&self, seconds: f64) -> usize {
        (seconds * self.rate_hz as f64).round().max(0.0) as usize
    }
}

/// Point events on a timeline (R-peak sample indices).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// RR intervals in milliseconds between consecutive events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr_ms: Vec<f64>,
}

impl RRSeries {
    pub fn from_events(events: &Events, rate_hz: u32) -> Self {
        let rr_ms = events
            .indices
            .windows(2)
            .map(|w| w[1].saturating_sub(w[0]) as f64 * 1000.0 / rate_hz as f64)
            .collect();
        Self { rr_ms }
    }

    pub fn mean(&self) -> Option<f64> {
        if self.rr_ms.is_empty() {
            None
        } else {
            Some(self.rr_ms.iter().sum::<f64>() / self.rr_ms.len() as f64)
        }
    }
}
