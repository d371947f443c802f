use thiserror::Error;

/// Failures the engine reports to its caller.
///
/// Signal content the detector cannot interpret is never an error; only
/// caller-supplied parameters and malformed ingested samples are.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid parameter `{name}`: {value} is outside [{min}, {max}]")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("sample {index} is not a finite number")]
    NonFiniteSample { index: usize },
    #[error("waveform contains no samples")]
    EmptyWaveform,
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Fail with `InvalidParameter` unless `min <= value <= max`.
pub(crate) fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(EngineError::InvalidParameter {
            name,
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_is_inclusive() {
        assert!(check_range("rate", 100.0, 100.0, 500.0).is_ok());
        assert!(check_range("rate", 500.0, 100.0, 500.0).is_ok());
        let err = check_range("rate", 50.0, 100.0, 500.0).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidParameter {
                name: "rate",
                value: 50.0,
                min: 100.0,
                max: 500.0
            }
        );
        assert!(check_range("duration", f64::NAN, 1.0, 10.0).is_err());
    }
}
