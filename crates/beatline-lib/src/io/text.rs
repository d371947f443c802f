use crate::signal::Waveform;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse newline-delimited floating point samples, ignoring blank/comment lines.
///
/// Lines may also be `time,value` pairs (as written by the `synth` command
/// with `--with-time`); only the last comma-separated field is read.
pub fn parse_f64_series(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let field = trimmed.rsplit(',').next().unwrap_or(trimmed).trim();
        let val: f64 = field
            .parse()
            .with_context(|| format!("line {} is not f64: {}", idx + 1, trimmed))?;
        out.push(val);
    }
    if out.is_empty() {
        anyhow::bail!("no numeric samples found");
    }
    Ok(out)
}

/// Read a newline-delimited sample file from disk.
pub fn read_f64_series(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_f64_series(&text).with_context(|| format!("parsing samples in {}", path.display()))
}

/// Parse samples and wrap them as a lead sampled at `rate_hz`.
pub fn parse_waveform(text: &str, rate_hz: u32) -> Result<Waveform> {
    let samples = parse_f64_series(text)?;
    Ok(Waveform::new(rate_hz, samples)?)
}

/// Render a waveform one sample per line, optionally prefixed with its time.
pub fn format_waveform(wave: &Waveform, with_time: bool) -> String {
    let mut out = String::with_capacity(wave.len() * 12);
    for (i, v) in wave.samples().iter().enumerate() {
        if with_time {
            out.push_str(&format!("{},{}\n", wave.time_of(i), v));
        } else {
            out.push_str(&format!("{v}\n"));
        }
    }
    out
}
