use crate::annotate::AnalysisResult;
use crate::signal::{Events, Waveform};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Point markers drawn at exact positions (never decimated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub radius: u32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Markers(MarkerSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) => &line.points,
            Series::Markers(markers) => &markers.points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis { label: None },
            y: Axis { label: None },
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// `(x_min, x_max, y_min, y_max)` over every series, or `None` when empty.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.series.iter().flat_map(|s| s.points().iter());
        let first = points.next()?;
        let init = (first[0], first[0], first[1], first[1]);
        Some(points.fold(init, |(x0, x1, y0, y1), p| {
            (x0.min(p[0]), x1.max(p[0]), y0.min(p[1]), y1.max(p[1]))
        }))
    }
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

pub fn figure_from_waveform(title: &str, wave: &Waveform, max_points: usize) -> Figure {
    let points: Vec<[f64; 2]> = wave
        .samples()
        .iter()
        .enumerate()
        .map(|(i, value)| [wave.time_of(i), *value])
        .collect();
    let mut fig = Figure::new(Some(title.into()));
    fig.x.label = Some("time (s)".into());
    fig.y.label = Some("amplitude (mV)".into());
    fig.add_series(Series::Line(LineSeries {
        name: "lead".into(),
        points: decimate_points(&points, max_points),
        style: Style {
            width: 1.4,
            color: Color(0x1F77B4),
        },
    }));
    fig
}

/// Marker positions `[time_s, sample_value]` for each detected R-peak.
pub fn r_peak_markers(wave: &Waveform, peaks: &Events) -> MarkerSeries {
    let points = peaks
        .indices
        .iter()
        .filter_map(|&i| wave.samples().get(i).map(|v| [wave.time_of(i), *v]))
        .collect();
    MarkerSeries {
        name: "R-peaks".into(),
        points,
        radius: 4,
        color: Color(0xD62728),
    }
}

/// Tracing plus R-peak markers for one analysis run.
pub fn figure_from_analysis(result: &AnalysisResult, max_points: usize) -> Figure {
    let title = format!(
        "ECG {} Hz, {} beats, {}",
        result.waveform.rate_hz(),
        result.summary.beat_count,
        result.summary.rhythm_label
    );
    let mut fig = figure_from_waveform(&title, &result.waveform, max_points);
    fig.add_series(Series::Markers(r_peak_markers(
        &result.waveform,
        &result.r_peaks,
    )));
    fig
}
