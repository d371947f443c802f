use anyhow::{Context, Result};
use beatline_lib::{
    analyze_waveform, analyze_with_config,
    config::{load_config, EngineConfig},
    io::{annotations, text as text_io},
    plot::{figure_from_analysis, Figure, Series},
    synth::synthesize,
    AnalysisResult, AnnotationRecord, Summary, Waveform,
};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use plotters::prelude::*;
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "beatline",
    version,
    about = "Beatline: single-lead ECG beat annotation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that builds a synthetic record.
#[derive(Args)]
struct SourceArgs {
    /// Sampling rate in Hz
    #[arg(long, default_value_t = 250)]
    rate: u32,
    /// Record length in seconds
    #[arg(long, default_value_t = 10.0)]
    duration: f64,
    /// Seed for the noise generator (fixed default when absent)
    #[arg(long)]
    seed: Option<u64>,
    /// Template heart rate in beats per minute
    #[arg(long)]
    heart_rate: Option<f64>,
    /// TOML engine configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a record, annotate every beat and print JSON (or write CSV)
    Annotate {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },
    /// Annotate newline-delimited samples read from stdin or --input file
    AnnotateSamples {
        #[arg(long, default_value_t = 250)]
        rate: u32,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },
    /// Print a synthetic tracing, one sample per line
    Synth {
        #[command(flatten)]
        source: SourceArgs,
        /// Prefix each sample with its time in seconds
        #[arg(long)]
        with_time: bool,
    },
    /// Render the tracing with R-peak markers to a PNG via plotters
    Plot {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 4000)]
        max_points: usize,
    },
}

#[derive(Serialize)]
struct AnnotateOutput<'a> {
    summary: &'a Summary,
    records: &'a [AnnotationRecord],
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Annotate {
            source,
            csv,
            summary_json,
        } => cmd_annotate(&source, csv.as_deref(), summary_json.as_deref())?,
        Commands::AnnotateSamples {
            rate,
            input,
            config,
            csv,
            summary_json,
        } => cmd_annotate_samples(
            rate,
            input.as_deref(),
            config.as_deref(),
            csv.as_deref(),
            summary_json.as_deref(),
        )?,
        Commands::Synth { source, with_time } => cmd_synth(&source, with_time)?,
        Commands::Plot {
            source,
            out,
            max_points,
        } => cmd_plot(&source, &out, max_points)?,
    }
    Ok(())
}

fn engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(EngineConfig::default()),
    }
}

fn source_config(source: &SourceArgs) -> Result<EngineConfig> {
    let mut cfg = engine_config(source.config.as_deref())?;
    if let Some(bpm) = source.heart_rate {
        cfg.synth.heart_rate_bpm = bpm;
        cfg.validate().context("--heart-rate")?;
    }
    Ok(cfg)
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_f64_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_f64_series(&buf)
        }
    }
}

fn emit_result(
    result: &AnalysisResult,
    csv: Option<&Path>,
    summary_json: Option<&Path>,
) -> Result<()> {
    if let Some(path) = summary_json {
        annotations::write_summary_json(path, &result.summary)?;
    }
    match csv {
        Some(path) => {
            annotations::save_annotations_csv(path, &result.records)?;
            info!("wrote {} rows to {}", result.records.len(), path.display());
        }
        None => {
            let out = AnnotateOutput {
                summary: &result.summary,
                records: &result.records,
            };
            println!("{}", serde_json::to_string(&out)?);
        }
    }
    Ok(())
}

fn cmd_annotate(
    source: &SourceArgs,
    csv: Option<&Path>,
    summary_json: Option<&Path>,
) -> Result<()> {
    let cfg = source_config(source)?;
    let result = analyze_with_config(source.rate, source.duration, source.seed, &cfg)?;
    emit_result(&result, csv, summary_json)
}

fn cmd_annotate_samples(
    rate: u32,
    input: Option<&Path>,
    config: Option<&Path>,
    csv: Option<&Path>,
    summary_json: Option<&Path>,
) -> Result<()> {
    let cfg = engine_config(config)?;
    let samples = read_samples(input)?;
    let wave = Waveform::new(rate, samples)?;
    let result = analyze_waveform(wave, &cfg)?;
    emit_result(&result, csv, summary_json)
}

fn cmd_synth(source: &SourceArgs, with_time: bool) -> Result<()> {
    let cfg = source_config(source)?;
    let wave = synthesize(
        source.rate,
        source.duration,
        source.seed,
        &cfg.synth,
        &cfg.bounds,
    )?;
    print!("{}", text_io::format_waveform(&wave, with_time));
    Ok(())
}

fn cmd_plot(source: &SourceArgs, out: &Path, max_points: usize) -> Result<()> {
    let cfg = source_config(source)?;
    let result = analyze_with_config(source.rate, source.duration, source.seed, &cfg)?;
    let fig = figure_from_analysis(&result, max_points.max(2));
    if let Err(err) = draw_plotters_figure(out, &fig, true) {
        warn!("labelled render failed ({err}), drawing without text");
        draw_plotters_figure(out, &fig, false)?;
    }
    info!("wrote {}", out.display());
    Ok(())
}

fn draw_plotters_figure(path: &Path, fig: &Figure, with_text: bool) -> Result<()> {
    let backend = BitMapBackend::new(path, (1000, 400));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;
    let (x_min, mut x_max, mut y_min, mut y_max) =
        fig.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    let pad = ((y_max - y_min) * 0.1).max(0.05);
    y_min -= pad;
    y_max += pad;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(10);
    if with_text {
        builder
            .caption(
                fig.title.clone().unwrap_or_else(|| "ECG".into()),
                ("sans-serif", 22),
            )
            .x_label_area_size(30)
            .y_label_area_size(45);
    }
    let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;
    if with_text {
        chart
            .configure_mesh()
            .x_desc(fig.x.label.clone().unwrap_or_default())
            .y_desc(fig.y.label.clone().unwrap_or_default())
            .draw()?;
    }
    for series in &fig.series {
        match series {
            Series::Line(line) => {
                let (r, g, b) = line.style.color.rgb();
                let width = line.style.width.round().max(1.0) as u32;
                let style = RGBColor(r, g, b).stroke_width(width);
                chart.draw_series(LineSeries::new(
                    line.points.iter().map(|p| (p[0], p[1])),
                    style,
                ))?;
            }
            Series::Markers(markers) => {
                let (r, g, b) = markers.color.rgb();
                let style = RGBColor(r, g, b).filled();
                chart.draw_series(
                    markers
                        .points
                        .iter()
                        .map(|p| Circle::new((p[0], p[1]), markers.radius, style)),
                )?;
            }
        }
    }
    root.present()?;
    Ok(())
}
