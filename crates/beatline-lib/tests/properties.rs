use beatline_lib::{
    analyze, analyze_with_config,
    config::{DetectorConfig, SynthConfig},
    detectors::refractory_samples,
    io::annotations::{read_annotations_csv, write_annotations_csv},
    metrics::RhythmLabel,
    EngineConfig, EngineError,
};

fn at_bpm(bpm: f64) -> EngineConfig {
    EngineConfig {
        synth: SynthConfig {
            heart_rate_bpm: bpm,
            ..SynthConfig::default()
        },
        ..EngineConfig::default()
    }
}

#[test]
fn same_inputs_give_identical_records() {
    for (rate, duration, seed) in [(100, 4.0, 1), (250, 10.0, 42), (500, 7.5, 99)] {
        let a = analyze(rate, duration, Some(seed)).unwrap();
        let b = analyze(rate, duration, Some(seed)).unwrap();
        assert_eq!(a.records, b.records);
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.waveform, b.waveform);
    }
    // No seed means the configured default seed.
    assert_eq!(
        analyze(250, 5.0, None).unwrap().records,
        analyze(250, 5.0, Some(SynthConfig::default().default_seed))
            .unwrap()
            .records
    );
}

#[test]
fn beats_are_indexed_in_r_peak_order() {
    for rate in [100, 200, 360, 500] {
        let result = analyze(rate, 10.0, Some(3)).unwrap();
        assert!(!result.records.is_empty());
        for (i, record) in result.records.iter().enumerate() {
            assert_eq!(record.beat_index, i);
            assert_eq!(record.rr_interval_ms.is_none(), i == 0);
            assert_eq!(record.heart_rate_bpm.is_none(), i == 0);
        }
        assert!(result
            .records
            .windows(2)
            .all(|w| w[0].r_peak_sample < w[1].r_peak_sample));
    }
}

#[test]
fn segments_nest_around_every_r_peak() {
    for bpm in [45.0, 60.0, 72.0, 110.0, 150.0] {
        for rate in [100, 250, 500] {
            let result = analyze_with_config(rate, 10.0, Some(8), &at_bpm(bpm)).unwrap();
            for r in &result.records {
                assert!(
                    r.p_offset_sample <= r.qrs_onset_sample
                        && r.qrs_onset_sample <= r.r_peak_sample
                        && r.r_peak_sample <= r.qrs_offset_sample
                        && r.qrs_offset_sample <= r.t_onset_sample,
                    "{bpm} bpm at {rate} Hz: {r:?}"
                );
                assert!(r.p_onset_sample <= r.p_peak_sample);
                assert!(r.p_peak_sample <= r.p_offset_sample);
                assert!(r.t_onset_sample <= r.t_peak_sample);
                assert!(r.t_peak_sample <= r.t_offset_sample);
            }
        }
    }
}

#[test]
fn adjacent_peaks_respect_refractory_gap() {
    let min_rr_s = DetectorConfig::default().min_rr_s;
    for bpm in [60.0, 150.0, 200.0] {
        for rate in [100, 250, 500] {
            let result = analyze_with_config(rate, 10.0, Some(5), &at_bpm(bpm)).unwrap();
            let gap = refractory_samples(rate, min_rr_s);
            for w in result.r_peaks.indices.windows(2) {
                assert!(w[1] - w[0] >= gap);
                assert!((w[1] - w[0]) as f64 / rate as f64 >= min_rr_s - 1e-12);
            }
        }
    }
}

#[test]
fn durations_are_never_negative() {
    let mut cfg = at_bpm(90.0);
    cfg.synth.rr_jitter = 0.3;
    cfg.synth.noise_std = 0.05;
    for seed in 0..5 {
        let result = analyze_with_config(250, 10.0, Some(seed), &cfg).unwrap();
        for r in &result.records {
            for value in [
                r.p_duration_ms,
                r.pr_interval_ms,
                r.qrs_duration_ms,
                r.st_segment_ms,
                r.qt_interval_ms,
                r.t_duration_ms,
            ] {
                assert!(value >= 0.0, "{r:?}");
            }
            if let Some(rr) = r.rr_interval_ms {
                assert!(rr >= 0.0);
            }
        }
    }
}

const RATES: [u32; 9] = [100, 170, 250, 360, 420, 440, 470, 490, 500];

#[test]
fn sixty_bpm_is_normal_sinus() {
    for rate in RATES {
        for seed in 0..5 {
            for duration in [5.0, 10.0] {
                let result =
                    analyze_with_config(rate, duration, Some(seed), &at_bpm(60.0)).unwrap();
                let hr = result.summary.mean_heart_rate_bpm.unwrap();
                assert!(
                    (hr - 60.0).abs() < 0.5,
                    "{rate} Hz seed {seed} {duration} s: mean rate {hr}"
                );
                assert_eq!(
                    result.summary.rhythm_label,
                    RhythmLabel::NormalSinusRhythm,
                    "{rate} Hz seed {seed} {duration} s: peaks {:?}",
                    result.r_peaks.indices
                );
            }
        }
    }
}

#[test]
fn sixty_bpm_peaks_land_on_whole_seconds() {
    // Beats fall exactly on samples here; noise must not shift the pick.
    for (rate, seed) in [(490, 0), (420, 4), (440, 4), (470, 2)] {
        let result = analyze_with_config(rate, 5.0, Some(seed), &at_bpm(60.0)).unwrap();
        let expected: Vec<usize> = (1..5).map(|k| k * rate as usize).collect();
        assert_eq!(result.r_peaks.indices, expected, "{rate} Hz seed {seed}");
    }
}

#[test]
fn one_fifty_bpm_is_tachycardia() {
    for rate in RATES {
        for seed in 0..5 {
            for duration in [5.0, 10.0] {
                let result =
                    analyze_with_config(rate, duration, Some(seed), &at_bpm(150.0)).unwrap();
                let hr = result.summary.mean_heart_rate_bpm.unwrap();
                assert!(
                    (140.0..=160.0).contains(&hr),
                    "{rate} Hz seed {seed} {duration} s: mean rate {hr}"
                );
                assert_eq!(
                    result.summary.rhythm_label,
                    RhythmLabel::Tachycardia,
                    "{rate} Hz seed {seed} {duration} s"
                );
            }
        }
    }
}

#[test]
fn record_shorter_than_one_beat_is_empty() {
    let result = analyze_with_config(250, 1.0, Some(42), &at_bpm(40.0)).unwrap();
    assert_eq!(result.summary.beat_count, 0);
    assert_eq!(result.summary.mean_heart_rate_bpm, None);
    assert_eq!(result.summary.mean_rr_ms, None);
    assert_eq!(result.summary.rhythm_label, RhythmLabel::InsufficientData);
    assert!(result.records.is_empty());
}

#[test]
fn rate_of_fifty_is_rejected() {
    match analyze(50, 5.0, None) {
        Err(EngineError::InvalidParameter { name, value, .. }) => {
            assert_eq!(name, "sampling_rate");
            assert_eq!(value, 50.0);
        }
        other => panic!("expected InvalidParameter, got {other:?}"),
    }
    assert!(matches!(
        analyze(250, 0.5, None),
        Err(EngineError::InvalidParameter {
            name: "duration_seconds",
            ..
        })
    ));
}

#[test]
fn rows_round_trip_through_csv() {
    let mut cfg = at_bpm(80.0);
    cfg.synth.rr_jitter = 0.1;
    let result = analyze_with_config(360, 10.0, Some(17), &cfg).unwrap();
    let mut buf = Vec::new();
    write_annotations_csv(&mut buf, &result.records).unwrap();
    let parsed = read_annotations_csv(buf.as_slice()).unwrap();
    assert_eq!(parsed.len(), result.records.len());
    for (a, b) in parsed.iter().zip(&result.records) {
        assert_eq!(a.beat_index, b.beat_index);
        assert_eq!(a.r_peak_sample, b.r_peak_sample);
        assert!((a.r_peak_time_s - b.r_peak_time_s).abs() < 1e-12);
        assert!((a.qt_interval_ms - b.qt_interval_ms).abs() < 1e-9);
        assert!((a.qrs_amplitude_mv - b.qrs_amplitude_mv).abs() < 1e-12);
        assert_eq!(a.rr_interval_ms.is_some(), b.rr_interval_ms.is_some());
        assert_eq!(a.rhythm, b.rhythm);
    }
    assert_eq!(parsed, result.records);
}

#[test]
fn concurrent_runs_match_sequential_ones() {
    let inputs = [(250, 10.0, 1), (360, 8.0, 2), (500, 6.0, 3), (100, 10.0, 4)];
    let sequential: Vec<_> = inputs
        .iter()
        .map(|&(rate, duration, seed)| analyze(rate, duration, Some(seed)).unwrap())
        .collect();
    let parallel: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|&(rate, duration, seed)| {
                scope.spawn(move || analyze(rate, duration, Some(seed)).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(sequential, parallel);
}
