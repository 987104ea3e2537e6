//! Integration Tests
//!
//! End-to-end tests for the Bandfade stimulus pipeline.

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use bandfade::cli::commands;
use bandfade::config::FaderConfig;
use bandfade::controller::{run_conditions, write_outputs, Condition};
use bandfade::dsp::fader::delay_samples;
use bandfade::dsp::{
    db2mag, mag2db, set_rms, Band, BandSplitConfig, BandSplitter, ChannelBalance, Direction,
    StablePlacement, TransitionEngine, TransitionSpec,
};
use bandfade::engine::{export_audio, import_audio, AudioBuffer, SourceFormat};
use bandfade::sink::{MemorySink, WavFileSink};
use bandfade::FadeError;

const SR: u32 = 48000;

/// Helper to create a multi-tone buffer spanning both bands
fn create_multitone(sample_rate: u32, duration_secs: f64) -> Vec<f64> {
    let num_samples = (sample_rate as f64 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            0.25 * (2.0 * PI * 180.0 * t).sin()
                + 0.2 * (2.0 * PI * 700.0 * t + 0.5).sin()
                + 0.15 * (2.0 * PI * 2300.0 * t + 1.0).sin()
                + 0.1 * (2.0 * PI * 3100.0 * t + 2.0).sin()
        })
        .collect()
}

/// The reference scenario: 1 s stable, 1 s ramp, 1 s stable, -10 dB floor
fn scenario_spec() -> TransitionSpec {
    let mut spec = TransitionSpec::new(SR, 1.0);
    spec.stable_secs = 1.0;
    spec
}

// === Level Meter / Normalizer ===

#[test]
fn test_db_conversions_are_inverse() {
    for db in [-60.0, -10.0, 0.0, 6.0] {
        assert_abs_diff_eq!(mag2db(db2mag(db)).unwrap(), db, epsilon = 1e-12);
    }
    assert!(matches!(
        mag2db(0.0),
        Err(FadeError::NonPositiveMagnitude { .. })
    ));
}

#[test]
fn test_set_rms_hits_target() {
    let buffer = AudioBuffer::mono(create_multitone(SR, 0.5), SR);
    for target in [-40.0, -20.0, -3.0] {
        let leveled = set_rms(&buffer, target, ChannelBalance::PreserveIld).unwrap();
        assert_abs_diff_eq!(leveled.rms_db().unwrap(), target, epsilon = 1e-9);
    }
}

#[test]
fn test_set_rms_keeps_ild() {
    let left = create_multitone(SR, 0.5);
    let right: Vec<f64> = left.iter().map(|s| s * db2mag(-9.0)).collect();
    let buffer = AudioBuffer::stereo(left, right, SR).unwrap();

    let leveled = set_rms(&buffer, -30.0, ChannelBalance::PreserveIld).unwrap();
    let l = leveled.channel_rms_db(0).unwrap();
    let r = leveled.channel_rms_db(1).unwrap();
    assert_abs_diff_eq!(l - r, 9.0, epsilon = 1e-6);
    assert_abs_diff_eq!((l + r) / 2.0, -30.0, epsilon = 1e-6);
}

// === Band Splitter ===

#[test]
fn test_band_split_reconstructs_stereo_input() {
    let left = create_multitone(SR, 0.5);
    let right: Vec<f64> = left.iter().rev().copied().collect();
    let signal = AudioBuffer::stereo(left, right, SR).unwrap();
    let bands = BandSplitter::new(BandSplitConfig::default(), SR)
        .unwrap()
        .split(&signal)
        .unwrap();

    let sum = bands.low.add(&bands.high).unwrap();
    for ch in 0..2 {
        for i in 0..signal.len() {
            assert_abs_diff_eq!(sum.channel(ch)[i], signal.channel(ch)[i], epsilon = 1e-9);
        }
    }
}

// === Transition Engine ===

#[test]
fn test_reference_scenario_all_ones() {
    let signal = AudioBuffer::mono(vec![1.0; 3 * SR as usize], SR);
    let engine = TransitionEngine::new(&signal, scenario_spec()).unwrap();
    let result = engine.run(Band::Full, None).unwrap();
    let floor = db2mag(-10.0);

    assert_eq!(result.edge2 - result.edge1, 48000);
    let gains = result.envelope.gains();
    assert_eq!(gains[0], 1.0);
    assert_abs_diff_eq!(*gains.last().unwrap(), floor, epsilon = 1e-12);
    assert_abs_diff_eq!(gains[result.edge2 - 1], floor, epsilon = 1e-12);
    assert!(gains[result.edge1..result.edge2]
        .windows(2)
        .all(|w| w[1] <= w[0]));

    let tail = result
        .gated_segment
        .slice(result.edge2..result.gated_segment.len())
        .unwrap();
    assert_abs_diff_eq!(tail.rms().unwrap(), floor, epsilon = 1e-12);

    let drop = result.drop.unwrap();
    assert_abs_diff_eq!(drop.gated_drop_db(), 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(result.original_rms_db, 0.0);
}

#[test]
fn test_direct_path_delay_alignment() {
    for sample_rate in [16000, 44100, 48000] {
        let mut spec = TransitionSpec::new(sample_rate, 0.5);
        spec.stable_secs = 0.25;
        let signal = AudioBuffer::mono(create_multitone(sample_rate, 1.0), sample_rate);
        let result = TransitionEngine::new(&signal, spec)
            .unwrap()
            .run(Band::Low, Some(Band::High))
            .unwrap();

        let delay = (0.005 * sample_rate as f64).ceil() as usize;
        assert_eq!(result.delay_samples, delay);
        assert_eq!(delay_samples(sample_rate, 5.0), delay);
        assert_eq!(
            result.final_with_direct_path.len(),
            result.recombined_with_stable_band.len() - delay
        );
    }
}

#[test]
fn test_direct_path_is_leveled_below_source() {
    let signal = AudioBuffer::mono(create_multitone(SR, 3.0), SR);
    let result = TransitionEngine::new(&signal, scenario_spec())
        .unwrap()
        .run(Band::High, Some(Band::Low))
        .unwrap();

    let expected = (signal.rms_db().unwrap() * 100.0).round() / 100.0 - 6.0;
    assert_abs_diff_eq!(result.direct_rms_db.unwrap(), expected, epsilon = 1e-9);
}

#[test]
fn test_unsupported_placement_is_config_error() {
    let err = "end".parse::<StablePlacement>().unwrap_err();
    assert!(matches!(err, FadeError::InvalidConfig { .. }));
    assert!(serde_json::from_str::<FaderConfig>(r#"{"stable_placement": "end"}"#).is_err());
}

#[test]
fn test_insufficient_duration_reports_counts() {
    let signal = AudioBuffer::mono(vec![1.0; SR as usize], SR);
    match TransitionEngine::new(&signal, scenario_spec()) {
        Err(FadeError::InsufficientDuration {
            required,
            available,
        }) => {
            assert_eq!(required, 144000);
            assert_eq!(available, 48000);
        }
        other => panic!("Expected InsufficientDuration, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_increase_ramps_up() {
    let mut spec = scenario_spec();
    spec.direction = Direction::Increase;
    spec.direct_path = false;
    let signal = AudioBuffer::mono(create_multitone(SR, 3.0), SR);
    let result = TransitionEngine::new(&signal, spec)
        .unwrap()
        .run(Band::Full, None)
        .unwrap();

    let drop = result.drop.unwrap();
    assert_abs_diff_eq!(drop.gated_drop_db(), -10.0, epsilon = 0.2);
    assert_eq!(result.final_with_direct_path, result.recombined_with_stable_band);
}

#[test]
fn test_engine_does_not_touch_input() {
    let samples = create_multitone(SR, 3.0);
    let signal = AudioBuffer::mono(samples.clone(), SR);
    let _ = TransitionEngine::new(&signal, scenario_spec())
        .unwrap()
        .run(Band::Low, Some(Band::High))
        .unwrap();
    assert_eq!(signal.channel(0), samples.as_slice());
}

// === Controller + Sinks ===

#[test]
fn test_stereo_conditions_keep_channels() {
    let left = create_multitone(SR, 1.0);
    let right: Vec<f64> = left.iter().map(|s| s * 0.5).collect();
    let signal = AudioBuffer::stereo(left, right, SR).unwrap();
    let config = FaderConfig {
        transition_durations: vec![0.5],
        stable_secs: 0.25,
        ..Default::default()
    };

    let outputs = run_conditions(&signal, &config).unwrap();
    let mut sink = MemorySink::new();
    write_outputs(&outputs, &mut sink).unwrap();

    assert_eq!(sink.len(), 3);
    for (_, buffer) in sink.entries() {
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.len(), SR as usize - 240);
    }
}

#[test]
fn test_wav_sink_keeps_source_format() {
    let dir = tempdir().unwrap();
    let signal = AudioBuffer::mono(create_multitone(SR, 1.0), SR);
    let config = FaderConfig {
        transition_durations: vec![0.5],
        stable_secs: 0.25,
        conditions: vec![Condition::Overall],
        ..Default::default()
    };

    let outputs = run_conditions(&signal, &config).unwrap();
    let mut sink = WavFileSink::new(dir.path(), SourceFormat::Int24).unwrap();
    write_outputs(&outputs, &mut sink).unwrap();

    let decoded = import_audio(&dir.path().join("decrease_OAG_0.5.wav")).unwrap();
    assert_eq!(decoded.source, SourceFormat::Int24);
    assert_eq!(decoded.buffer.len(), SR as usize - 240);
}

// === CLI commands ===

#[test]
fn test_fade_command_end_to_end() {
    let dir = tempdir().unwrap();
    let speech = dir.path().join("speech.wav");
    let babble = dir.path().join("babble.wav");
    let config_path = dir.path().join("fader.json");
    let out_dir = dir.path().join("out");

    let sr = 16000;
    export_audio(
        &AudioBuffer::mono(create_multitone(sr, 1.0), sr).scaled(0.5),
        &speech,
        SourceFormat::Int16,
    )
    .unwrap();
    export_audio(
        &AudioBuffer::mono(create_multitone(sr, 1.5), sr).scaled(0.2),
        &babble,
        SourceFormat::Int16,
    )
    .unwrap();

    let config = FaderConfig {
        transition_durations: vec![0.25, 0.5],
        stable_secs: 0.25,
        ..Default::default()
    };
    config.save(&config_path).unwrap();

    commands::fade(
        &[speech, babble],
        &out_dir,
        Some(&config_path),
        &[Condition::LowBand, Condition::HighBand],
        true,
    )
    .unwrap();

    for name in [
        "decrease_LFG_0.25",
        "decrease_HFG_0.25",
        "decrease_LFG_0.5",
        "decrease_HFG_0.5",
    ] {
        let decoded = import_audio(&out_dir.join(format!("{}.wav", name))).unwrap();
        assert_eq!(decoded.source, SourceFormat::Int16);
        assert_eq!(decoded.buffer.sample_rate(), sr);
        assert_abs_diff_eq!(decoded.buffer.peak(), 1.0, epsilon = 1e-4);
    }
    assert!(!out_dir.join("decrease_OAG_0.5.wav").exists());
}

#[test]
fn test_set_level_command() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    export_audio(
        &AudioBuffer::mono(create_multitone(SR, 0.5), SR),
        &input,
        SourceFormat::Float32,
    )
    .unwrap();

    commands::set_level(&input, &output, -25.0, false).unwrap();

    let decoded = import_audio(&output).unwrap();
    assert_abs_diff_eq!(decoded.buffer.rms_db().unwrap(), -25.0, epsilon = 1e-4);
    commands::measure(&output).unwrap();
}

#[test]
fn test_init_config_writes_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("default.json");
    commands::init_config(&path).unwrap();
    assert_eq!(FaderConfig::load(&path).unwrap(), FaderConfig::default());
}
