//! End-to-end scenarios for the rug processor: resequencing, eviction, cadence,
//! coloring consistency and idempotent redraws.

use motion_rugs::core_modules::quantizer::BUCKETS;
use motion_rugs::{FrameMessage, Reading, RugConfig, RugImage, RugProcessor, Strategy};

// =============================================================================
// HELPERS
// =============================================================================

/// Generous canvas width: a 1000-column window.
const WIDE: u32 = 4000;

fn pair_of_movers() -> Vec<Reading> {
    vec![
        Reading::new(10.12345, 20.54321).with_feature("Velocity", 5.0),
        Reading::new(10.12399, 20.54399).with_feature("Velocity", 9.0),
    ]
}

fn processor(strategies: Vec<Strategy>, redraw_interval: usize) -> RugProcessor {
    RugProcessor::new(RugConfig {
        strategies,
        redraw_interval,
        ..RugConfig::default()
    })
    .expect("valid config")
}

/// A small fleet drifting across a few hundred metres, with velocity varying per mover.
fn fleet_frame(number: u64, movers: usize) -> Vec<Reading> {
    (0..movers)
        .map(|i| {
            let t = number as f64;
            let phase = i as f64 * 0.7;
            Reading::new(48.1 + 0.002 * (phase + 0.05 * t).sin(), 11.5 + 0.003 * (phase * 1.3 + 0.04 * t).cos())
                .with_feature("Velocity", 10.0 + 5.0 * (phase + 0.1 * t).sin())
                .with_feature("Acceleration", (phase - 0.2 * t).cos())
        })
        .collect()
}

fn velocities(rug: &RugImage, column: usize) -> Vec<f64> {
    rug.ordered[column].readings.iter().map(|r| r.reading.feature("Velocity")).collect()
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test_log::test]
fn two_movers_render_consistent_rugs() {
    let mut processor = processor(vec![Strategy::Hilbert, Strategy::ZOrder], 1);

    let mut last = Vec::new();
    for number in 0..3 {
        last = processor.handle(FrameMessage::new(number, pair_of_movers(), WIDE)).unwrap();
    }

    assert_eq!(last.len(), 2);
    for rug in &last {
        assert_eq!(rug.feature, "Velocity");
        assert_eq!((rug.width(), rug.height()), (3, 2));

        // The relative position never changes, so every column is ordered alike.
        let first_column = velocities(rug, 0);
        for column in 1..3 {
            assert_eq!(velocities(rug, column), first_column);
        }

        // Both rows keep their color across all three columns.
        for row in 0..2u32 {
            let reference = rug.pixels.get_pixel(0, row);
            for column in 1..3u32 {
                assert_eq!(rug.pixels.get_pixel(column, row), reference);
            }
        }
    }
}

#[test_log::test]
fn late_frame_triggers_a_redraw_of_the_whole_run() {
    let mut processor = processor(vec![Strategy::Hilbert], 1);

    let after_zero = processor.handle(FrameMessage::new(0, pair_of_movers(), WIDE)).unwrap();
    assert_eq!(after_zero.len(), 1);
    assert_eq!(after_zero[0].width(), 1);

    let after_two = processor.handle(FrameMessage::new(2, pair_of_movers(), WIDE)).unwrap();
    assert!(after_two.is_empty());
    assert_eq!(processor.sequencer().window_numbers(), vec![0]);

    let after_one = processor.handle(FrameMessage::new(1, pair_of_movers(), WIDE)).unwrap();
    assert_eq!(after_one.len(), 1);
    assert_eq!(processor.sequencer().window_numbers(), vec![0, 1, 2]);
    let columns: Vec<u64> = after_one[0].ordered.iter().map(|frame| frame.number).collect();
    assert_eq!(columns, vec![0, 1, 2]);
}

#[test]
fn window_keeps_only_the_newest_frames() {
    let mut processor = processor(vec![Strategy::Hilbert], 1);
    // A canvas 8 pixels wide holds two columns.
    for number in 0..3 {
        processor.handle(FrameMessage::new(number, pair_of_movers(), 8)).unwrap();
    }
    assert_eq!(processor.sequencer().window_numbers(), vec![1, 2]);
    assert_eq!(processor.ordered_window(Strategy::Hilbert).unwrap().len(), 2);
}

#[test]
fn shuffled_arrivals_release_a_gap_free_window() {
    let mut processor = processor(vec![Strategy::ZOrder], 4);
    let arrival = [1, 0, 3, 2, 5, 4, 9, 7, 6, 8, 11, 10];
    for number in arrival {
        processor.handle(FrameMessage::new(number, fleet_frame(number, 6), WIDE)).unwrap();
    }
    assert_eq!(processor.sequencer().window_numbers(), (0..12).collect::<Vec<_>>());
    assert_eq!(processor.sequencer().pending_len(), 0);
}

#[test_log::test]
fn redrawing_an_unchanged_window_is_idempotent() {
    let mut processor = RugProcessor::new(RugConfig {
        strategies: vec![Strategy::Hilbert, Strategy::ZOrder],
        features: vec!["Velocity".to_string(), "Acceleration".to_string()],
        redraw_interval: 5,
        ..RugConfig::default()
    })
    .unwrap();
    for number in 0..20 {
        processor.handle(FrameMessage::new(number, fleet_frame(number, 12), WIDE)).unwrap();
    }

    let first = processor.recompute().unwrap();
    let deciles = processor.deciles("Velocity").cloned();
    let second = processor.recompute().unwrap();

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    assert_eq!(processor.deciles("Velocity").cloned(), deciles);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.pixels.as_raw(), b.pixels.as_raw());
    }
}

#[test]
fn every_pixel_comes_from_a_valid_bucket_and_an_unmodified_reading() {
    let mut processor = processor(vec![Strategy::Hilbert, Strategy::ZOrder], 1);
    let mut rugs = Vec::new();
    for number in 0..15 {
        rugs = processor.handle(FrameMessage::new(number, fleet_frame(number, 9), WIDE)).unwrap();
    }
    let palette = processor.config().color_palette().unwrap();

    for rug in &rugs {
        assert_eq!((rug.width(), rug.height()), (15, 9));
        for (x, frame) in rug.ordered.iter().enumerate() {
            let source = &processor.window()[x];
            assert_eq!(frame.number, source.number);
            for (y, ranked) in frame.readings.iter().enumerate() {
                let bucket = ranked.color_index.expect("annotated");
                assert!(bucket < BUCKETS);
                assert!(source.readings.contains(&ranked.reading));

                let [r, g, b] = palette.color(bucket).0;
                assert_eq!(rug.pixels.get_pixel(x as u32, y as u32).0, [r, g, b, 255]);
            }
        }
    }
}

#[test]
fn deciles_are_shared_across_strategies() {
    let mut single = processor(vec![Strategy::Hilbert], 1);
    let mut both = processor(vec![Strategy::Hilbert, Strategy::ZOrder], 1);
    for number in 0..10 {
        single.handle(FrameMessage::new(number, fleet_frame(number, 7), WIDE)).unwrap();
        both.handle(FrameMessage::new(number, fleet_frame(number, 7), WIDE)).unwrap();
    }
    assert_eq!(single.deciles("Velocity"), both.deciles("Velocity"));
    let thresholds = both.deciles("Velocity").unwrap().thresholds();
    assert!(thresholds.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn unparseable_feature_values_fall_into_the_last_bucket() {
    let mut processor = processor(vec![Strategy::Hilbert], 1);
    let json = r#"{"fData": [
        {"LatitudeGPS": 10.12345, "LongitudeGPS": 20.54321, "Velocity": "fast"},
        {"LatitudeGPS": 10.12399, "LongitudeGPS": 20.54399, "Velocity": 3}
    ], "fNum": 0, "width": 400}"#;
    let message: FrameMessage = serde_json::from_str(json).unwrap();

    let rugs = processor.handle(message).unwrap();
    let nan_row = rugs[0]
        .ordered[0]
        .readings
        .iter()
        .find(|r| r.reading.feature("Velocity").is_nan())
        .unwrap();
    assert_eq!(nan_row.color_index, Some(BUCKETS - 1));
}
