/// Production-level stress testing for the detection pipeline.
///
/// These tests target failure modes that only show up under long,
/// corrupted, or pathological input streams.

#[cfg(test)]
mod stress_tests {
    use crate::fall::FallStage;
    use crate::pipeline::*;
    use crate::simulate::{SessionBuilder, GRAVITY};
    use crate::types::*;
    use proptest::prelude::*;

    fn assert_finite(v: [f32; 3]) {
        assert!(v.iter().all(|c| c.is_finite()), "non-finite state: {v:?}");
    }

    // ============================================================================
    // CATEGORY 1: EXTREME DURATION & THROUGHPUT
    // ============================================================================

    /// Ten minutes of mixed daily activity at 50Hz without a single fall.
    #[test]
    fn stress_ten_minute_daily_activity_no_false_fall() {
        let mut session = SessionBuilder::new(0).with_dedicated_linear();
        for round in 0..20 {
            session = match round % 4 {
                0 => session.rest(10_000).run(10_000),
                1 => session.sustained(5_000, 11.5).get_up(5_000).rest(20_000),
                2 => session.lie_still(15_000).get_up(5_000).run(10_000),
                _ => session.rest(35_000).get_up(5_000),
            };
        }
        let samples = session.build();
        assert!(samples.last().unwrap().timestamp_ms >= 600_000 - 20);

        let mut pipeline = DetectionPipeline::with_defaults();
        let mut max_window = 0;
        for sample in &samples {
            let outcome = pipeline.process_sample(sample).unwrap();
            if let Some(event) = outcome.fall {
                panic!("false fall at {}", event.timestamp_ms);
            }
            max_window = max_window.max(pipeline.tremor_window_len());
        }

        assert_eq!(pipeline.stats().falls_emitted, 0);
        assert_eq!(pipeline.stats().samples_rejected, 0);
        // 3s at 50Hz, inclusive of both ends
        assert!(max_window <= 151, "window grew to {max_window}");
    }

    /// 1kHz input keeps the tremor window bounded by time, not count.
    #[test]
    fn stress_high_rate_window_bounded() {
        let samples = SessionBuilder::new(0)
            .with_dedicated_linear()
            .with_interval_ms(1)
            .tremor(10_000, 5.0, 4.0)
            .build();

        let mut pipeline = DetectionPipeline::with_defaults();
        for sample in &samples {
            pipeline.process_sample(sample).unwrap();
            assert!(pipeline.tremor_window_len() <= 3001);
        }
    }

    // ============================================================================
    // CATEGORY 2: CORRUPTED INPUT
    // ============================================================================

    /// Values right at the saturation limit are accepted; beyond it rejected.
    #[test]
    fn stress_axis_limit_boundary() {
        let mut pipeline = DetectionPipeline::with_defaults();
        assert!(pipeline
            .process_sample(&Sample::accelerometer(0, [160.0, -160.0, 160.0]))
            .is_ok());
        assert!(pipeline
            .process_sample(&Sample::accelerometer(20, [160.1, 0.0, 0.0]))
            .is_err());
        assert!(pipeline
            .process_sample(&Sample::linear(40, [0.0, -1.0e9, 0.0]))
            .is_err());
        assert_eq!(pipeline.stats().samples_rejected, 2);
        assert_finite(pipeline.gravity());
    }

    /// Periodic NaN/inf bursts are rejected and never poison the filters.
    #[test]
    fn stress_nan_and_inf_corruption() {
        let samples = SessionBuilder::new(0)
            .with_dedicated_linear()
            .rest(1000)
            .tremor(8000, 5.0, 4.0)
            .build();

        let mut pipeline = DetectionPipeline::with_defaults();
        let mut events: Vec<DetectionEvent> = Vec::new();
        let mut rejected = 0;
        for (i, sample) in samples.iter().enumerate() {
            let mut sample = *sample;
            match i % 7 {
                3 => sample.values[0] = f32::NAN,
                5 => sample.values[2] = f32::NEG_INFINITY,
                _ => {}
            }
            match pipeline.feed(&sample, &mut events) {
                Ok(()) => {}
                Err(_) => rejected += 1,
            }
            assert_finite(pipeline.gravity());
        }

        assert_eq!(pipeline.stats().samples_rejected, rejected);
        assert!(rejected > 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::Tremor);
    }

    /// Timestamps jumping backwards must not panic or underflow.
    #[test]
    fn stress_nonmonotonic_timestamps() {
        let mut pipeline = DetectionPipeline::with_defaults();
        let timestamps = [5000u64, 4000, 6000, 0, 100, 7000, 6999, 3, 10_000, 9_000];
        for (i, &t) in timestamps.iter().cycle().take(500).enumerate() {
            let wobble = if i % 2 == 0 { 2.0 } else { -2.0 };
            pipeline
                .process_sample(&Sample::accelerometer(t, [wobble, 0.0, GRAVITY]))
                .unwrap();
            pipeline
                .process_sample(&Sample::linear(t, [wobble, 0.0, 0.0]))
                .unwrap();
            pipeline
                .process_sample(&Sample::gravity(t, [0.0, 0.0, GRAVITY]))
                .unwrap();
        }
        assert_finite(pipeline.gravity());
        assert_eq!(pipeline.stats().samples_processed, 1500);
    }

    /// A sensor clock that restarts near zero must not strand the tremor
    /// window on the old timeline.
    #[test]
    fn stress_clock_restart_keeps_detecting() {
        let mut samples = SessionBuilder::new(100_000)
            .with_dedicated_linear()
            .tremor(2000, 5.0, 4.0)
            .build();
        samples.extend(
            SessionBuilder::new(0)
                .with_dedicated_linear()
                .tremor(10_000, 5.0, 4.0)
                .build(),
        );

        let mut pipeline = DetectionPipeline::with_defaults();
        let mut events: Vec<DetectionEvent> = Vec::new();
        let mut max_window = 0;
        for sample in &samples {
            pipeline.feed(sample, &mut events).unwrap();
            max_window = max_window.max(pipeline.tremor_window_len());
        }

        assert!(max_window <= 151, "window grew to {max_window}");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::Tremor);
        assert!(events[0].timestamp_ms < 10_000);
        assert_eq!(pipeline.stats().falls_emitted, 0);
    }

    /// A burst of identical timestamps never satisfies a duration condition.
    #[test]
    fn stress_zero_time_deltas() {
        let mut pipeline = DetectionPipeline::with_defaults();
        for _ in 0..1000 {
            pipeline
                .process_sample(&Sample::accelerometer(1234, [0.0, 0.0, 0.2]))
                .unwrap();
        }
        assert!(matches!(
            pipeline.fall_stage(),
            FallStage::FreeFallCandidate { start_ms: 1234 }
        ));
        assert_eq!(pipeline.tremor_hits(), 0);
    }

    /// Timestamps near the end of the u64 range saturate instead of wrapping.
    #[test]
    fn stress_timestamps_near_u64_max() {
        let mut pipeline = DetectionPipeline::with_defaults();
        let start = u64::MAX - 5_000;
        let mut t = start;
        for i in 0..400u64 {
            let z = if (50..70).contains(&i) { 0.3 } else { GRAVITY };
            pipeline
                .process_sample(&Sample::accelerometer(t, [0.0, 0.0, z]))
                .unwrap();
            t = t.saturating_add(20);
        }
        assert_eq!(t, u64::MAX);
        assert_finite(pipeline.gravity());
    }

    // ============================================================================
    // CATEGORY 3: LIFECYCLE
    // ============================================================================

    /// Repeated reset cycles reproduce identical results.
    #[test]
    fn stress_repeated_reset_cycles() {
        let session = SessionBuilder::new(0)
            .with_dedicated_linear()
            .rest(1000)
            .free_fall(300)
            .impact()
            .lie_still(3500)
            .build();

        let mut pipeline = DetectionPipeline::with_defaults();
        let replay = |pipeline: &mut DetectionPipeline| {
            let mut events: Vec<DetectionEvent> = Vec::new();
            for sample in &session {
                pipeline.feed(sample, &mut events).unwrap();
            }
            events
        };

        let expected = replay(&mut pipeline);
        assert_eq!(expected.len(), 1);
        for _ in 0..25 {
            pipeline.reset();
            assert!(pipeline.fall_stage().is_idle());
            assert_eq!(replay(&mut pipeline), expected);
        }
    }

    /// Tiny and huge threshold settings stay panic-free.
    #[test]
    fn stress_extreme_configurations() {
        let mut tight = PipelineConfig::default();
        tight.tremor.window_ms = 1;
        tight.tremor.eval_interval_ms = 1;
        tight.tremor.min_active_samples = 0;
        tight.alert.cooldown_ms = 0;
        tight.fall.stillness_window_ms = 1;

        let mut loose = PipelineConfig::default();
        loose.tremor.window_ms = 600_000;
        loose.fall.impact_window_ms = u64::MAX;
        loose.alert.cooldown_ms = u64::MAX;

        let mut huge_window = PipelineConfig::default();
        huge_window.tremor.window_ms = 1_000_000_000_000;

        let samples = SessionBuilder::new(0)
            .with_dedicated_linear()
            .rest(500)
            .free_fall(300)
            .impact()
            .tremor(5000, 7.0, 5.0)
            .build();

        for config in [tight, loose, huge_window] {
            let mut pipeline = DetectionPipeline::new(config).unwrap();
            for sample in &samples {
                pipeline.process_sample(sample).unwrap();
            }
            assert_finite(pipeline.gravity());
        }
    }

    // ============================================================================
    // CATEGORY 4: PROPERTY-BASED
    // ============================================================================

    fn arb_values() -> impl Strategy<Value = [f32; 3]> {
        prop_oneof![
            4 => (-200.0f32..200.0, -200.0f32..200.0, -200.0f32..200.0).prop_map(|(x, y, z)| [x, y, z]),
            1 => Just([f32::NAN, 0.0, 0.0]),
            1 => Just([0.0, f32::INFINITY, 0.0]),
        ]
    }

    fn arb_kind() -> impl Strategy<Value = SensorKind> {
        prop_oneof![
            Just(SensorKind::Accelerometer),
            Just(SensorKind::Gravity),
            Just(SensorKind::LinearAcceleration),
        ]
    }

    proptest! {
        #[test]
        fn prop_arbitrary_streams_never_panic(
            stream in proptest::collection::vec((0u64..50, arb_kind(), arb_values()), 0..400)
        ) {
            let mut pipeline = DetectionPipeline::with_defaults();
            let mut t = 0u64;
            for (dt, kind, values) in stream {
                t += dt;
                let _ = pipeline.process_sample(&Sample::new(t, kind, values));
                assert_finite(pipeline.gravity());
            }
            let stats = pipeline.stats();
            prop_assert!(stats.falls_emitted + stats.tremors_emitted <= stats.samples_processed);
        }

        #[test]
        fn prop_no_fall_without_free_fall(
            stream in proptest::collection::vec(
                (-20.0f32..20.0, -20.0f32..20.0, 3.5f32..60.0),
                1..600,
            )
        ) {
            // Every raw magnitude stays above the free-fall threshold, so the
            // smoothed magnitude never drops into free-fall.
            let mut pipeline = DetectionPipeline::with_defaults();
            for (i, (x, y, z)) in stream.into_iter().enumerate() {
                let outcome = pipeline
                    .process_sample(&Sample::accelerometer(i as u64 * 20, [x, y, z]))
                    .unwrap();
                prop_assert!(outcome.fall.is_none());
                prop_assert!(pipeline.fall_stage().is_idle());
            }
        }
    }
}
