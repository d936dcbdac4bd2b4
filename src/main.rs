//! Vigil Sensing
//!
//! Fall and tremor detection over streaming 3-axis acceleration.
//!
//! This binary replays synthetic monitoring sessions through the pipeline.
//! Set `RUST_LOG=vigil_sensing=debug` to watch stage transitions and votes.
//! For library use, see lib.rs.

use tracing_subscriber::EnvFilter;
use vigil_sensing::simulate::SessionBuilder;
use vigil_sensing::{DetectionEvent, DetectionPipeline, EventEvidence, Sample};

fn scenarios() -> Vec<(&'static str, Vec<Sample>)> {
    vec![
        (
            "fall",
            SessionBuilder::new(0)
                .with_dedicated_linear()
                .rest(2000)
                .free_fall(350)
                .impact()
                .lie_still(5000)
                .build(),
        ),
        (
            "tremor",
            SessionBuilder::new(0)
                .with_dedicated_linear()
                .rest(2000)
                .tremor(8000, 5.5, 3.5)
                .rest(2000)
                .build(),
        ),
        (
            "stumble",
            SessionBuilder::new(0)
                .with_dedicated_linear()
                .rest(2000)
                .free_fall(300)
                .impact()
                .get_up(4000)
                .build(),
        ),
        (
            "running",
            SessionBuilder::new(0)
                .with_dedicated_linear()
                .rest(2000)
                .run(30_000)
                .build(),
        ),
    ]
}

fn describe(event: &DetectionEvent) -> String {
    match event.evidence {
        EventEvidence::Fall {
            impact_magnitude,
            stillness_peak,
            stillness_rms,
            stillness_samples,
        } => format!(
            "FALL   t={}ms impact={:.1} m/s² stillness peak={:.2} rms={:.2} ({} samples)",
            event.timestamp_ms, impact_magnitude, stillness_peak, stillness_rms, stillness_samples
        ),
        EventEvidence::Tremor {
            rms,
            zero_crossings,
            estimated_hz,
        } => format!(
            "TREMOR t={}ms rms={:.2} m/s² crossings={} ~{:.1}Hz",
            event.timestamp_ms, rms, zero_crossings, estimated_hz
        ),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Vigil Sensing v{}", env!("CARGO_PKG_VERSION"));
    println!("Fall and tremor detection\n");

    let only = std::env::args().nth(1);
    for (name, samples) in scenarios() {
        if only.as_deref().is_some_and(|o| o != name) {
            continue;
        }

        let mut pipeline = DetectionPipeline::with_defaults();
        let mut events: Vec<DetectionEvent> = Vec::new();
        for sample in &samples {
            if let Err(err) = pipeline.feed(sample, &mut events) {
                eprintln!("  sample rejected: {err}");
            }
        }

        println!("== {name} ({} samples)", samples.len());
        if events.is_empty() {
            println!("  no events");
        }
        for event in &events {
            println!("  {}", describe(event));
        }
        let stats = pipeline.stats();
        println!(
            "  processed={} rejected={} suppressed={}\n",
            stats.samples_processed, stats.samples_rejected, stats.alerts_suppressed
        );
    }
}
