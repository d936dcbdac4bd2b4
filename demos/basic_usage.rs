/// Basic usage example: feed tagged acceleration samples, get gated alerts
use vigil_sensing::{DetectionEvent, DetectionPipeline, PipelineConfig, Sample};

fn main() {
    println!("=== Vigil Sensing: Basic Example ===\n");

    // Default config: calibrated thresholds, 15s alert cooldown
    let config = PipelineConfig::default();
    let mut pipeline = DetectionPipeline::new(config).expect("default config is valid");

    let mut t = 0u64;
    let mut samples = Vec::new();

    // Standing still (1s)
    for _ in 0..50 {
        samples.push(Sample::accelerometer(t, [0.0, 0.0, 9.81]));
        t += 20;
    }
    // Free-fall (300ms)
    for _ in 0..15 {
        samples.push(Sample::accelerometer(t, [0.1, 0.2, 0.3]));
        t += 20;
    }
    // Impact
    samples.push(Sample::accelerometer(t, [15.0, 8.0, 35.0]));
    t += 20;
    // Lying still on the side (4s). A dedicated linear-acceleration sensor
    // reports near-zero motion alongside the raw stream.
    for _ in 0..200 {
        samples.push(Sample::linear(t, [0.03, 0.01, 0.02]));
        samples.push(Sample::accelerometer(t, [9.81, 0.0, 0.1]));
        t += 20;
    }

    println!("Processing {} samples...\n", samples.len());

    // Any closure works as the notification sink
    let mut alerts = 0;
    let mut notify = |event: &DetectionEvent| {
        alerts += 1;
        println!("ALERT #{alerts}: {:?} at {}ms", event.kind(), event.timestamp_ms);
        println!("  evidence: {:?}", event.evidence);
    };

    for sample in &samples {
        if let Err(err) = pipeline.feed(sample, &mut notify) {
            println!("rejected sample: {err}");
        }
    }

    let stats = pipeline.stats();
    println!("\n=== Summary ===");
    println!("Samples processed: {}", stats.samples_processed);
    println!("Falls emitted:     {}", stats.falls_emitted);
    println!("Tremors emitted:   {}", stats.tremors_emitted);
    println!("Final fall stage:  {:?}", pipeline.fall_stage());
}
