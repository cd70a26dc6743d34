use {
    prometheus::{Counter, Encoder, Histogram, HistogramOpts, TextEncoder},
    tracing::error,
};

const FAST_OPS_BUCKETS: &[f64] = &[
    0.000_001, 0.000_005, 0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005,
];

const SLOW_OPS_BUCKETS: &[f64] = &[0.000_01, 0.000_1, 0.001, 0.01, 0.05, 0.1, 0.5, 1.0];

pub fn counter(name: &str, help: &str) -> Counter {
    let counter = Counter::new(name, help).expect("Could not create counter");
    prometheus::register(Box::new(counter.clone())).expect("Could not register counter");
    counter
}

fn histogram(name: &str, help: &str, buckets: &[f64]) -> Histogram {
    let opts = HistogramOpts::new(name, help).buckets(buckets.to_vec());
    let histogram = Histogram::with_opts(opts).expect("Could not create histogram");
    prometheus::register(Box::new(histogram.clone())).expect("Could not register histogram");
    histogram
}

/// Histogram for operations that only touch the in-memory map.
pub fn histogram_fast_ops(name: &str, help: &str) -> Histogram {
    histogram(name, help, FAST_OPS_BUCKETS)
}

/// Histogram for operations spanning a request round trip.
pub fn histogram_slow_ops(name: &str, help: &str) -> Histogram {
    histogram(name, help, SLOW_OPS_BUCKETS)
}

/// Renders every registered metric in the Prometheus text format.
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;

    String::from_utf8(buffer).map_err(|e| {
        error!("Metrics output is not valid UTF-8: {}", e);
        prometheus::Error::Msg(e.to_string())
    })
}
