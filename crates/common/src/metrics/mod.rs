//! Metrics and observability utilities

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Mosaic metrics
pub const METRICS_PREFIX: &str = "mosaic";

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Ingestion metrics
    describe_counter!(
        format!("{}_stories_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total stories ingested"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Story ingestion latency in seconds"
    );

    describe_counter!(
        format!("{}_asset_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "Total asset upload attempts by kind and status"
    );

    // Geocoding metrics
    describe_counter!(
        format!("{}_geocode_lookups_total", METRICS_PREFIX),
        Unit::Count,
        "Total geocoding lookups by outcome"
    );

    // Generation metrics
    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total curriculum generation requests"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Curriculum generation latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a completed story ingestion
pub fn record_ingestion(duration_secs: f64, story_type: &str, succeeded: bool) {
    let status = if succeeded { "success" } else { "error" };

    counter!(
        format!("{}_stories_ingested_total", METRICS_PREFIX),
        "type" => story_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if succeeded {
        histogram!(format!("{}_ingestion_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    }
}

/// Record one asset upload attempt
pub fn record_upload(kind: &str, succeeded: bool) {
    let status = if succeeded { "success" } else { "error" };

    counter!(
        format!("{}_asset_uploads_total", METRICS_PREFIX),
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a geocoding lookup outcome
pub fn record_geocode(found: bool) {
    let outcome = if found { "found" } else { "not_found" };

    counter!(
        format!("{}_geocode_lookups_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a curriculum generation attempt
pub fn record_generation(duration_secs: f64, model: &str, succeeded: bool) {
    let status = if succeeded { "success" } else { "error" };

    counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if succeeded {
        histogram!(
            format!("{}_generation_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("POST", "/api/generate-curriculum");
        std::thread::sleep(std::time::Duration::from_millis(5));
        metrics.finish(200);
        // Just verify it runs without panic
    }

    #[test]
    fn test_record_helpers() {
        record_ingestion(0.5, "text", true);
        record_upload("image", false);
        record_geocode(true);
        record_generation(1.2, "mock", true);
    }
}
