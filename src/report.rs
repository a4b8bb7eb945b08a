use std::fmt::Write;

use crate::model::{escape_payload, Classification, VerificationResult};

/// Render a result as the operator-facing text report.
pub fn render_text(result: &VerificationResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", summary_line(result));
    let _ = writeln!(out, "Endpoint: {}", result.endpoint);
    let _ = writeln!(out, "Target: {}", result.target_url);
    let _ = writeln!(
        out,
        "Response status: {}",
        result
            .http_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    if !result.headers.is_empty() {
        let _ = writeln!(out, "Headers:");
        for (name, value) in &result.headers {
            let _ = writeln!(out, "  {}: {}", name, value);
        }
    }
    let _ = writeln!(out, "Headers received: {}", secs(result.headers_elapsed_seconds));
    let _ = writeln!(
        out,
        "Time to First Byte (TTFB): {}",
        secs(result.time_to_first_byte_seconds)
    );
    let _ = writeln!(out, "Total time: {:.4}s", result.total_elapsed_seconds);
    let _ = writeln!(out, "Total bytes: {}", result.total_bytes);
    let _ = writeln!(out, "Read iterations: {}", result.sample_count);

    if !result.first_samples.is_empty() {
        let _ = writeln!(out, "First {} samples:", result.first_samples.len());
        for sample in &result.first_samples {
            let _ = writeln!(
                out,
                "  #{} b'{}' at {:.4}s",
                sample.sequence_number,
                escape_payload(&sample.payload),
                sample.elapsed_seconds
            );
        }
    }

    if !result.service.is_empty() {
        let _ = writeln!(out, "Fetch service metadata:");
        if let Some(status) = result.service.upstream_status {
            let _ = writeln!(out, "  upstream status: {}", status);
        }
        if let Some(url) = &result.service.final_url {
            let _ = writeln!(out, "  final url: {}", url);
        }
        if let Some(ts) = &result.service.fetched_at {
            let _ = writeln!(out, "  fetched at: {}", ts);
        }
    }

    if let Some(margin) = result.margin_seconds {
        let _ = writeln!(
            out,
            "Margin (total - TTFB): {:.4}s against threshold {:.4}s",
            margin, result.threshold_seconds
        );
    }

    if let Some(failure) = &result.failure {
        let _ = writeln!(out, "Failure: {}", failure.message);
    }

    out
}

/// Render a result as pretty-printed JSON.
pub fn render_json(result: &VerificationResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

fn summary_line(result: &VerificationResult) -> String {
    match result.classification {
        Classification::Streamed => {
            "SUCCESS: Streaming detected (total time exceeds TTFB by more than the threshold)"
                .to_string()
        }
        Classification::Buffered => {
            "WARNING: Streaming might not be working (total time close to TTFB)".to_string()
        }
        Classification::Failed => match &result.failure {
            Some(failure) => format!("FAILED: {:?}", failure.kind),
            None => "FAILED".to_string(),
        },
    }
}

fn secs(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}s", v),
        None => "n/a".to_string(),
    }
}
