use std::time::Duration;

use crate::model::Classification;

/// Outcome of comparing total transfer time against time to first byte.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub classification: Classification,
    /// `total - ttfb`, absent when no body byte arrived.
    pub margin_seconds: Option<f64>,
}

/// Classify a completed transfer.
///
/// A body is streamed when it keeps arriving for strictly longer than
/// `threshold` after its first byte; a margin equal to the threshold is
/// buffered. A body with no bytes at all is buffered.
pub fn classify(ttfb_seconds: Option<f64>, total_seconds: f64, threshold: Duration) -> Verdict {
    let Some(ttfb) = ttfb_seconds else {
        return Verdict {
            classification: Classification::Buffered,
            margin_seconds: None,
        };
    };

    let margin = total_seconds - ttfb;
    let classification = if total_seconds > ttfb + threshold.as_secs_f64() {
        Classification::Streamed
    } else {
        Classification::Buffered
    };

    Verdict {
        classification,
        margin_seconds: Some(margin),
    }
}
