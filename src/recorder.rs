use bytes::Bytes;
use tracing::debug;

use crate::model::ByteArrivalSample;

/// Accumulates body reads in arrival order.
///
/// Every read is counted, but only the first `retention` samples are kept.
/// Elapsed times never go backwards: a reading earlier than the previous one
/// is clamped to it.
pub struct SampleRecorder {
    retention: usize,
    first_samples: Vec<ByteArrivalSample>,
    sample_count: u64,
    total_bytes: u64,
    first_byte_seconds: Option<f64>,
    last_elapsed_seconds: f64,
}

impl SampleRecorder {
    pub fn new(retention: usize) -> Self {
        Self {
            retention,
            first_samples: Vec::with_capacity(retention),
            sample_count: 0,
            total_bytes: 0,
            first_byte_seconds: None,
            last_elapsed_seconds: 0.0,
        }
    }

    /// Record one read. Empty payloads are not reads that returned data and
    /// are ignored.
    pub fn record(&mut self, payload: Bytes, elapsed_seconds: f64) {
        if payload.is_empty() {
            return;
        }

        let elapsed_seconds = elapsed_seconds.max(self.last_elapsed_seconds);
        self.last_elapsed_seconds = elapsed_seconds;

        self.sample_count += 1;
        self.total_bytes += payload.len() as u64;
        if self.first_byte_seconds.is_none() {
            self.first_byte_seconds = Some(elapsed_seconds);
        }

        if self.first_samples.len() < self.retention {
            debug!(
                "Sample {}: {} bytes at {:.4}s",
                self.sample_count,
                payload.len(),
                elapsed_seconds
            );
            self.first_samples.push(ByteArrivalSample {
                sequence_number: self.sample_count,
                elapsed_seconds,
                payload,
            });
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn first_byte_seconds(&self) -> Option<f64> {
        self.first_byte_seconds
    }

    pub fn last_elapsed_seconds(&self) -> f64 {
        self.last_elapsed_seconds
    }

    pub fn into_samples(self) -> Vec<ByteArrivalSample> {
        self.first_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_recorder_is_empty() {
        let recorder = SampleRecorder::new(5);
        assert_eq!(recorder.sample_count(), 0);
        assert_eq!(recorder.total_bytes(), 0);
        assert!(recorder.first_byte_seconds().is_none());
        assert!(recorder.into_samples().is_empty());
    }

    #[test]
    fn test_counts_every_read_but_retains_first_n() {
        let mut recorder = SampleRecorder::new(2);
        recorder.record(Bytes::from_static(b"a"), 0.1);
        recorder.record(Bytes::from_static(b"bc"), 0.2);
        recorder.record(Bytes::from_static(b"def"), 0.3);

        assert_eq!(recorder.sample_count(), 3);
        assert_eq!(recorder.total_bytes(), 6);
        assert_eq!(recorder.first_byte_seconds(), Some(0.1));

        let samples = recorder.into_samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].sequence_number, 1);
        assert_eq!(samples[1].sequence_number, 2);
        assert_eq!(samples[1].payload, Bytes::from_static(b"bc"));
    }

    #[test]
    fn test_empty_payload_ignored() {
        let mut recorder = SampleRecorder::new(5);
        recorder.record(Bytes::new(), 0.1);
        recorder.record(Bytes::from_static(b"x"), 0.4);

        assert_eq!(recorder.sample_count(), 1);
        assert_eq!(recorder.first_byte_seconds(), Some(0.4));
        assert_eq!(recorder.into_samples()[0].sequence_number, 1);
    }

    #[test]
    fn test_elapsed_clamped_to_be_non_decreasing() {
        let mut recorder = SampleRecorder::new(3);
        recorder.record(Bytes::from_static(b"a"), 0.5);
        recorder.record(Bytes::from_static(b"b"), 0.4);
        recorder.record(Bytes::from_static(b"c"), 0.6);

        let elapsed: Vec<f64> = recorder
            .into_samples()
            .iter()
            .map(|s| s.elapsed_seconds)
            .collect();
        assert_eq!(elapsed, vec![0.5, 0.5, 0.6]);
    }

    #[test]
    fn test_zero_retention_still_counts() {
        let mut recorder = SampleRecorder::new(0);
        recorder.record(Bytes::from_static(b"abc"), 0.1);
        assert_eq!(recorder.sample_count(), 1);
        assert_eq!(recorder.total_bytes(), 3);
        assert!(recorder.into_samples().is_empty());
    }
}
