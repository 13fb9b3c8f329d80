/// Per-frame millisecond latency histogram for a pipeline stage, used to
/// surface slow-frame warnings without retaining every sample.
///
/// Bins are 1 ms wide up to `NUM_MSEC_BINS`; anything longer lands in the
/// overflow bin. Modeled on the frame-acquisition timing tracker used
/// elsewhere in this codebase for per-camera latency reporting.
#[derive(Debug)]
pub struct LatencyHistogram {
    label: String,
    msec_bins: Vec<u32>,
    longest_frame: u64,
    longest_ms: f64,
    warn_threshold_ms: f64,
}

const NUM_MSEC_BINS: usize = 200;

impl LatencyHistogram {
    pub fn new(label: impl Into<String>, warn_threshold_ms: f64) -> Self {
        Self {
            label: label.into(),
            msec_bins: vec![0; NUM_MSEC_BINS],
            longest_frame: 0,
            longest_ms: 0.0,
            warn_threshold_ms,
        }
    }

    pub fn push_sample(&mut self, duration_ms: f64, frame_no: u64) {
        if duration_ms.is_nan() || duration_ms < 0.0 {
            return;
        }
        let bin = if duration_ms as usize >= NUM_MSEC_BINS {
            NUM_MSEC_BINS - 1
        } else {
            duration_ms as usize
        };
        self.msec_bins[bin] += 1;
        if duration_ms > self.longest_ms {
            self.longest_ms = duration_ms;
            self.longest_frame = frame_no;
        }
    }

    pub fn num_samples(&self) -> u32 {
        self.msec_bins.iter().sum()
    }

    /// Millisecond bin with the most samples (the typical-case latency).
    pub fn mode_ms(&self) -> Option<usize> {
        if self.num_samples() == 0 {
            return None;
        }
        self.msec_bins
            .iter()
            .enumerate()
            .max_by_key(|(_, count)| **count)
            .map(|(bin, _)| bin)
    }

    /// Logs a summary at `warn` if the mode exceeds the warn threshold,
    /// `debug` otherwise. No-ops on an empty histogram.
    pub fn log_summary(&self) {
        let Some(mode) = self.mode_ms() else {
            return;
        };
        let msg = format!(
            "{} latency: mode {} ms, longest {:.1} ms (frame {})",
            self.label, mode, self.longest_ms, self.longest_frame
        );
        if mode as f64 > self.warn_threshold_ms {
            tracing::warn!("{}", msg);
        } else {
            tracing::debug!("{}", msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_mode_and_longest() {
        let mut h = LatencyHistogram::new("detect", 30.0);
        h.push_sample(10.0, 1);
        h.push_sample(10.0, 2);
        h.push_sample(50.0, 3);
        assert_eq!(h.mode_ms(), Some(10));
        assert_eq!(h.longest_frame, 3);
        assert_eq!(h.num_samples(), 3);
    }

    #[test]
    fn ignores_negative_and_nan_samples() {
        let mut h = LatencyHistogram::new("detect", 30.0);
        h.push_sample(-5.0, 1);
        h.push_sample(f64::NAN, 2);
        assert_eq!(h.num_samples(), 0);
    }

    #[test]
    fn overflow_samples_land_in_last_bin() {
        let mut h = LatencyHistogram::new("detect", 30.0);
        h.push_sample(10_000.0, 1);
        assert_eq!(h.mode_ms(), Some(NUM_MSEC_BINS - 1));
    }
}
