use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Telemetry sampling period.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
/// Number of samples in the moving average.
const WINDOW: usize = 5;

/// Throughput estimator: bytes received per window, averaged over the last
/// [`WINDOW`] windows.
#[derive(Debug)]
pub struct SpeedMeter {
    total: u64,
    last_bytes: u64,
    last_at: Instant,
    samples: VecDeque<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub bytes_per_sec: f64,
    pub seconds_remaining: f64,
}

impl SpeedMeter {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            last_bytes: 0,
            last_at: Instant::now(),
            samples: VecDeque::with_capacity(WINDOW),
        }
    }

    pub fn sample(&mut self, downloaded: u64) -> Sample {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_at);
        self.last_at = now;
        self.record(downloaded, elapsed)
    }

    fn record(&mut self, downloaded: u64, elapsed: Duration) -> Sample {
        let delta = downloaded.saturating_sub(self.last_bytes);
        self.last_bytes = downloaded;

        let secs = elapsed.as_secs_f64();
        let instant = if secs > 0.0 { delta as f64 / secs } else { 0.0 };
        if self.samples.len() == WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(instant);

        let bytes_per_sec = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        let remaining = self.total.saturating_sub(downloaded) as f64;
        let seconds_remaining = if bytes_per_sec > 0.0 {
            remaining / bytes_per_sec
        } else {
            0.0
        };

        Sample {
            bytes_per_sec,
            seconds_remaining,
        }
    }
}
