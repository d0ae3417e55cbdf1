use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

/// Sleeps a uniformly sampled delay between page turns so the crawl does not
/// advance at a fixed cadence.
#[derive(Debug, Clone)]
pub struct PagePacer {
    range_ms: (u64, u64),
}

impl PagePacer {
    pub fn new(range_ms: [u64; 2]) -> Self {
        let lower = range_ms[0].min(range_ms[1]);
        let upper = range_ms[0].max(range_ms[1]);
        Self {
            range_ms: (lower, upper),
        }
    }

    pub fn range_ms(&self) -> (u64, u64) {
        self.range_ms
    }

    pub fn sample(&self) -> Duration {
        let (lower, upper) = self.range_ms;
        if upper == 0 {
            return Duration::ZERO;
        }
        let millis = rand::thread_rng().gen_range(lower..=upper);
        Duration::from_millis(millis)
    }

    /// Sleeps and returns the waited milliseconds.
    pub async fn wait(&self) -> u64 {
        let delay = self.sample();
        if !delay.is_zero() {
            sleep(delay).await;
        }
        delay.as_millis() as u64
    }
}
