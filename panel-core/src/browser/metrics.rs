use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlMetrics {
    pub pages_resolved: u64,
    pub pages_degraded: u64,
    pub resolve_attempts: u64,
    pub resolve_failures: u64,
    pub reloads: u64,
    pub tabs_opened: u64,
    pub pacing_wait_ms: u64,
}

impl CrawlMetrics {
    pub fn record_attempt(&mut self) {
        self.resolve_attempts = self.resolve_attempts.saturating_add(1);
    }

    pub fn record_failure(&mut self) {
        self.resolve_failures = self.resolve_failures.saturating_add(1);
    }

    pub fn record_reload(&mut self) {
        self.reloads = self.reloads.saturating_add(1);
    }

    pub fn record_resolved(&mut self) {
        self.pages_resolved = self.pages_resolved.saturating_add(1);
    }

    pub fn record_degraded(&mut self) {
        self.pages_degraded = self.pages_degraded.saturating_add(1);
    }

    pub fn record_wait(&mut self, millis: u64) {
        self.pacing_wait_ms = self.pacing_wait_ms.saturating_add(millis);
    }

    pub fn resolution_rate(&self) -> f64 {
        let pages = self.pages_resolved + self.pages_degraded;
        if pages == 0 {
            0.0
        } else {
            (self.pages_resolved as f64 / pages as f64) * 100.0
        }
    }
}
