//! Counters for the middlebox loop and the rule installer.
//!
//! All counters are atomics so one registry can be shared behind an `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    // Middlebox
    /// Frames read from the capture socket.
    pub frames_received: Counter,
    /// Bytes read from the capture socket.
    pub bytes_received: Counter,
    /// Frames that were not UDP to the listening port, or malformed.
    pub frames_ignored: Counter,
    /// Frames rewritten and retransmitted.
    pub frames_forwarded: Counter,
    /// Bytes retransmitted.
    pub bytes_forwarded: Counter,
    /// Frames dropped on a denylist match.
    pub frames_blocked: Counter,
    /// Frames dropped because the TTL was already zero.
    pub frames_expired: Counter,
    /// Failed retransmissions.
    pub tx_errors: Counter,

    // Steering
    /// Rules accepted by the switch control channel.
    pub rules_installed: Counter,
    /// Rules removed again after a failed transactional install.
    pub rules_rolled_back: Counter,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rx(&self, bytes: usize) {
        self.frames_received.inc();
        self.bytes_received.add(bytes as u64);
    }

    pub fn record_forward(&self, bytes: usize) {
        self.frames_forwarded.inc();
        self.bytes_forwarded.add(bytes as u64);
    }

    /// Exports all metrics as key-value pairs.
    pub fn export(&self) -> Vec<(String, u64)> {
        vec![
            ("frames_received".into(), self.frames_received.get()),
            ("bytes_received".into(), self.bytes_received.get()),
            ("frames_ignored".into(), self.frames_ignored.get()),
            ("frames_forwarded".into(), self.frames_forwarded.get()),
            ("bytes_forwarded".into(), self.bytes_forwarded.get()),
            ("frames_blocked".into(), self.frames_blocked.get()),
            ("frames_expired".into(), self.frames_expired.get()),
            ("tx_errors".into(), self.tx_errors.get()),
            ("rules_installed".into(), self.rules_installed.get()),
            ("rules_rolled_back".into(), self.rules_rolled_back.get()),
        ]
    }

    /// Logs every non-zero counter at info level.
    pub fn log_summary(&self) {
        for (name, value) in self.export() {
            if value > 0 {
                info!("{} = {}", name, value);
            }
        }
    }
}
