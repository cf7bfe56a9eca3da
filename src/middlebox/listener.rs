//! Capture loop of the middlebox

use super::{MiddleboxFilter, Verdict};
use crate::capture::Capture;
use crate::telemetry::MetricsRegistry;
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Receive buffer size; larger frames are truncated by the socket
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Runs the filter over every frame from one capture socket.
pub struct MiddleboxListener<C> {
    capture: C,
    filter: MiddleboxFilter,
    metrics: Arc<MetricsRegistry>,
}

impl<C: Capture> MiddleboxListener<C> {
    pub fn new(capture: C, filter: MiddleboxFilter) -> Self {
        Self {
            capture,
            filter,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn into_capture(self) -> C {
        self.capture
    }

    /// Processes frames one at a time until `cancel` fires.
    ///
    /// Cancellation is checked before every receive. Receive and transmit
    /// errors are logged and the loop carries on.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        info!("Listening on middlebox port {}", self.filter.port());
        info!("Blocked keywords: {:?}", self.filter.denylist().keywords());

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = self.capture.recv(&mut buf) => received,
            };

            let rx = match received {
                Ok(rx) => rx,
                Err(e) => {
                    error!("Receive error: {}", e);
                    continue;
                }
            };

            // Our own retransmissions are looped back to the socket
            if rx.outgoing {
                continue;
            }

            self.metrics.record_rx(rx.len);
            let frame = &buf[..rx.len.min(buf.len())];

            match self.filter.process(frame) {
                Verdict::Ignore => self.metrics.frames_ignored.inc(),
                Verdict::Block { keyword } => {
                    info!("Blocked packet containing keyword '{}'", keyword);
                    self.metrics.frames_blocked.inc();
                }
                Verdict::Expired => {
                    debug!("Dropped packet with TTL 0");
                    self.metrics.frames_expired.inc();
                }
                Verdict::Forward(out) => match self.capture.send(&out).await {
                    Ok(_) => {
                        debug!("Forwarded {} bytes", out.len());
                        self.metrics.record_forward(out.len());
                    }
                    Err(e) => {
                        warn!("Failed to forward packet: {}", e);
                        self.metrics.tx_errors.inc();
                    }
                },
            }
        }

        info!("Shutting down middlebox");
        self.metrics.log_summary();
        Ok(())
    }
}
