//! Transport counters.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::utils::sync::lock;

/// Point-in-time snapshot of a transport's counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceMetrics {
    /// Inbound events decoded and handed to the output channel.
    pub events_processed: u64,
    /// Connect failures, send failures and malformed inbound frames.
    pub errors: u64,
    /// `errors / (events_processed + throughput)`, zero before any traffic.
    pub error_rate: f64,
    /// Outbound event frames written to the socket.
    pub throughput: u64,
    /// Running mean of `now - record.timestamp` over inbound events.
    pub average_latency: Duration,
    /// Time since the current connection opened. Zero while not connected.
    pub connection_uptime: Duration,
    /// Serialized bytes currently waiting in the outbound queue.
    pub memory_usage: usize,
    /// Frames currently waiting in the outbound queue.
    pub queued: usize,
}

#[derive(Debug, Default)]
struct Counters {
    events_processed: u64,
    errors: u64,
    throughput: u64,
    latency_total_ms: u128,
    latency_samples: u64,
    connected_at: Option<Instant>,
    queued_bytes: usize,
    queued: usize,
}

/// Shared between the actor (writer) and every handle (reader).
#[derive(Debug, Default)]
pub(crate) struct MetricsRecorder {
    counters: Mutex<Counters>,
}

impl MetricsRecorder {
    pub fn record_inbound(&self, latency_ms: i64) {
        let mut counters = lock(&self.counters);
        counters.events_processed += 1;
        counters.latency_total_ms += latency_ms.max(0) as u128;
        counters.latency_samples += 1;
    }

    pub fn record_sent(&self) {
        lock(&self.counters).throughput += 1;
    }

    pub fn record_error(&self) {
        lock(&self.counters).errors += 1;
    }

    pub fn connection_opened(&self) {
        lock(&self.counters).connected_at = Some(Instant::now());
    }

    pub fn connection_closed(&self) {
        lock(&self.counters).connected_at = None;
    }

    pub fn set_queue(&self, queued: usize, queued_bytes: usize) {
        let mut counters = lock(&self.counters);
        counters.queued = queued;
        counters.queued_bytes = queued_bytes;
    }

    pub fn snapshot(&self) -> PerformanceMetrics {
        let counters = lock(&self.counters);
        let traffic = counters.events_processed + counters.throughput;
        let error_rate = if traffic == 0 {
            0.0
        } else {
            counters.errors as f64 / traffic as f64
        };
        let average_latency = match counters.latency_samples {
            0 => Duration::ZERO,
            n => {
                let mean = counters.latency_total_ms / u128::from(n);
                Duration::from_millis(mean.min(u64::MAX as u128) as u64)
            }
        };
        PerformanceMetrics {
            events_processed: counters.events_processed,
            errors: counters.errors,
            error_rate,
            throughput: counters.throughput,
            average_latency,
            connection_uptime: counters
                .connected_at
                .map(|at| at.elapsed())
                .unwrap_or_default(),
            memory_usage: counters.queued_bytes,
            queued: counters.queued,
        }
    }
}
