use crate::metrics::DeliverySummary;
use crate::stats::StatsCheckpoint;
use crate::utils::{format_duration, format_elapsed, format_message_rate};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Outcome of one benchmark run
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    /// Messages accepted by the client's local buffer
    pub messages_sent: u64,
    /// ProduceRequests issued, as of the last statistics report
    pub produce_requests: u64,
    /// Messages transmitted, as of the last statistics report
    pub broker_messages: u64,
    /// Wall-clock time from the first send to the end of the final flush
    pub elapsed: Duration,
    pub deliveries: DeliverySummary,
    /// True when the run was stopped before every message was sent
    pub aborted: bool,
}

impl BenchmarkReport {
    /// Assemble a report from the driver totals and the aggregator's last sample
    pub fn new(
        messages_sent: u64,
        last_sample: StatsCheckpoint,
        elapsed: Duration,
        deliveries: DeliverySummary,
        aborted: bool,
    ) -> Self {
        Self {
            messages_sent,
            produce_requests: counter(last_sample.last_request_count),
            broker_messages: counter(last_sample.last_total_messages),
            elapsed,
            deliveries,
            aborted,
        }
    }

    /// Messages accepted per second over the whole run
    pub fn average_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.messages_sent as f64 / secs
        } else {
            0.0
        }
    }
}

fn counter(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

fn latency(us: Option<u64>) -> String {
    match us {
        Some(us) => format_duration(Duration::from_micros(us)),
        None => "n/a".to_string(),
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "REPORT: Produced {} messages ({} acknowledged by client stats) with {} ProduceRequests in {}",
            self.messages_sent,
            self.broker_messages,
            self.produce_requests,
            format_elapsed(self.elapsed)
        )?;
        writeln!(
            f,
            "Deliveries: {} delivered, {} failed, latency p50 = {}, p99 = {}, max = {}",
            self.deliveries.delivered,
            self.deliveries.failed,
            latency(self.deliveries.p50_us),
            latency(self.deliveries.p99_us),
            latency(self.deliveries.max_us)
        )?;
        write!(f, "Average rate: {}", format_message_rate(self.average_rate()))?;
        if self.aborted {
            write!(f, " (run stopped early)")?;
        }
        Ok(())
    }
}
