//! # Utility Functions
//!
//! Helpers shared by the load driver and the report:
//!
//! - **Formatting**: human-readable durations, byte sizes and message rates
//! - **Payload generation**: random alphanumeric message values
//!
//! ## Usage Examples
//!
//! ```rust
//! use kafka_producer_bench::utils::*;
//! use std::time::Duration;
//!
//! // Wall-clock time of a run, as printed in the final report
//! assert_eq!(format_elapsed(Duration::from_millis(83_456)), "00:01:23.456");
//!
//! // Throughput
//! assert_eq!(format_message_rate(15500.0), "15.50K msg/s");
//! ```

use rand::Rng;
use std::time::Duration;

/// Characters message values are drawn from
pub const VALUE_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Format an elapsed wall-clock time as `HH:MM:SS.mmm`
///
/// Hours are not wrapped: a run of 30 hours prints as `30:00:00.000`.
///
/// ## Examples
///
/// ```rust
/// # use kafka_producer_bench::utils::format_elapsed;
/// # use std::time::Duration;
/// assert_eq!(format_elapsed(Duration::ZERO), "00:00:00.000");
/// assert_eq!(format_elapsed(Duration::from_millis(3_723_004)), "01:02:03.004");
/// ```
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = elapsed.subsec_millis();
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Format a duration in a human-readable way
///
/// Picks the unit that keeps the value readable:
///
/// - Microseconds: < 1ms (e.g., "750.00μs")
/// - Milliseconds: < 1s (e.g., "2.50ms")
/// - Seconds: ≥ 1s (e.g., "1.25s")
///
/// ```rust
/// # use kafka_producer_bench::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ns = duration.as_nanos();

    if total_ns < 1_000_000 {
        format!("{:.2}μs", total_ns as f64 / 1_000.0)
    } else if total_ns < 1_000_000_000 {
        format!("{:.2}ms", total_ns as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", total_ns as f64 / 1_000_000_000.0)
    }
}

/// Format bytes in a human-readable way, using binary (1024-based) scaling
///
/// ```rust
/// # use kafka_producer_bench::utils::format_bytes;
/// assert_eq!(format_bytes(200), "200 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: usize) -> String {
    let bytes = bytes as f64;
    if bytes < 1024.0 {
        format!("{:.0} B", bytes)
    } else if bytes < 1024.0 * 1024.0 {
        format!("{:.2} KB", bytes / 1024.0)
    } else if bytes < 1024.0 * 1024.0 * 1024.0 {
        format!("{:.2} MB", bytes / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a message rate with decimal scaling
///
/// - Messages/sec: < 1,000 (e.g., "750 msg/s")
/// - Thousands: < 1,000,000 (e.g., "15.50K msg/s")
/// - Millions: ≥ 1,000,000 (e.g., "2.30M msg/s")
pub fn format_message_rate(messages_per_second: f64) -> String {
    if messages_per_second < 1000.0 {
        format!("{:.0} msg/s", messages_per_second)
    } else if messages_per_second < 1_000_000.0 {
        format!("{:.2}K msg/s", messages_per_second / 1000.0)
    } else {
        format!("{:.2}M msg/s", messages_per_second / 1_000_000.0)
    }
}

/// Generate a random string of `len` characters drawn from [`VALUE_CHARSET`]
pub fn random_alphanumeric<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| VALUE_CHARSET[rng.gen_range(0..VALUE_CHARSET.len())] as char)
        .collect()
}
