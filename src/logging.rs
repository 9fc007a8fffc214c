use chrono::Local;
use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// Layout of the local timestamp prefixed to every line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tracing event formatter producing `[YYYY-MM-DD HH:MM:SS] LEVEL message` lines.
///
/// The whole line is colored by severity when the output is a terminal;
/// `colored` drops the escape codes on its own otherwise.
pub struct TimestampedFormatter;

impl<S, N> FormatEvent<S, N> for TimestampedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut buffer = String::new();
        let mut buf_writer = Writer::new(&mut buffer);
        ctx.format_fields(buf_writer.by_ref(), event)?;

        let level = *event.metadata().level();
        let line = format_line(&Local::now().format(TIMESTAMP_FORMAT).to_string(), level, &buffer);

        let colored_output = match level {
            Level::INFO => line.white(),
            Level::WARN => line.yellow(),
            Level::ERROR => line.red(),
            Level::DEBUG => line.blue(),
            Level::TRACE => line.purple(),
        };

        writeln!(writer, "{}", colored_output)
    }
}

fn format_line(timestamp: &str, level: Level, message: &str) -> String {
    format!("[{}] {:<5} {}", timestamp, level.to_string(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_layout() {
        let line = format_line("2024-05-01 12:30:00", Level::INFO, "Sent rate = 10/sec");
        assert_eq!(line, "[2024-05-01 12:30:00] INFO  Sent rate = 10/sec");

        let line = format_line("2024-05-01 12:30:00", Level::ERROR, "boom");
        assert_eq!(line, "[2024-05-01 12:30:00] ERROR boom");
    }

    #[test]
    fn test_timestamp_format_width() {
        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        assert_eq!(stamp.len(), "YYYY-MM-DD HH:MM:SS".len());
    }
}
