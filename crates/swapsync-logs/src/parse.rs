//! Splitting raw batches into log records.

use swapsync_types::logs::{LogRecord, StructuredLog};

/// Parse one line. Lines that are not tracing JSON are kept verbatim.
pub fn parse_line(line: &str) -> LogRecord {
    let trimmed = line.trim_start();
    if trimmed.starts_with('{') {
        if let Ok(structured) = serde_json::from_str::<StructuredLog>(trimmed) {
            return LogRecord::Structured(structured);
        }
    }
    LogRecord::Raw(line.to_string())
}

/// Split a batch into records in arrival order.
///
/// Both `\n` and `\r\n` terminate a record; blank lines are skipped.
pub fn parse_batch(batch: &str) -> Vec<LogRecord> {
    batch
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .collect()
}
