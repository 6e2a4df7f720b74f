use jarinject_format::DosDateTime;

/// Format file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    use humansize::{FormatSize, BINARY};
    bytes.format_size(BINARY)
}

/// Format a DOS timestamp, or `-` when it does not decode to a real date
pub fn format_time(time: DosDateTime) -> String {
    time.to_datetime()
        .map(|x| x.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".into())
}

pub fn ratio(compressed: u64, size: u64) -> f64 {
    if size == 0 {
        0.0
    } else {
        100.0 - (compressed as f64 / size as f64 * 100.0)
    }
}
