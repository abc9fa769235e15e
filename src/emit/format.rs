//! Formatting helpers shared by the emitters

const BYTE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Human-readable size using base-1024 units, rounded to 2 decimals
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, BYTE_UNITS[unit])
}

/// `1h 2m 3s` or `2m 3s`
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else {
        format!("{}m {}s", minutes, secs)
    }
}

/// Escape a value for use inside a single-quoted SQL literal
pub fn escape_sql(value: &str, escape_backslashes: bool) -> String {
    let escaped = value.replace('\'', "''");
    if escape_backslashes {
        escaped.replace('\\', "\\\\")
    } else {
        escaped
    }
}

/// Flatten a value so it can sit on a single `--` comment line
pub fn comment_safe(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
