//! CLI command implementations.

pub mod events;
pub mod insight;
pub mod list;
pub mod show;

/// Formats a millisecond duration as `1h 02m`, `4m 05s`, or `12s`.
pub(crate) fn format_duration(ms: i64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}
