// src/format.rs

/// Formats a dollar amount with a magnitude suffix: `$1.25B`, `$8.2M`, `$48K`, `$950`.
pub fn format_compact_usd(value: f64) -> String {
    if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.1}M", value / 1e6)
    } else if value >= 1e3 {
        format!("${:.0}K", value / 1e3)
    } else {
        format!("${:.0}", value)
    }
}

/// Renders a 0-1 fraction as a whole percentage, e.g. `0.874` as `"87%"`.
pub fn format_percent(fraction: f64) -> String {
    format!("{}%", (fraction * 100.0).round() as i64)
}
