/// Render a second count as `m:ss`, the way the quiz clock shows it.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Whole-number percentage of `part` over `whole`, 0 when `whole` is 0.
pub fn percentage(part: u32, whole: u32) -> u32 {
    match whole {
        0 => 0,
        positive => ((part as f64 / positive as f64) * 100.0).round() as u32,
    }
}
