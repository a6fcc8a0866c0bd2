const UNITS: [&str; 2] = ["kb", "MB"];

/// Human-readable size: `"N bytes"`, `"X kb"` or `"X MB"`.
///
/// Uses binary (1024) steps and picks the largest unit the count strictly
/// exceeds. The value is rounded to two decimals with trailing zeros dropped,
/// so 1536 bytes reads `"1.5 kb"`.
pub fn format_size(bytes: u64) -> String {
    for power in (1..=UNITS.len()).rev() {
        let scale = 1024u64.pow(power as u32);
        if bytes > scale {
            let value = bytes as f64 / scale as f64;
            return format!("{} {}", trim_decimals(value), UNITS[power - 1]);
        }
    }
    format!("{bytes} bytes")
}

fn trim_decimals(value: f64) -> String {
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}
