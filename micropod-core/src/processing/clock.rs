/// Render seconds as `m:ss` (`0:07`, `2:00`). Negative or non-finite input
/// renders as `0:00`.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(7.0), "0:07");
        assert_eq!(format_clock(59.9), "0:59");
        assert_eq!(format_clock(120.0), "2:00");
        assert_eq!(format_clock(754.0), "12:34");
    }

    #[test]
    fn garbage_renders_as_zero() {
        assert_eq!(format_clock(-4.0), "0:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
        assert_eq!(format_clock(f64::INFINITY), "0:00");
    }
}
