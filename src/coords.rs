//! Sexagesimal formatting of sky positions.

/// Format a right ascension \[degrees\] as `hh:mm:ss.ssss`.
pub fn ra_to_hms(ra_deg: f64) -> String {
    let hours = ra_deg.rem_euclid(360.0) / 15.0;
    let (h, m, s) = split_sexagesimal(hours);
    // 24h wraps to 0h.
    format!("{:02}:{m:02}:{s:07.4}", h % 24)
}

/// Format a declination \[degrees\] as `±dd:mm:ss.ssss`.
pub fn dec_to_dms(dec_deg: f64) -> String {
    let sign = if dec_deg < 0.0 { '-' } else { '+' };
    let (d, m, s) = split_sexagesimal(dec_deg.abs());
    format!("{sign}{d:02}:{m:02}:{s:07.4}")
}

/// Split a non-negative value into whole units, minutes and seconds, rounding
/// seconds to 4 decimal places first so that e.g. 59.99999 s carries over.
fn split_sexagesimal(value: f64) -> (u32, u32, f64) {
    let ten_thousandths = (value * 3600.0 * 1e4).round() as u64;
    let whole_seconds = ten_thousandths / 10_000;
    let frac = (ten_thousandths % 10_000) as f64 / 1e4;
    let units = (whole_seconds / 3600) as u32;
    let minutes = ((whole_seconds / 60) % 60) as u32;
    let seconds = (whole_seconds % 60) as f64 + frac;
    (units, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_ascension() {
        assert_eq!(ra_to_hms(0.0), "00:00:00.0000");
        assert_eq!(ra_to_hms(83.63308), "05:34:31.9392");
        assert_eq!(ra_to_hms(359.9999999999), "00:00:00.0000");
        assert_eq!(ra_to_hms(-15.0), "23:00:00.0000");
        assert_eq!(ra_to_hms(187.5), "12:30:00.0000");
    }

    #[test]
    fn declination() {
        assert_eq!(dec_to_dms(22.0145), "+22:00:52.2000");
        assert_eq!(dec_to_dms(-30.5), "-30:30:00.0000");
        assert_eq!(dec_to_dms(-0.25), "-00:15:00.0000");
        assert_eq!(dec_to_dms(89.99999999999), "+90:00:00.0000");
    }
}
