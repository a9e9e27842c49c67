use std::time::Duration;
use thiserror::Error;

/// Scaleway sizes volumes in decimal gigabytes.
pub const BYTES_PER_GB: u64 = 1_000_000_000;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum UnitConversionError {
    #[error("`{0}` is not a whole number of gigabytes.")]
    FractionalGigabytes(f64),
    #[error("`{0}` gigabytes is negative.")]
    NegativeSize(f64),
    #[error("`{0}` gigabytes overflows.")]
    SizeOverflow(f64),
    #[error("Invalid duration `{raw}`: {raw_error_message}.")]
    InvalidDuration { raw: String, raw_error_message: String },
}

/// convert a user facing size in gigabytes into bytes, rejecting fractions
/// examples:
/// 20 = 20_000_000_000
/// 20.5 = error
pub fn gb_to_bytes(gb: f64) -> Result<u64, UnitConversionError> {
    if gb.is_sign_negative() && gb != 0.0 {
        return Err(UnitConversionError::NegativeSize(gb));
    }
    if gb.fract() != 0.0 || !gb.is_finite() {
        return Err(UnitConversionError::FractionalGigabytes(gb));
    }

    (gb as u64)
        .checked_mul(BYTES_PER_GB)
        .ok_or(UnitConversionError::SizeOverflow(gb))
}

/// convert bytes as returned by the API into gigabytes, partial gigabytes are dropped
pub fn bytes_to_gb(bytes: u64) -> u64 {
    bytes / BYTES_PER_GB
}

/// parse a duration string such as `20m`, `1h30m` or `90s`
pub fn parse_duration(raw: &str) -> Result<Duration, UnitConversionError> {
    duration_str::parse(raw.trim()).map_err(|e| UnitConversionError::InvalidDuration {
        raw: raw.to_string(),
        raw_error_message: e.to_string(),
    })
}

/// render a duration with the shortest equivalent string
/// examples:
/// 3600s = 1h
/// 5400s = 90m
/// 7320s = 2h2m
pub fn render_duration(duration: Duration) -> String {
    if duration.subsec_nanos() != 0 {
        return format!("{}ms", duration.as_millis());
    }

    let total_seconds = duration.as_secs();
    if total_seconds == 0 {
        return "0s".to_string();
    }

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut decomposed = String::new();
    for (value, unit) in [(hours, "h"), (minutes, "m"), (seconds, "s")] {
        if value != 0 {
            decomposed.push_str(&format!("{value}{unit}"));
        }
    }

    let mut candidates = vec![decomposed, format!("{total_seconds}s")];
    if total_seconds % 60 == 0 {
        candidates.push(format!("{}m", total_seconds / 60));
    }

    // stable, so ties keep the decomposed form
    candidates.sort_by_key(|c| c.len());
    candidates.swap_remove(0)
}
