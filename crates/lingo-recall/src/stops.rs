//! Interval stops.
//!
//! A stop code is a positive integer followed by a unit suffix:
//!
//! | Suffix | Unit |
//! |--------|------|
//! | `m` | minutes |
//! | `h` | hours |
//! | `D` | days |
//! | `W` | weeks (7 days) |
//! | `M` | months (30 days) |

use crate::error::StopCodeError;
use chrono::Duration;

/// Stops used when none are configured.
pub const DEFAULT_STOP_CODES: [&str; 6] = ["10m", "1h", "1D", "1W", "1M", "4M"];

/// Days counted for one `M`.
pub const DAYS_PER_MONTH: i64 = 30;

/// Parse a stop code into a duration.
pub fn parse_stop_code(code: &str) -> Result<Duration, StopCodeError> {
    let code = code.trim();
    let unit = code.chars().last().ok_or(StopCodeError::EmptyCode)?;
    let digits = &code[..code.len() - unit.len_utf8()];

    let amount: i64 = digits
        .parse()
        .map_err(|_| StopCodeError::InvalidAmount(code.to_string()))?;
    if amount <= 0 {
        return Err(StopCodeError::InvalidAmount(code.to_string()));
    }

    let duration = match unit {
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'D' => Duration::try_days(amount),
        'W' => Duration::try_weeks(amount),
        'M' => amount.checked_mul(DAYS_PER_MONTH).and_then(Duration::try_days),
        other => {
            return Err(StopCodeError::UnknownUnit {
                code: code.to_string(),
                unit: other,
            })
        }
    };

    duration.ok_or_else(|| StopCodeError::OutOfRange(code.to_string()))
}

/// An ordered, validated list of stops. Stop numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopList {
    codes: Vec<String>,
    durations: Vec<Duration>,
}

impl StopList {
    pub fn new<I, S>(codes: I) -> Result<Self, StopCodeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        if codes.is_empty() {
            return Err(StopCodeError::EmptyList);
        }
        let durations = codes
            .iter()
            .map(|c| parse_stop_code(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { codes, durations })
    }

    /// Number of stops. Never zero.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Clamp a stop number into `1..=len`.
    pub fn clamp(&self, stop: usize) -> usize {
        stop.clamp(1, self.len())
    }

    /// Interval for `stop`, falling back to the first or last stop when out of range.
    pub fn duration_for(&self, stop: usize) -> Duration {
        self.durations[self.clamp(stop) - 1]
    }

    /// Code for `stop`, with the same fallback as [`StopList::duration_for`].
    pub fn code_for(&self, stop: usize) -> &str {
        &self.codes[self.clamp(stop) - 1]
    }
}

impl Default for StopList {
    fn default() -> Self {
        let codes: Vec<String> = DEFAULT_STOP_CODES.iter().map(|c| c.to_string()).collect();
        let durations = vec![
            Duration::minutes(10),
            Duration::hours(1),
            Duration::days(1),
            Duration::weeks(1),
            Duration::days(DAYS_PER_MONTH),
            Duration::days(4 * DAYS_PER_MONTH),
        ];
        Self { codes, durations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_stop_code("10m").unwrap(), Duration::minutes(10));
        assert_eq!(parse_stop_code("1h").unwrap(), Duration::hours(1));
        assert_eq!(parse_stop_code("3D").unwrap(), Duration::days(3));
        assert_eq!(parse_stop_code("2W").unwrap(), Duration::days(14));
        assert_eq!(parse_stop_code("4M").unwrap(), Duration::days(120));
    }

    #[test]
    fn test_units_are_case_sensitive() {
        // Lowercase m is minutes, uppercase M is months
        assert_ne!(parse_stop_code("1m").unwrap(), parse_stop_code("1M").unwrap());
        assert!(matches!(
            parse_stop_code("1d"),
            Err(StopCodeError::UnknownUnit { unit: 'd', .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_codes() {
        assert_eq!(parse_stop_code(""), Err(StopCodeError::EmptyCode));
        assert!(matches!(parse_stop_code("h"), Err(StopCodeError::InvalidAmount(_))));
        assert!(matches!(parse_stop_code("0D"), Err(StopCodeError::InvalidAmount(_))));
        assert!(matches!(parse_stop_code("-1D"), Err(StopCodeError::InvalidAmount(_))));
        assert!(matches!(
            parse_stop_code("999999999999999999M"),
            Err(StopCodeError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_default_matches_codes() {
        let parsed = StopList::new(DEFAULT_STOP_CODES).unwrap();
        assert_eq!(parsed, StopList::default());
    }

    #[test]
    fn test_out_of_range_stops_fall_back() {
        let stops = StopList::new(["10m", "1h", "1D"]).unwrap();
        assert_eq!(stops.duration_for(0), Duration::minutes(10));
        assert_eq!(stops.duration_for(2), Duration::hours(1));
        assert_eq!(stops.duration_for(99), Duration::days(1));
        assert_eq!(stops.code_for(99), "1D");
    }

    #[test]
    fn test_empty_list_rejected() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(StopList::new(empty), Err(StopCodeError::EmptyList));
    }
}
