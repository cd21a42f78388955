// Human-scaled byte and rate formatting (base 1024)

use serde::Serialize;

const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// A value scaled to the largest unit it reaches, rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scaled {
    pub value: f64,
    pub unit: String,
}

impl Scaled {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

impl std::fmt::Display for Scaled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

fn scale_f64(amount: f64) -> (f64, &'static str) {
    if !amount.is_finite() || amount <= 0.0 {
        return (0.0, UNITS[0]);
    }
    let mut value = amount;
    let mut idx = 0;
    while value >= 1024.0 && idx < UNITS.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }
    let mut rounded = (value * 100.0).round() / 100.0;
    // 1023.999 KB rounds up to 1024 KB, which belongs to the next unit.
    if rounded >= 1024.0 && idx < UNITS.len() - 1 {
        rounded = (rounded / 1024.0 * 100.0).round() / 100.0;
        idx += 1;
    }
    (rounded, UNITS[idx])
}

/// `scale(1536) == 1.5 KB`; `scale(0) == 0 B`.
pub fn scale(bytes: u64) -> Scaled {
    let (value, unit) = scale_f64(bytes as f64);
    Scaled::new(value, unit)
}

/// Like `scale`, with a "/s" suffix. Negative or non-finite rates format as `0 B/s`.
pub fn scale_rate(bytes_per_second: f64) -> Scaled {
    let (value, unit) = scale_f64(bytes_per_second);
    Scaled::new(value, format!("{}/s", unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_at_petabytes() {
        let s = scale(u64::MAX);
        assert_eq!(s.unit, "PB");
        assert!(s.value > 1024.0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(scale(1234), Scaled::new(1.21, "KB"));
    }

    #[test]
    fn rounding_up_to_a_unit_boundary_moves_to_next_unit() {
        assert_eq!(scale(1_048_575), Scaled::new(1.0, "MB"));
        assert_eq!(scale_rate(1_073_741_823.0), Scaled::new(1.0, "GB/s"));
        assert_eq!(scale(1023), Scaled::new(1023.0, "B"));
    }

    #[test]
    fn bad_rates_are_zero() {
        assert_eq!(scale_rate(-5.0), Scaled::new(0.0, "B/s"));
        assert_eq!(scale_rate(f64::NAN), Scaled::new(0.0, "B/s"));
    }

    #[test]
    fn display_joins_value_and_unit() {
        assert_eq!(scale_rate(2048.0).to_string(), "2 KB/s");
    }
}
