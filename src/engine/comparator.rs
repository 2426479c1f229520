//! Threshold comparison on string-encoded numbers
//!
//! Thresholds are floors: a value breaches when `threshold <= value`.

/// Outcome of comparing a value against a threshold
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Exceeded,
    NotExceeded,
    /// One side did not parse; never escalates
    Undetermined(ParseError),
}

impl Comparison {
    pub fn is_exceeded(&self) -> bool {
        matches!(self, Comparison::Exceeded)
    }
}

/// Numeric parse errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Value '{0}' is not a number")]
    Value(String),

    #[error("Threshold '{0}' is not a number")]
    Threshold(String),
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Compare `value` against `threshold`
pub fn compare(value: &str, threshold: &str) -> Comparison {
    let current = match parse_number(value) {
        Some(v) => v,
        None => return Comparison::Undetermined(ParseError::Value(value.to_string())),
    };
    let floor = match parse_number(threshold) {
        Some(t) => t,
        None => return Comparison::Undetermined(ParseError::Threshold(threshold.to_string())),
    };

    if floor <= current {
        Comparison::Exceeded
    } else {
        Comparison::NotExceeded
    }
}

/// Whether `value` reached `threshold`; unparseable input is logged and
/// counts as not exceeded
pub fn exceeds(value: &str, threshold: &str) -> bool {
    match compare(value, threshold) {
        Comparison::Exceeded => true,
        Comparison::NotExceeded => false,
        Comparison::Undetermined(e) => {
            tracing::warn!(error = %e, "Skipping threshold comparison");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        assert!(exceeds("85", "80"));
        assert!(exceeds("80", "80"));
        assert!(exceeds("80.0", "80"));
        assert!(!exceeds("79.99", "80"));
    }

    #[test]
    fn test_negative_and_exponent() {
        assert!(exceeds("-1", "-2"));
        assert!(!exceeds("-3", "-2"));
        assert!(exceeds("1e3", "999"));
        assert!(exceeds(" 12 ", "10"));
    }

    #[test]
    fn test_unparseable_is_not_exceeded() {
        assert!(!exceeds("", "80"));
        assert!(!exceeds("85", "eighty"));
        assert!(!exceeds("NaN", "0"));

        assert_eq!(
            compare("", "80"),
            Comparison::Undetermined(ParseError::Value(String::new()))
        );
        assert_eq!(
            compare("85", "eighty"),
            Comparison::Undetermined(ParseError::Threshold("eighty".to_string()))
        );
    }

    #[test]
    fn test_matches_float_ordering() {
        let samples = ["0", "1", "-1", "2.5", "100", "1e-3", "+Inf", "-Inf"];
        for v in samples {
            for t in samples {
                let expected = t.parse::<f64>().unwrap() <= v.parse::<f64>().unwrap();
                assert_eq!(exceeds(v, t), expected, "value {} threshold {}", v, t);
            }
        }
    }

    #[test]
    fn test_compare_outcomes() {
        assert!(compare("5", "1").is_exceeded());
        assert_eq!(compare("1", "5"), Comparison::NotExceeded);
        assert!(!compare("x", "5").is_exceeded());
    }
}
