use once_cell::sync::Lazy;
use regex::Regex;

// Base-10 only: no '+', no whitespace, no radix prefixes.
static INT_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+$").expect("valid int regex"));

// Plain decimal notation; rejects "inf", "NaN" and friends that f64::from_str takes.
static FLOAT_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?$").expect("valid float regex")
});

/// `None` for anything that isn't a base-10 integer fitting `i64`.
pub fn parse_int(s: &str) -> Option<i64> {
    if !INT_RX.is_match(s) { return None; }
    s.parse::<i64>().ok()
}

pub fn parse_float(s: &str) -> Option<f64> {
    if !FLOAT_RX.is_match(s) { return None; }
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints() {
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("-17"), Some(-17));
        assert_eq!(parse_int("+17"), None);
        assert_eq!(parse_int("1_000"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_int("9223372036854775808"), None);
    }

    #[test]
    fn floats() {
        assert_eq!(parse_float("3.14"), Some(3.14));
        assert_eq!(parse_float("-.5"), Some(-0.5));
        assert_eq!(parse_float("7."), Some(7.0));
        assert_eq!(parse_float("2E-2"), Some(0.02));
        assert_eq!(parse_float("inf"), None);
        assert_eq!(parse_float("1e999"), None);
        assert_eq!(parse_float("."), None);
    }
}
