//! Numeric extraction from free-text estimation properties.

use regex::Regex;

/// Extract the first numeric token ("Est: 3.5h, 2h" -> 3.5). Absent,
/// placeholder or unparseable text yields 0.0 so a single malformed page
/// never poisons the aggregate.
pub fn extract_estimation_value(estimation: &str) -> f64 {
    if estimation.is_empty() || estimation == "N/A" {
        return 0.0;
    }
    let pattern = Regex::new(r"\d+(\.\d+)?").unwrap();
    match pattern.find(estimation) {
        Some(m) => m.as_str().parse().unwrap_or(0.0),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_only_the_first_numeric_match() {
        assert_eq!(extract_estimation_value("Est: 3.5h, 2h"), 3.5);
        assert_eq!(extract_estimation_value("8h"), 8.0);
        assert_eq!(extract_estimation_value("roughly 2 days"), 2.0);
    }

    #[test]
    fn defaults_to_zero_when_absent_or_unparseable() {
        assert_eq!(extract_estimation_value(""), 0.0);
        assert_eq!(extract_estimation_value("N/A"), 0.0);
        assert_eq!(extract_estimation_value("unknown"), 0.0);
    }
}
