use lazy_static::lazy_static;
use regex::Regex;

pub const NO_DATE_FOUND: &str = "No valid expiry date found.";

lazy_static! {
    // D/M/Y with 1-2 digit day and month, or Y-M-D with a four digit year.
    static ref DATE_PATTERN: Regex =
        Regex::new(r"\b(?:\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}|\d{4}[/\-]\d{1,2}[/\-]\d{1,2})\b")
            .unwrap();
}

/// First date-shaped substring in `text`, or [`NO_DATE_FOUND`].
pub fn extract_date(text: &str) -> String {
    DATE_PATTERN
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NO_DATE_FOUND.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_day_first_date() {
        assert_eq!(extract_date("Exp: 12/08/2025"), "12/08/2025");
    }

    #[test]
    fn finds_year_first_date() {
        assert_eq!(extract_date("BEST BEFORE\n2025-3-14\nLOT 42"), "2025-3-14");
    }

    #[test]
    fn returns_first_of_several() {
        assert_eq!(
            extract_date("PKD 01-02-24 USE BY 1/3/24"),
            "01-02-24"
        );
    }

    #[test]
    fn mixed_separators_match() {
        assert_eq!(extract_date("exp 5-11/2026"), "5-11/2026");
    }

    #[test]
    fn no_date_gives_sentinel() {
        assert_eq!(extract_date("NET WT 500g BATCH 2291"), NO_DATE_FOUND);
        assert_eq!(extract_date(""), NO_DATE_FOUND);
    }

    #[test]
    fn digits_glued_to_words_do_not_match() {
        assert_eq!(extract_date("SKU123/45/6789X"), NO_DATE_FOUND);
    }
}
