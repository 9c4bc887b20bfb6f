use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug)]
pub struct RegexPatterns {
    pub line_amount: Regex,
    pub labelled_total: Regex,
    pub trailing_total: Regex,
    pub labelled_date: Regex,
    pub short_date: Regex,
    pub iso_date: Regex,
    pub item_with_quantity: Regex,
    pub item: Regex,
    pub whitespace: Regex,
}

impl RegexPatterns {
    pub fn new() -> Self {
        Self {
            // $12.50
            line_amount: Regex::new(r"\$(\d+\.\d{2})").expect("line_amount"),
            // TOTAL: $12.50 / AMOUNT 12,50
            labelled_total: Regex::new(r"(?i)\b(TOTAL|AMOUNT|SUM|DUE)\s*:?\s*\$?\s*(\d+[.,]\d{2})")
                .expect("labelled_total"),
            // $12.50 TOTAL
            trailing_total: Regex::new(r"(?i)\$(\d+[.,]\d{2})\s*\b(TOTAL|AMOUNT|SUM|DUE)")
                .expect("trailing_total"),
            // DATE: 03/04/2024
            labelled_date: Regex::new(
                r"(?i)\b(date|date of purchase|txn date)\s*:?\s*(\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4})",
            )
            .expect("labelled_date"),
            short_date: Regex::new(r"(\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4})").expect("short_date"),
            iso_date: Regex::new(r"(\d{4}[/.-]\d{1,2}[/.-]\d{1,2})").expect("iso_date"),
            // 2 x Big Mac $11.90
            item_with_quantity: Regex::new(r"(\d+)\s+x\s+(.+?)\s+\$(\d+\.\d{2})")
                .expect("item_with_quantity"),
            // Big Mac $5.95
            item: Regex::new(r"(.+?)\s+\$(\d+\.\d{2})").expect("item"),
            whitespace: Regex::new(r"\s+").expect("whitespace"),
        }
    }

    pub fn get_instance() -> &'static Self {
        static INSTANCE: OnceLock<RegexPatterns> = OnceLock::new();
        INSTANCE.get_or_init(RegexPatterns::new)
    }
}

impl Default for RegexPatterns {
    fn default() -> Self {
        Self::new()
    }
}
