//! Receipt field extraction.
//!
//! Turns raw OCR text into an [`ExtractedReceipt`]. All heuristics are
//! deterministic and never fail: every field has a documented fallback.

pub mod imaging;
pub mod patterns;

use crate::models::{DEFAULT_CATEGORY, ExtractedItem, ExtractedReceipt};
use patterns::RegexPatterns;

pub const UNKNOWN_MERCHANT: &str = "Unknown Merchant";
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// 已知商家关键字（小写子串）
const KNOWN_MERCHANTS: [&str; 4] = ["cold storage", "fairprice", "ntuc", "mcdonald"];

/// 商家名（小写、去空白）子串 -> 分类，按顺序匹配
const CATEGORY_RULES: [(&str, &[&str]); 5] = [
    (
        "Groceries",
        &["coldstorage", "fairprice", "ntuc", "giant", "shengsiong"],
    ),
    (
        "Fast Food",
        &[
            "mcdonald",
            "burgerking",
            "kfc",
            "subway",
            "wingstop",
            "wing",
            "jollibee",
        ],
    ),
    (
        "Cafes",
        &["starbucks", "coffeebean", "toastbox", "yakun", "cafe"],
    ),
    ("Retail", &["uniqlo", "zara", "hm", "cottonon"]),
    (
        "Healthcare",
        &["guardian", "watsons", "unity", "pharmacy"],
    ),
];

/// 名称包含这些词的行不是商品
const NON_ITEM_WORDS: [&str; 5] = ["total", "subtotal", "tax", "discount", "change"];

const MERCHANT_SCAN_LINES: usize = 5;
const TOTAL_SCAN_LINES: usize = 10;

pub fn extract_fields(text: &str) -> ExtractedReceipt {
    let merchant_name = extract_merchant_name(text);
    let category = determine_category(&merchant_name);
    let items = extract_items(text);

    ExtractedReceipt {
        full_text: text.to_string(),
        total_amount: extract_total_amount(text),
        date: extract_date(text),
        category,
        merchant_name,
        items: if items.is_empty() { None } else { Some(items) },
    }
}

pub fn extract_merchant_name(text: &str) -> String {
    let mut non_empty = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let head: Vec<&str> = non_empty.by_ref().take(MERCHANT_SCAN_LINES).collect();
    if let Some(line) = head.iter().find(|line| {
        let lower = line.to_lowercase();
        KNOWN_MERCHANTS.iter().any(|m| lower.contains(m))
    }) {
        return line.to_string();
    }

    head.first()
        .map(|l| l.to_string())
        .unwrap_or_else(|| UNKNOWN_MERCHANT.to_string())
}

pub fn extract_total_amount(text: &str) -> f64 {
    let patterns = RegexPatterns::get_instance();

    // 先看末尾几行里的 total 行
    let lines: Vec<&str> = text.lines().collect();
    for line in lines.iter().rev().take(TOTAL_SCAN_LINES) {
        let lower = line.to_lowercase();
        if !lower.contains("total") || lower.contains("subtotal") {
            continue;
        }
        if let Some(amount) = patterns
            .line_amount
            .captures(&lower)
            .and_then(|c| c[1].parse::<f64>().ok())
        {
            return amount;
        }
    }

    if let Some(amount) = patterns
        .labelled_total
        .captures(text)
        .and_then(|c| parse_amount(&c[2]))
    {
        return amount;
    }

    patterns
        .trailing_total
        .captures(text)
        .and_then(|c| parse_amount(&c[1]))
        .unwrap_or(0.0)
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse().ok()
}

pub fn extract_date(text: &str) -> String {
    let patterns = RegexPatterns::get_instance();

    if let Some(c) = patterns.labelled_date.captures(text) {
        return c[2].to_string();
    }
    if let Some(c) = patterns.short_date.captures(text) {
        return c[1].to_string();
    }
    if let Some(c) = patterns.iso_date.captures(text) {
        return c[1].to_string();
    }
    UNKNOWN_DATE.to_string()
}

pub fn determine_category(merchant_name: &str) -> String {
    let patterns = RegexPatterns::get_instance();
    let clean = patterns
        .whitespace
        .replace_all(&merchant_name.to_lowercase(), "")
        .into_owned();

    for (category, keywords) in CATEGORY_RULES.iter() {
        if keywords.iter().any(|k| clean.contains(k)) {
            return category.to_string();
        }
    }

    log::debug!("Merchant not categorized: {merchant_name} (cleaned: {clean})");
    DEFAULT_CATEGORY.to_string()
}

pub fn extract_items(text: &str) -> Vec<ExtractedItem> {
    let patterns = RegexPatterns::get_instance();
    let mut items = Vec::new();

    for line in text.lines() {
        if let Some(c) = patterns.item_with_quantity.captures(line) {
            let name = c[2].trim();
            if should_skip_item(name) {
                continue;
            }
            if let Ok(price) = c[3].parse::<f64>() {
                items.push(ExtractedItem {
                    name: name.to_string(),
                    price,
                    quantity: c[1].parse().unwrap_or(1),
                });
            }
            continue;
        }

        if let Some(c) = patterns.item.captures(line) {
            let name = c[1].trim();
            if should_skip_item(name) {
                continue;
            }
            if let Ok(price) = c[2].parse::<f64>() {
                items.push(ExtractedItem {
                    name: name.to_string(),
                    price,
                    quantity: 1,
                });
            }
        }
    }

    items
}

fn should_skip_item(name: &str) -> bool {
    let lower = name.to_lowercase();
    NON_ITEM_WORDS.iter().any(|w| lower.contains(w)) || name.chars().count() < 2
}
