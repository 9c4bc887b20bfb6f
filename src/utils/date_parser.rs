use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{AppError, AppResult};

/// 按顺序尝试的纯日期格式（日在前优先）
const DATE_FORMATS: [&str; 7] = [
    "%d/%m/%Y", "%m/%d/%Y", "%Y-%m-%d", "%d-%m-%Y", "%m-%d-%Y", "%Y/%m/%d", "%d.%m.%Y",
];

/// 带时间的格式
const DATETIME_FORMATS: [&str; 5] = [
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.3fZ",
];

/// 只有日期时补为当天中午
fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// 解析购买日期，全部格式失败返回 None
pub fn parse_purchase_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            // 四位年份
            if date.year() >= 1000 {
                return Some(date.and_time(noon()).and_utc());
            }
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            if dt.year() >= 1000 {
                return Some(dt.and_utc());
            }
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// 无法解析时使用当前时间
pub fn parse_purchase_date_or_now(raw: Option<&str>) -> DateTime<Utc> {
    match raw.and_then(parse_purchase_date) {
        Some(dt) => dt,
        None => {
            if let Some(raw) = raw {
                log::warn!("Unparseable purchase date {raw:?}, using current time");
            }
            Utc::now()
        }
    }
}

/// YYYY-MM
pub fn month_key(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m").to_string()
}

pub fn current_month_key() -> String {
    month_key(&Utc::now())
}

pub fn is_valid_month_key(key: &str) -> bool {
    key.len() == 7 && NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d").is_ok()
}

/// 空值取当前月份；格式不合法返回 ValidationError
pub fn normalize_month_key(key: Option<&str>) -> AppResult<String> {
    match key.map(str::trim).filter(|k| !k.is_empty()) {
        None => Ok(current_month_key()),
        Some(k) if is_valid_month_key(k) => Ok(k.to_string()),
        Some(k) => Err(AppError::ValidationError(format!(
            "Invalid month '{k}', expected YYYY-MM"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_day_first_wins_for_ambiguous_dates() {
        let dt = parse_purchase_date("03/04/2024").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 4, 3));
        assert_eq!(dt.hour(), 12);
        assert_eq!(month_key(&dt), "2024-04");
    }

    #[test]
    fn test_month_first_when_day_first_is_impossible() {
        let dt = parse_purchase_date("12/25/2023").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2023, 12, 25));
    }

    #[test]
    fn test_other_date_only_formats() {
        for (raw, expected) in [
            ("2024-03-05", (2024, 3, 5)),
            ("05-03-2024", (2024, 3, 5)),
            ("2024/03/05", (2024, 3, 5)),
            ("05.03.2024", (2024, 3, 5)),
        ] {
            let dt = parse_purchase_date(raw).unwrap();
            assert_eq!((dt.year(), dt.month(), dt.day()), expected, "{raw}");
            assert_eq!(dt.hour(), 12, "{raw}");
        }
    }

    #[test]
    fn test_formats_with_time_keep_time() {
        let dt = parse_purchase_date("2024-03-05 08:15:30").unwrap();
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (8, 15, 30));

        let dt = parse_purchase_date("2024-03-05T08:15:30.250Z").unwrap();
        assert_eq!((dt.day(), dt.hour(), dt.minute()), (5, 8, 15));

        let dt = parse_purchase_date("2024-03-05T23:00:00+08:00").unwrap();
        assert_eq!((dt.day(), dt.hour()), (5, 15));
    }

    #[test]
    fn test_unparseable_falls_back_to_now() {
        assert!(parse_purchase_date("Unknown Date").is_none());
        assert!(parse_purchase_date("03/04/24").is_none());
        let before = Utc::now();
        let dt = parse_purchase_date_or_now(Some("garbage"));
        assert!(dt >= before);
        let dt = parse_purchase_date_or_now(None);
        assert!(dt >= before);
    }

    #[test]
    fn test_month_key_normalization() {
        assert_eq!(normalize_month_key(Some("2024-03")).unwrap(), "2024-03");
        assert_eq!(normalize_month_key(Some("")).unwrap(), current_month_key());
        assert_eq!(normalize_month_key(None).unwrap(), current_month_key());
        assert!(normalize_month_key(Some("2024-13")).is_err());
        assert!(normalize_month_key(Some("March")).is_err());
    }
}
