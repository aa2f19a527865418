//! 时间格式化模块
//!
//! 所有函数都是纯函数：`*_at` 变体接收注入的 `now`，便于测试；
//! 不带后缀的版本使用当前时间。
//!
//! - `format_date`: ISO 时间戳 -> `"January 5, 2025, 14:30"`（UTC）
//! - `relative_time`: ISO 时间戳 -> `"due in 3 days"` / `"2 hours overdue"`
//! - `is_due_date_over`: 截止时间是否已过

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_DUE_DATE: &str = "No due date";
pub const INVALID_DATE: &str = "Invalid Date";

/// 解析 ISO-8601 / RFC 3339 时间
///
/// 接受带时区的完整时间、不带时区的本地格式（视为 UTC）以及纯日期。
/// 解析失败返回 None。
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// 是否为合法的 ISO-8601 时间
pub fn is_valid_iso(s: &str) -> bool {
    parse_instant(s).is_some()
}

fn present(iso: Option<&str>) -> Option<&str> {
    iso.map(str::trim).filter(|s| !s.is_empty())
}

/// 将时间戳格式化为长格式显示字符串
pub fn format_date(iso: Option<&str>) -> String {
    let Some(s) = present(iso) else {
        return NOT_AVAILABLE.to_string();
    };
    match parse_instant(s) {
        Some(dt) => dt.format("%B %-d, %Y, %H:%M").to_string(),
        None => INVALID_DATE.to_string(),
    }
}

/// 相对截止时间描述，使用当前时间
pub fn relative_time(iso: Option<&str>) -> String {
    relative_time_at(iso, Utc::now())
}

/// 相对截止时间描述
///
/// 每一级单位都四舍五入后再判断边界：
/// 不足 60 秒用秒，不足 60 分钟用分钟，不足 24 小时用小时，其余用天。
pub fn relative_time_at(iso: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(s) = present(iso) else {
        return NO_DUE_DATE.to_string();
    };
    let Some(due) = parse_instant(s) else {
        return INVALID_DATE.to_string();
    };

    let diff_ms = (due - now).num_milliseconds();
    let abs_ms = diff_ms.unsigned_abs() as f64;

    let seconds = (abs_ms / 1000.0).round();
    let minutes = (seconds / 60.0).round();
    let hours = (minutes / 60.0).round();
    let days = (hours / 24.0).round();

    let label = if seconds < 60.0 {
        format!("{} seconds", seconds as u64)
    } else if minutes < 60.0 {
        format!("{} minutes", minutes as u64)
    } else if hours < 24.0 {
        format!("{} hours", hours as u64)
    } else {
        format!("{} days", days as u64)
    };

    if diff_ms > 0 {
        format!("due in {}", label)
    } else {
        format!("{} overdue", label)
    }
}

/// 截止时间是否已过，使用当前时间
pub fn is_due_date_over(iso: Option<&str>) -> bool {
    is_due_date_over_at(iso, Utc::now())
}

/// 严格判断 `now > due`；空输入或无法解析时为 false
pub fn is_due_date_over_at(iso: Option<&str>, now: DateTime<Utc>) -> bool {
    present(iso)
        .and_then(parse_instant)
        .map(|due| now > due)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_inputs_use_placeholders() {
        for input in [None, Some(""), Some("   ")] {
            assert_eq!(format_date(input), "N/A");
            assert_eq!(relative_time_at(input, fixed_now()), "No due date");
            assert!(!is_due_date_over_at(input, fixed_now()));
        }
    }

    #[test]
    fn format_date_long_form() {
        assert_eq!(
            format_date(Some("2025-01-05T14:30:00Z")),
            "January 5, 2025, 14:30"
        );
        assert_eq!(
            format_date(Some("2025-01-05T14:30:00+02:00")),
            "January 5, 2025, 12:30"
        );
        assert_eq!(format_date(Some("2025-03-09")), "March 9, 2025, 00:00");
    }

    #[test]
    fn format_date_guards_garbage() {
        assert_eq!(format_date(Some("not a date")), "Invalid Date");
    }

    #[test]
    fn far_future_is_due_in_days() {
        let out = relative_time_at(Some("2099-01-01T00:00:00Z"), fixed_now());
        assert!(out.starts_with("due in "), "{out}");
        assert!(out.ends_with("days"), "{out}");
    }

    #[test]
    fn far_past_is_overdue() {
        let out = relative_time_at(Some("1999-01-01T00:00:00Z"), fixed_now());
        assert!(out.ends_with(" overdue"), "{out}");
        assert!(out.contains("days"), "{out}");
    }

    #[test]
    fn relative_time_buckets() {
        let now = fixed_now();
        assert_eq!(
            relative_time_at(Some("2024-06-01T12:00:30Z"), now),
            "due in 30 seconds"
        );
        assert_eq!(
            relative_time_at(Some("2024-06-01T12:10:00Z"), now),
            "due in 10 minutes"
        );
        assert_eq!(
            relative_time_at(Some("2024-06-01T09:00:00Z"), now),
            "3 hours overdue"
        );
        // 59.6 秒四舍五入到 60 秒，再进位为 1 分钟
        assert_eq!(
            relative_time_at(Some("2024-06-01T12:00:59.600Z"), now),
            "due in 1 minutes"
        );
        // 23.5 小时四舍五入到 24 小时，进入天
        assert_eq!(
            relative_time_at(Some("2024-06-02T11:30:00Z"), now),
            "due in 1 days"
        );
    }

    #[test]
    fn due_date_boundary_is_not_over() {
        let now = fixed_now();
        assert!(!is_due_date_over_at(Some("2024-06-01T12:00:00Z"), now));
        assert!(is_due_date_over_at(Some("2024-06-01T11:59:59Z"), now));
        assert!(!is_due_date_over_at(Some("2024-06-01T12:00:01Z"), now));
    }

    #[test]
    fn parse_accepts_naive_forms() {
        assert!(is_valid_iso("2024-06-01T12:00:00"));
        assert!(is_valid_iso("2024-06-01 12:00:00"));
        assert!(is_valid_iso("2024-06-01T12:00"));
        assert!(!is_valid_iso("06/01/2024"));
    }
}
