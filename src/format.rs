//! 时间展示格式化
//!
//! 相对时间按 月(30天) → 周 → 天 → 小时 → 分钟 的顺序取第一个非零单位，不足一分钟为 "Just now"。

use chrono::{DateTime, Utc};

fn plural(count: i64, unit: &str) -> String {
    if count > 1 {
        format!("{count} {unit}s ago")
    } else {
        format!("{count} {unit} ago")
    }
}

/// 相对时间，例如 "2 hours ago"。未来时间视为 "Just now"。
pub fn format_relative_time(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - date).num_seconds();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let weeks = days / 7;
    let months = days / 30;

    if months > 0 {
        plural(months, "month")
    } else if weeks > 0 {
        plural(weeks, "week")
    } else if days > 0 {
        plural(days, "day")
    } else if hours > 0 {
        plural(hours, "hour")
    } else if minutes > 0 {
        plural(minutes, "minute")
    } else {
        "Just now".to_string()
    }
}

/// 展示日期，例如 "Dec 5, 2025"。
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// 月份分组键，例如 "December 2025"。
pub fn month_key(date: DateTime<Utc>) -> String {
    date.format("%B %Y").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single().expect("valid date")
    }

    #[test]
    fn relative_time_picks_largest_unit() {
        let now = at(2025, 12, 31);
        assert_eq!(format_relative_time(now - Duration::seconds(30), now), "Just now");
        assert_eq!(format_relative_time(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(format_relative_time(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(format_relative_time(now - Duration::days(2), now), "2 days ago");
        assert_eq!(format_relative_time(now - Duration::days(14), now), "2 weeks ago");
        assert_eq!(format_relative_time(now - Duration::days(65), now), "2 months ago");
        assert_eq!(format_relative_time(now + Duration::hours(1), now), "Just now");
    }

    #[test]
    fn dates_use_short_and_long_month_names() {
        assert_eq!(format_date(at(2025, 12, 5)), "Dec 5, 2025");
        assert_eq!(month_key(at(2025, 12, 5)), "December 2025");
    }
}
