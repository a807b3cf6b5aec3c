//! 时间工具函数: 业务时区转换
//!
//! 所有日期→时间戳转换统一在此完成，
//! repository 层只接收 `i64` Unix millis 或 `YYYY-MM-DD` 字符串。

use chrono::NaiveDate;
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// 日期 + 时分秒 → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn date_hms_to_millis(date: NaiveDate, hour: u32, min: u32, sec: u32, tz: Tz) -> i64 {
    let naive = date.and_hms_opt(hour, min, sec).unwrap();
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Berlin;

    #[test]
    fn parse_date_accepts_iso() {
        assert_eq!(
            parse_date("2026-03-15").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
        );
        assert!(parse_date("15/03/2026").is_err());
        assert!(parse_date("2026-13-01").is_err());
    }

    #[test]
    fn date_hms_uses_business_timezone() {
        // 2026-01-10 09:00 Berlin is 08:00 UTC (winter, UTC+1)
        let d = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let ms = date_hms_to_millis(d, 9, 0, 0, Berlin);
        let utc = chrono::DateTime::from_timestamp_millis(ms).unwrap();
        assert_eq!(utc.format("%H:%M").to_string(), "08:00");
    }
}
