use chrono::{DateTime, SecondsFormat, Utc};

/// Текущее время в UTC.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// RFC3339 с точностью до наносекунд и суффиксом `Z`.
///
/// Хвостовые нули дробной части отбрасываются, целая секунда
/// печатается без точки: `...05.12Z`, `...05Z`, `...05.123456789Z`.
pub fn format_rfc3339_nanos(ts: &DateTime<Utc>) -> String {
    let full = ts.to_rfc3339_opts(SecondsFormat::Nanos, true);
    let Some((head, frac)) = full.rsplit_once('.') else {
        return full;
    };
    let digits = frac.trim_end_matches('Z').trim_end_matches('0');
    if digits.is_empty() {
        format!("{head}Z")
    } else {
        format!("{head}.{digits}Z")
    }
}
