//! Row values and the parsing rules shared by all checks.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

/// One fetched row: field name -> value.
pub type Row = serde_json::Map<String, Value>;

/// Look up a field, treating JSON `null` the same as a missing key.
pub fn field<'a>(row: &'a Row, name: &str) -> Option<&'a Value> {
    match row.get(name) {
        Some(Value::Null) | None => None,
        Some(v) => Some(v),
    }
}

/// Null, missing, or a string that is empty after trimming.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Parse an integer from a JSON number or a numeric string.
///
/// Integral floats (`2021.0`) are accepted; fractional values are not.
pub fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            if let Some(u) = n.as_u64() {
                return i64::try_from(u).ok();
            }
            let f = n.as_f64()?;
            if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Some(f as i64)
            } else {
                None
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Parse a finite float from a JSON number or a numeric string.
pub fn parse_float(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
];

/// Parse a bare date or a date+time. Bare dates become midnight.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        return parse_compact(s);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }

    None
}

/// `YYYYMMDD` and `YYYYMMDDHHMMSS`.
fn parse_compact(s: &str) -> Option<NaiveDateTime> {
    let num = |range: std::ops::Range<usize>| s.get(range)?.parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(num(0..4)? as i32, num(4..6)?, num(6..8)?)?;
    match s.len() {
        8 => Some(date.and_time(NaiveTime::MIN)),
        14 => date.and_hms_opt(num(8..10)?, num(10..12)?, num(12..14)?),
        _ => None,
    }
}

/// Parse a row value as a date/time. Numbers are read as compact digits.
pub fn datetime_value(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_datetime(s),
        Value::Number(n) if n.is_u64() => parse_datetime(&n.to_string()),
        _ => None,
    }
}

/// Render a value as one component of a composite key.
///
/// Components keep their JSON form, so `"1"` and `1` are different keys.
/// Blank values yield `None` so the row can be excluded.
pub fn key_component(value: Option<&Value>) -> Option<String> {
    if is_blank(value) {
        return None;
    }
    value.map(Value::to_string)
}

/// Merge `over` into `base` key by key.
///
/// Objects merge recursively; any other value replaces the base value; an
/// explicit `null` removes the key.
pub fn merge_json(base: &mut serde_json::Map<String, Value>, over: &serde_json::Map<String, Value>) {
    for (key, value) in over {
        match value {
            Value::Null => {
                base.remove(key);
            }
            Value::Object(over_obj) => match base.get_mut(key) {
                Some(Value::Object(base_obj)) => merge_json(base_obj, over_obj),
                _ => {
                    let mut fresh = serde_json::Map::new();
                    merge_json(&mut fresh, over_obj);
                    base.insert(key.clone(), Value::Object(fresh));
                }
            },
            other => {
                base.insert(key.clone(), other.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank_values() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&Value::Null)));
        assert!(is_blank(Some(&json!(""))));
        assert!(is_blank(Some(&json!("   "))));
        assert!(!is_blank(Some(&json!("0"))));
        assert!(!is_blank(Some(&json!(0))));
        assert!(!is_blank(Some(&json!(false))));
    }

    #[test]
    fn test_key_component_keeps_json_type() {
        assert_eq!(key_component(Some(&json!("1"))), Some("\"1\"".to_string()));
        assert_eq!(key_component(Some(&json!(1))), Some("1".to_string()));
        assert_eq!(key_component(Some(&json!("  "))), None);
        assert_eq!(key_component(None), None);
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer(&json!("500")), Some(500));
        assert_eq!(parse_integer(&json!(" 42 ")), Some(42));
        assert_eq!(parse_integer(&json!(2021)), Some(2021));
        assert_eq!(parse_integer(&json!(2021.0)), Some(2021));
        assert_eq!(parse_integer(&json!(20.5)), None);
        assert_eq!(parse_integer(&json!("20.5")), None);
        assert_eq!(parse_integer(&json!("abc")), None);
        assert_eq!(parse_integer(&json!(true)), None);
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float(&json!("1.5")), Some(1.5));
        assert_eq!(parse_float(&json!(3)), Some(3.0));
        assert_eq!(parse_float(&json!("NaN")), None);
        assert_eq!(parse_float(&json!("inf")), None);
        assert_eq!(parse_float(&json!(null)), None);
    }

    #[test]
    fn test_parse_datetime_forms() {
        let midnight = NaiveDate::from_ymd_opt(2025, 9, 12)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("2025-09-12"), Some(midnight));
        assert_eq!(parse_datetime("2025/09/12"), Some(midnight));
        assert_eq!(parse_datetime("20250912"), Some(midnight));

        let evening = NaiveDate::from_ymd_opt(2025, 9, 12)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(parse_datetime("2025-09-12 23:59:59"), Some(evening));
        assert_eq!(parse_datetime("2025-09-12T23:59:59"), Some(evening));
        assert_eq!(parse_datetime("20250912235959"), Some(evening));
        assert_eq!(parse_datetime("2025-09-12T23:59:59+09:00"), Some(evening));
    }

    #[test]
    fn test_parse_datetime_rejects_invalid() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("2025-02-30"), None);
        assert_eq!(parse_datetime("yesterday"), None);
        assert_eq!(parse_datetime("2025091"), None);
    }

    #[test]
    fn test_merge_json_key_by_key() {
        let mut base = json!({
            "RANGE": {
                "callYr": {"rtype": "I", "ctype": "I", "val1": 2000, "val2": 2100},
                "serNo": {"rtype": "I", "ctype": "I", "val1": 0, "val2": 999}
            },
            "USAGE": {"columns": ["a", "b"]}
        })
        .as_object()
        .cloned()
        .unwrap();
        let over = json!({
            "RANGE": {"callYr": {"val2": 2030}},
            "USAGE": {"columns": ["c"]},
            "DATE": null
        })
        .as_object()
        .cloned()
        .unwrap();

        merge_json(&mut base, &over);

        assert_eq!(base["RANGE"]["callYr"]["val2"], json!(2030));
        assert_eq!(base["RANGE"]["callYr"]["rtype"], json!("I"));
        assert_eq!(base["RANGE"]["serNo"]["val2"], json!(999));
        assert_eq!(base["USAGE"]["columns"], json!(["c"]));
        assert!(!base.contains_key("DATE"));
    }

    #[test]
    fn test_merge_json_null_removes() {
        let mut base = json!({"RANGE": {"a": {}, "b": {}}}).as_object().cloned().unwrap();
        let over = json!({"RANGE": {"a": null}}).as_object().cloned().unwrap();
        merge_json(&mut base, &over);
        assert_eq!(base["RANGE"], json!({"b": {}}));
    }
}
