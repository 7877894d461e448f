use crate::domain::model::{ParsedEvent, PropertyFields, RawEvent};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Looks up the listing properties in a parsed payload. Anything that is not
/// an object yields empty fields.
pub fn extract_fields(parsed: Option<&Value>) -> PropertyFields {
    let Some(Value::Object(map)) = parsed else {
        return PropertyFields::default();
    };

    let get = |key: &str| map.get(key).filter(|v| !v.is_null()).cloned();

    PropertyFields {
        house_id: get("house_id"),
        page_type: get("pageType"),
        rent_price: get("rent_price"),
        sale_price: get("sale_price"),
        estate_name: get("estate_name"),
        region_name: get("region_name"),
        house_address: get("house_address"),
    }
}

/// Renders a scalar the way it reads in the source data: integers without a
/// fraction, whole floats with `.0`.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 => format!("{:.1}", f),
            _ => n.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

/// Numbers and numeric strings become `f64`; anything else is `None`.
pub fn to_numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Unix seconds for a `created_at` cell. Naive values are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let normalized = raw.strip_suffix(" UTC").unwrap_or(raw);

    if let Ok(dt) = DateTime::parse_from_rfc3339(normalized) {
        return Some(dt.timestamp());
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(normalized, format) {
            return Some(dt.timestamp());
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(normalized, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(normalized, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        }
    }
    None
}

/// Applies type normalization to one event.
pub fn normalize(raw: RawEvent, fields: PropertyFields, payload_unparsed: bool) -> ParsedEvent {
    let timestamp = raw
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(0);

    let text = |v: &Option<Value>| v.as_ref().and_then(value_to_text);
    let numeric = |v: &Option<Value>| v.as_ref().and_then(to_numeric);

    ParsedEvent {
        house_id: text(&fields.house_id),
        page_type: text(&fields.page_type),
        rent_price: numeric(&fields.rent_price),
        sale_price: numeric(&fields.sale_price),
        estate_name: text(&fields.estate_name),
        region_name: text(&fields.region_name),
        house_address: text(&fields.house_address),
        timestamp,
        payload_unparsed,
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_fields_from_object() {
        let parsed = json!({
            "house_id": "HD37654191",
            "pageType": "detail",
            "rent_price": "25000",
            "estate_name": "黃埔花園",
            "region_name": null,
            "unrelated": 1
        });

        let fields = extract_fields(Some(&parsed));
        assert_eq!(fields.house_id, Some(json!("HD37654191")));
        assert_eq!(fields.page_type, Some(json!("detail")));
        assert_eq!(fields.rent_price, Some(json!("25000")));
        assert_eq!(fields.sale_price, None);
        assert_eq!(fields.region_name, None);
        assert_eq!(fields.house_address, None);
    }

    #[test]
    fn test_extract_fields_without_object() {
        assert_eq!(extract_fields(None), PropertyFields::default());
        assert_eq!(extract_fields(Some(&json!([1, 2]))), PropertyFields::default());
        assert_eq!(extract_fields(Some(&json!("H1"))), PropertyFields::default());
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!("H1")).as_deref(), Some("H1"));
        assert_eq!(value_to_text(&json!(37654191)).as_deref(), Some("37654191"));
        assert_eq!(value_to_text(&json!(5.0)).as_deref(), Some("5.0"));
        assert_eq!(value_to_text(&json!(5.25)).as_deref(), Some("5.25"));
        assert_eq!(value_to_text(&Value::Null), None);
    }

    #[test]
    fn test_to_numeric() {
        assert_eq!(to_numeric(&json!("2000")), Some(2000.0));
        assert_eq!(to_numeric(&json!(" 13500.5 ")), Some(13500.5));
        assert_eq!(to_numeric(&json!(8100000)), Some(8100000.0));
        assert_eq!(to_numeric(&json!("面議")), None);
        assert_eq!(to_numeric(&json!("nan")), None);
        assert_eq!(to_numeric(&json!({"a": 1})), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-01-01"), Some(1704067200));
        assert_eq!(parse_timestamp("2024-01-01 00:00:00"), Some(1704067200));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00.250"), Some(1704067200));
        assert_eq!(parse_timestamp("2024-01-01T08:00:00+08:00"), Some(1704067200));
        assert_eq!(parse_timestamp("2024-01-01 08:00:00.123+08:00"), Some(1704067200));
        assert_eq!(parse_timestamp("2024-01-01 00:00:00 UTC"), Some(1704067200));
        assert_eq!(parse_timestamp("2024/01/01"), Some(1704067200));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_normalize_defaults_timestamp_to_zero() {
        let raw = RawEvent {
            user_id: Some("U1".to_string()),
            event_name: Some("view_listing".to_string()),
            event_property: None,
            created_at: Some("not a date".to_string()),
        };
        let fields = PropertyFields {
            house_id: Some(json!(123)),
            rent_price: Some(json!("abc")),
            sale_price: Some(json!(6080000)),
            ..PropertyFields::default()
        };

        let event = normalize(raw, fields, false);
        assert_eq!(event.timestamp, 0);
        assert_eq!(event.house_id.as_deref(), Some("123"));
        assert_eq!(event.rent_price, None);
        assert_eq!(event.sale_price, Some(6080000.0));
    }
}
