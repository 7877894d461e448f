use crate::core::python_literal::parse_literal;
use serde_json::Value;

const DIAGNOSTIC_PREFIX_CHARS: usize = 100;

/// One way of turning an `event_property` cell into a value.
pub trait ParseStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn parse(&self, input: &str) -> Option<Value>;
}

/// JSON as the tracking export writes it. The bare `NaN`, `Infinity` and
/// `-Infinity` tokens that Python's encoder emits are accepted and read as
/// `null`, since `Value` has no non-finite numbers.
pub struct StrictJson;

const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

impl StrictJson {
    /// Replaces non-finite tokens outside string literals with `null`.
    /// Returns `None` when there was nothing to replace.
    pub fn nullify_non_finite(input: &str) -> Option<String> {
        let mut out = String::with_capacity(input.len());
        let mut replaced = false;
        let mut in_string = false;
        let mut escaped = false;
        let mut prev: Option<char> = None;
        let mut rest = input;

        while let Some(c) = rest.chars().next() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                }
            } else if c == '"' {
                in_string = true;
            } else if !prev.is_some_and(is_ident_char) {
                let token = NON_FINITE_TOKENS.iter().find(|token| {
                    rest.starts_with(*token)
                        && !rest[token.len()..].chars().next().is_some_and(is_ident_char)
                });
                if let Some(token) = token {
                    out.push_str("null");
                    rest = &rest[token.len()..];
                    prev = Some('l');
                    replaced = true;
                    continue;
                }
            }

            out.push(c);
            prev = Some(c);
            rest = &rest[c.len_utf8()..];
        }

        replaced.then_some(out)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl ParseStrategy for StrictJson {
    fn name(&self) -> &'static str {
        "json"
    }

    fn parse(&self, input: &str) -> Option<Value> {
        serde_json::from_str(input).ok().or_else(|| {
            let nullified = Self::nullify_non_finite(input)?;
            serde_json::from_str(&nullified).ok()
        })
    }
}

/// Python `repr()`-style dicts: single quotes, `True`/`None`.
pub struct PythonLiteral;

impl ParseStrategy for PythonLiteral {
    fn name(&self) -> &'static str {
        "python-literal"
    }

    fn parse(&self, input: &str) -> Option<Value> {
        parse_literal(input).ok()
    }
}

/// Undoes one level of string escaping around nested objects, e.g.
/// `{"meta": "{\"house_id\": \"H1\"}"}`, then retries strict JSON.
pub struct RepairedJson;

impl RepairedJson {
    pub fn repair(input: &str) -> String {
        input
            .replace("\\\"", "\"")
            .replace("\"{", "{")
            .replace("}\"", "}")
    }
}

impl ParseStrategy for RepairedJson {
    fn name(&self) -> &'static str {
        "repaired-json"
    }

    fn parse(&self, input: &str) -> Option<Value> {
        serde_json::from_str(&Self::repair(input)).ok()
    }
}

/// Tries each strategy in order; the first success wins.
pub struct LayeredParser {
    strategies: Vec<Box<dyn ParseStrategy>>,
}

impl Default for LayeredParser {
    fn default() -> Self {
        Self::new(vec![
            Box::new(StrictJson),
            Box::new(PythonLiteral),
            Box::new(RepairedJson),
        ])
    }
}

impl LayeredParser {
    pub fn new(strategies: Vec<Box<dyn ParseStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// `None` input is a missing cell and yields `None` silently.
    pub fn parse(&self, input: Option<&str>) -> Option<Value> {
        let input = input?;

        for strategy in &self.strategies {
            if let Some(value) = strategy.parse(input) {
                tracing::trace!("event_property parsed with {}", strategy.name());
                return Some(value);
            }
        }

        let preview: String = input.chars().take(DIAGNOSTIC_PREFIX_CHARS).collect();
        tracing::warn!("Could not parse JSON: {}...", preview);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_valid_json_matches_serde_json() {
        let parser = LayeredParser::default();
        let inputs = [
            r#"{"house_id":"H1","rent_price":"2000"}"#,
            r#"{"nested":{"a":[1,2,3]},"flag":true,"none":null}"#,
            r#"[1, "two", 3.5]"#,
            r#""just a string""#,
            "42",
        ];

        for input in inputs {
            let expected: Value = serde_json::from_str(input).unwrap();
            assert_eq!(parser.parse(Some(input)), Some(expected), "input: {}", input);
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn with_captured_log<T>(f: impl FnOnce() -> T) -> (T, String) {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, log.text())
    }

    #[test]
    fn test_missing_input_is_none_without_diagnostic() {
        let parser = LayeredParser::default();
        let (parsed, log) = with_captured_log(|| parser.parse(None));
        assert_eq!(parsed, None);
        assert!(log.is_empty(), "unexpected log output: {}", log);

        let (parsed, log) = with_captured_log(|| parser.parse(Some("not json {")));
        assert_eq!(parsed, None);
        assert!(log.contains("Could not parse JSON: not json {"));
    }

    #[test]
    fn test_non_finite_tokens_read_as_null() {
        let parser = LayeredParser::default();
        let parsed = parser.parse(Some(
            r#"{"house_id": "H1", "rent_price": NaN, "sale_price": 5600000.0}"#,
        ));
        assert_eq!(
            parsed,
            Some(json!({"house_id": "H1", "rent_price": null, "sale_price": 5600000.0}))
        );

        let parsed = parser.parse(Some(r#"[Infinity, -Infinity, "NaN", {"a": "x NaN"}]"#));
        assert_eq!(parsed, Some(json!([null, null, "NaN", {"a": "x NaN"}])));
    }

    #[test]
    fn test_nullify_only_touches_bare_tokens() {
        assert_eq!(StrictJson::nullify_non_finite(r#"{"a": 1}"#), None);
        assert_eq!(
            StrictJson::nullify_non_finite(r#"{"NaN": NaN, "s": "a \"NaN\" b"}"#).as_deref(),
            Some(r#"{"NaN": null, "s": "a \"NaN\" b"}"#)
        );
        // Not a standalone token.
        assert_eq!(StrictJson::nullify_non_finite("[NaNa, xInfinity]"), None);
    }

    #[test]
    fn test_falls_back_to_python_literal() {
        let parser = LayeredParser::default();
        let parsed = parser.parse(Some("{'house_id': 'H2', 'sale_price': 5600000.0}"));
        assert_eq!(parsed, Some(json!({"house_id": "H2", "sale_price": 5600000.0})));
    }

    #[test]
    fn test_falls_back_to_repair() {
        let parser = LayeredParser::default();
        let input = r#"{"meta": "{\"house_id\": \"H3\"}"}"#;
        assert!(StrictJson.parse(input).is_some());

        // Escaped quotes outside of a string are only recoverable by repair.
        let input = r#"{\"house_id\": \"H3\", \"pageType\": \"detail\"}"#;
        assert!(StrictJson.parse(input).is_none());
        assert!(PythonLiteral.parse(input).is_none());
        assert_eq!(
            parser.parse(Some(input)),
            Some(json!({"house_id": "H3", "pageType": "detail"}))
        );
    }

    #[test]
    fn test_repair_unwraps_stringified_objects() {
        assert_eq!(
            RepairedJson::repair(r#"{"a": "{\"b\": 1}"}"#),
            r#"{"a": {"b": 1}}"#
        );
    }

    #[test]
    fn test_unparseable_returns_none() {
        let parser = LayeredParser::default();
        assert_eq!(parser.parse(Some("not json at all {")), None);
        assert_eq!(parser.parse(Some("")), None);
    }

    #[test]
    fn test_strategy_order() {
        assert_eq!(
            LayeredParser::default().strategy_names(),
            vec!["json", "python-literal", "repaired-json"]
        );
    }
}
