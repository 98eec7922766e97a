//! Decoding of near-JSON generator output into strict schemas.
//!
//! Generators wrap objects in prose or code fences, and sometimes emit raw
//! newlines or control characters inside string literals. Decoding runs in
//! escalating steps and stops at the first that succeeds:
//!
//! 1. Take the first `{` through the last `}` as the candidate span.
//! 2. Parse the span as-is.
//! 3. Repair the span (escape raw newlines inside strings, strip control
//!    characters) and parse again.
//!
//! Schemas are expected to make every field optional, using [`lenient`] so a
//! single mistyped field does not reject the whole object.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::error::ParseError;

/// Greedy `{ ... }` span of the raw text.
pub fn extract_json_span(raw: &str) -> Result<&str, ParseError> {
    let start = raw.find('{').ok_or(ParseError::NoJsonFound)?;
    let end = raw.rfind('}').ok_or(ParseError::NoJsonFound)?;
    if end < start {
        return Err(ParseError::NoJsonFound);
    }
    Ok(&raw[start..=end])
}

/// Make a near-JSON span parseable.
///
/// Inside string literals a raw line feed becomes the two characters `\n` and
/// other control characters are dropped. Outside strings, whitespace control
/// characters are kept and the rest are dropped.
pub fn repair_json(span: &str) -> String {
    let mut out = String::with_capacity(span.len() + 16);
    let mut in_string = false;
    let mut escape_next = false;

    for ch in span.chars() {
        if ch.is_control() {
            match ch {
                '\n' if in_string => out.push_str("\\n"),
                '\n' | '\r' | '\t' if !in_string => out.push(ch),
                _ => {}
            }
            continue;
        }

        if escape_next {
            escape_next = false;
            out.push(ch);
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ => {}
        }
        out.push(ch);
    }

    out
}

/// Decode raw generator text into `T`.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let span = extract_json_span(raw)?;

    let first_error = match serde_json::from_str::<T>(span) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    debug!(error = %first_error, "Direct parse failed, attempting repair");
    let repaired = repair_json(span);

    serde_json::from_str::<T>(&repaired).map_err(|e| {
        warn!(
            span_length = span.len(),
            first_error = %first_error,
            repaired_error = %e,
            "Generator output could not be parsed"
        );
        ParseError::MalformedOutput {
            span: span.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Field deserializer that maps a wrongly typed value to `None`.
///
/// Use with `#[serde(default, deserialize_with = "lenient")]`.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        #[serde(default, deserialize_with = "lenient")]
        analysis: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        image_prompts: Option<Vec<String>>,
    }

    #[test]
    fn test_plain_object() {
        let parsed: Sample = parse_structured(r#"{"analysis":"ok","imagePrompts":["a"]}"#).unwrap();
        assert_eq!(parsed.analysis.as_deref(), Some("ok"));
        assert_eq!(parsed.image_prompts, Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_code_fence_and_prose() {
        let raw = "Sure! Here it is:\n```json\n{\"analysis\": \"fenced\"}\n```\nHope that helps.";
        let parsed: Sample = parse_structured(raw).unwrap();
        assert_eq!(parsed.analysis.as_deref(), Some("fenced"));
        assert_eq!(parsed.image_prompts, None);
    }

    #[test]
    fn test_repairs_raw_newlines_in_strings() {
        let raw = "{\n  \"analysis\": \"line one\nline two\",\n  \"imagePrompts\": [\"x\"]\n}";
        let parsed: Sample = parse_structured(raw).unwrap();
        assert_eq!(parsed.analysis.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn test_repair_keeps_existing_escapes() {
        let span = "{\"a\": \"quote \\\" and\nbreak\u{0007}\"}";
        assert_eq!(repair_json(span), "{\"a\": \"quote \\\" and\\nbreak\"}");
    }

    #[test]
    fn test_wrong_field_types_become_none() {
        let parsed: Sample = parse_structured(r#"{"analysis": 42, "imagePrompts": "nope"}"#).unwrap();
        assert_eq!(parsed, Sample { analysis: None, image_prompts: None });
    }

    #[test]
    fn test_no_json() {
        assert_eq!(
            parse_structured::<Sample>("no braces here").unwrap_err(),
            ParseError::NoJsonFound
        );
        assert_eq!(
            parse_structured::<Sample>("} backwards {").unwrap_err(),
            ParseError::NoJsonFound
        );
    }

    #[test]
    fn test_malformed_keeps_span() {
        let err = parse_structured::<Sample>("prefix {\"analysis\": } suffix").unwrap_err();
        match err {
            ParseError::MalformedOutput { span, .. } => assert_eq!(span, "{\"analysis\": }"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_arbitrary_input_never_panics() {
        for raw in ["", "{", "}", "{{}}", "{\"\\", "{\"a\":\"\u{0085}\"}", "{\u{0000}}"] {
            let _ = parse_structured::<Sample>(raw);
        }
    }
}
