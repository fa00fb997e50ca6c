use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value as JsonValue;

/// Characters left bare by `encodeURIComponent`; everything else is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// Backslash-escape characters reserved by the Lucene query parser.
pub fn escape_reserved(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ' ' | '!' | '+' | '&' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | ':' | '"'
            | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Text of a JSON scalar as it appears in a clause. `None` for null, arrays
/// and objects.
pub fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_component_matches_uri_component_set() {
        assert_eq!(encode_component("*:*"), "*%3A*");
        assert_eq!(encode_component("a b,c"), "a%20b%2Cc");
        assert_eq!(encode_component("(x)!~'-_."), "(x)!~'-_.");
        assert_eq!(encode_component("\"q\"&=/"), "%22q%22%26%3D%2F");
    }

    #[test]
    fn test_encode_component_utf8() {
        assert_eq!(encode_component("é"), "%C3%A9");
    }

    #[test]
    fn test_escape_reserved() {
        assert_eq!(escape_reserved("a/b c"), "a/b\\ c");
        assert_eq!(escape_reserved("C:\\x"), "C\\:\\\\x");
        assert_eq!(escape_reserved("(a)[b]{c}"), "\\(a\\)\\[b\\]\\{c\\}");
        assert_eq!(escape_reserved("!+&|^\""), "\\!\\+\\&\\|\\^\\\"");
        assert_eq!(escape_reserved("plain-name_1.txt"), "plain-name_1.txt");
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!("x")), Some("x".to_string()));
        assert_eq!(scalar_text(&json!(5)), Some("5".to_string()));
        assert_eq!(scalar_text(&json!(1.5)), Some("1.5".to_string()));
        assert_eq!(scalar_text(&json!(true)), Some("true".to_string()));
        assert_eq!(scalar_text(&json!(null)), None);
        assert_eq!(scalar_text(&json!([1])), None);
    }
}
