//! Deployment template rendering.
//!
//! Shipped definitions carry `__NAME__` tokens (for example
//! `__ANEMOMETER_MYSQL_HOST__`) that the installer fills in. Tokens may sit
//! inside a larger string, as in `__ANEMOMETER_MYSQL_DB___writer`, or stand
//! bare in a numeric position such as `port: __ANEMOMETER_MYSQL_PORT__`.

use crate::ConfigError;
use log::debug;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

/// Uppercase token wrapped in double underscores, matched shortest-first.
static PLACEHOLDER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"__([A-Z][A-Z0-9_]*?)__"));

/// Substitute every placeholder in `template` with its value from `vars`.
///
/// Inside quotes, values are escaped for a JSON5 string, so quotes and
/// backslashes in a password survive. Outside quotes a value must be a plain
/// number. Fails listing the offending tokens, never their values.
pub fn render_template(
    template: &str,
    vars: &BTreeMap<String, String>,
) -> Result<String, ConfigError> {
    let regex = PLACEHOLDER
        .as_ref()
        .map_err(|err| ConfigError::Invalid(format!("placeholder pattern: {err}")))?;
    let spans = quoted_spans(template);
    let mut missing: Vec<String> = Vec::new();
    let mut not_numeric: Vec<String> = Vec::new();
    let rendered = regex
        .replace_all(template, |caps: &Captures<'_>| {
            let token = caps.get(0).map_or("", |m| m.as_str());
            let start = caps.get(0).map_or(0, |m| m.start());
            let name = caps.get(1).map_or("", |m| m.as_str());
            let quoted = spans.iter().any(|span| span.contains(&start));
            match vars.get(name) {
                Some(value) if quoted => escape_json5(value),
                Some(value) if is_plain_number(value) => value.clone(),
                Some(_) => {
                    push_unique(&mut not_numeric, name);
                    token.to_string()
                }
                None => {
                    push_unique(&mut missing, name);
                    token.to_string()
                }
            }
        })
        .to_string();

    if !missing.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "template placeholders without a value: {}",
            token_list(&missing)
        )));
    }
    if !not_numeric.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "template placeholders outside quotes need numeric values: {}",
            token_list(&not_numeric)
        )));
    }
    debug!("rendered definition template (vars={})", vars.len());
    Ok(rendered)
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|seen| seen == name) {
        names.push(name.to_string());
    }
}

fn token_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("__{name}__"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Optional sign, digits, and at most one inner decimal point.
fn is_plain_number(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let mut parts = digits.split('.');
    let valid_part = |part: Option<&str>| {
        part.is_some_and(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
    };
    valid_part(parts.next())
        && match parts.next() {
            None => true,
            fraction => valid_part(fraction) && parts.next().is_none(),
        }
}

/// Byte ranges of quoted string literals, skipping comments.
fn quoted_spans(text: &str) -> Vec<Range<usize>> {
    enum State {
        Code,
        Quoted { quote: char, start: usize },
        LineComment,
        BlockComment,
    }

    let mut spans = Vec::new();
    let mut state = State::Code;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        match state {
            State::Code => match ch {
                '"' | '\'' => state = State::Quoted { quote: ch, start: idx },
                '/' if chars.peek().is_some_and(|(_, next)| *next == '/') => {
                    state = State::LineComment
                }
                '/' if chars.peek().is_some_and(|(_, next)| *next == '*') => {
                    chars.next();
                    state = State::BlockComment;
                }
                _ => {}
            },
            State::Quoted { quote, start } => {
                if ch == '\\' {
                    chars.next();
                } else if ch == quote {
                    spans.push(start..idx + ch.len_utf8());
                    state = State::Code;
                }
            }
            State::LineComment => {
                if ch == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if ch == '*' && chars.peek().is_some_and(|(_, next)| *next == '/') {
                    chars.next();
                    state = State::Code;
                }
            }
        }
    }
    if let State::Quoted { start, .. } = state {
        spans.push(start..text.len());
    }
    spans
}

/// Escape a value for use inside a single- or double-quoted JSON5 string.
fn escape_json5(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_embedded_tokens() {
        let rendered = render_template(
            "db: '__ANEMOMETER_MYSQL_DB___writer', port: __ANEMOMETER_MYSQL_PORT__",
            &vars(&[
                ("ANEMOMETER_MYSQL_DB", "slow_query_log"),
                ("ANEMOMETER_MYSQL_PORT", "3306"),
            ]),
        )
        .expect("render");
        assert_eq!(rendered, "db: 'slow_query_log_writer', port: 3306");
    }

    #[test]
    fn escapes_quotes_in_values() {
        let rendered = render_template(
            "password: '__PW__'",
            &vars(&[("PW", r#"it's "quoted" \ ok"#)]),
        )
        .expect("render");
        assert_eq!(rendered, r#"password: 'it\'s \"quoted\" \\ ok'"#);
    }

    #[test]
    fn reports_missing_tokens_once() {
        let err = render_template("__HOST__ __USER__ __HOST__", &vars(&[("USER", "1")]))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "invalid definition: template placeholders without a value: __HOST__"
        );
    }

    #[test]
    fn rejects_non_numeric_values_outside_quotes() {
        let err = render_template(
            "{ port: __PORT__, host: '__HOST__' }",
            &vars(&[("PORT", "3306, user: 'root'"), ("HOST", "db1")]),
        )
        .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "invalid definition: template placeholders outside quotes need numeric values: __PORT__"
        );
        assert!(!err.to_string().contains("root"));
    }

    #[test]
    fn quoting_ignores_comments_and_escapes() {
        let template = "// it's a comment\n{ a: 'x\\'__IN__', b: __OUT__ /* 'c' */ }";
        let rendered = render_template(template, &vars(&[("IN", "v'"), ("OUT", "-1.5")]))
            .expect("render");
        assert_eq!(
            rendered,
            "// it's a comment\n{ a: 'x\\'v\\'', b: -1.5 /* 'c' */ }"
        );
    }

    #[test]
    fn plain_numbers() {
        for value in ["0", "3306", "-1", "2.5"] {
            assert!(is_plain_number(value), "{value}");
        }
        for value in ["", "-", "1.", ".5", "1.2.3", "3306, x: 1", "0x10"] {
            assert!(!is_plain_number(value), "{value}");
        }
    }
}
