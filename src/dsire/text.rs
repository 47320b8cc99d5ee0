// src/dsire/text.rs
//! String helpers shared by the table builder.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::Value;

static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("line-break regex should compile"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex should compile"));

/// Strip markup from a detail value: `<br>` variants become newlines, other
/// tags are dropped, entities are decoded and the result is trimmed.
/// Returns `None` when nothing is left.
pub fn strip_html(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }
    let with_breaks = LINE_BREAK.replace_all(raw, "\n");
    let untagged = TAG.replace_all(&with_breaks, "");
    // the parser only decodes entities here; leftover `<` and CR stay literal
    let escaped = untagged.replace('<', "&lt;").replace('\r', "&#13;");
    let fragment = Html::parse_fragment(&escaped);
    let text: String = fragment.root_element().text().collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Join non-empty values with `"; "`, keeping first occurrences in order.
pub fn join_unique<I, S>(items: I) -> Option<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut seen: Vec<String> = Vec::new();
    for item in items.into_iter().flatten() {
        let s = item.as_ref();
        if !s.is_empty() && !seen.iter().any(|x| x == s) {
            seen.push(s.to_string());
        }
    }
    (!seen.is_empty()).then(|| seen.join("; "))
}

/// Coerce a scalar JSON value to text. Strings are kept verbatim, numbers and
/// booleans use their JSON spelling; empty strings and containers are absent.
pub fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First alias of `keys` present on `record` with a usable text value.
pub fn first_text(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| record.get(*k).and_then(value_text))
}

/// Project `field` out of every object in the list at `record[list_key]`.
pub fn project(record: &Value, list_key: &str, field: &str) -> Vec<Option<String>> {
    list_items(record, list_key)
        .iter()
        .map(|item| item.get(field).and_then(value_text))
        .collect()
}

/// The list at `record[key]`, or an empty slice when absent or not a list.
pub fn list_items<'a>(record: &'a Value, key: &str) -> &'a [Value] {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Truthiness of a JSON scalar: null, false, zero and the empty string are falsy.
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_markup_and_entities() {
        assert_eq!(
            strip_html("Up to<br/>50% &amp; more").as_deref(),
            Some("Up to\n50% & more")
        );
        assert_eq!(
            strip_html("  <p>Line one<BR />line <b>two</b></p> ").as_deref(),
            Some("Line one\nline two")
        );
        assert_eq!(strip_html("<p> </p>"), None);
        assert_eq!(
            strip_html("see <title>x<b>y</b></title> z").as_deref(),
            Some("see xy z")
        );
        assert_eq!(
            strip_html("<textarea>a <i>b</i></textarea><style>c</style>").as_deref(),
            Some("a bc")
        );
        assert_eq!(strip_html("x < y &lt;b&gt;").as_deref(), Some("x < y <b>"));
        assert_eq!(strip_html("a\r\nb<br>c").as_deref(), Some("a\r\nb\nc"));
        assert_eq!(strip_html("   "), None);
    }

    #[test]
    fn joins_unique_in_order() {
        let techs = json!({"Technologies": [
            {"name": "Solar PV"}, {"name": "Solar PV"}, {"name": "Wind"}
        ]});
        assert_eq!(
            join_unique(project(&techs, "Technologies", "name")).as_deref(),
            Some("Solar PV; Wind")
        );
        assert_eq!(join_unique(Vec::<Option<String>>::new()), None);
        assert_eq!(join_unique(vec![None, Some("")]), None);
    }

    #[test]
    fn text_coercion() {
        let rec = json!({"A": "", "B": 12, "C": "x", "D": [1]});
        assert_eq!(first_text(&rec, &["A", "B"]).as_deref(), Some("12"));
        assert_eq!(first_text(&rec, &["D", "C"]).as_deref(), Some("x"));
        assert_eq!(first_text(&rec, &["Z"]), None);
        assert!(list_items(&rec, "C").is_empty());
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
        assert!(is_truthy(&json!(1234)));
        assert!(is_truthy(&json!("0")));
    }
}
