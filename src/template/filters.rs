//! Built-in filters.

use super::{Registry, to_text};
use crate::naming;
use crate::scan::parse_date;
use serde_json::Value;

/// Medium date format, e.g. `Oct 17, 2026`.
pub const POST_DATE_FORMAT: &str = "%b %-d, %Y";

pub(super) fn register(registry: &mut Registry) {
    registry.add_filter("makeUppercase", |value, _| Ok(make_uppercase(&value)));
    registry.add_filter("postDate", |value, _| post_date(&value));
    registry.add_filter("slugify", |value, _| Ok(Value::String(naming::slugify(&to_text(&value)))));
}

fn make_uppercase(value: &Value) -> Value {
    Value::String(to_text(value).to_uppercase())
}

/// Format a `YYYY-MM-DD` or RFC 3339 date; empty input stays empty.
fn post_date(value: &Value) -> Result<Value, String> {
    let text = to_text(value);
    if text.is_empty() {
        return Ok(Value::String(String::new()));
    }
    parse_date(&text)
        .map(|d| Value::String(d.format(POST_DATE_FORMAT).to_string()))
        .ok_or_else(|| format!("not a date: '{text}'"))
}
