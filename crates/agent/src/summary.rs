//! Deterministic reply synthesis from tool results.
//!
//! Used when the model ran tools but produced no text, or when the round cap
//! stopped the loop. Only the first invocation is summarized.

use campusdesk_core::message::ToolInvocation;
use serde_json::Value;

pub const GENERIC_FILLER: &str =
    "I found some information related to your question. Would you like more details?";

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn bullets(items: &[Value], key: &str) -> String {
    items
        .iter()
        .take(3)
        .filter_map(|item| str_field(item, key))
        .map(|title| format!("• {title}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn department_summary(result: &Value) -> Option<String> {
    let department = result.get("results")?.as_array()?.first()?;
    let name = str_field(department, "name")?;

    let mut text = format!("The {name} department");
    if let Some(hod) = str_field(department, "hod") {
        text.push_str(&format!(" is headed by {hod}"));
    }
    text.push('.');
    if let Some(location) = str_field(department, "location") {
        text.push_str(&format!(" It is located at {location}."));
    }
    Some(text)
}

fn list_summary(result: &Value, list_key: &str, title_key: &str, heading: &str) -> Option<String> {
    let items = result.get(list_key)?.as_array()?;
    let body = bullets(items, title_key);
    if body.is_empty() {
        return None;
    }
    Some(format!("{heading}\n{body}"))
}

/// Summarize the first invocation's result. Never returns an empty string.
pub fn synthesize_reply(invocations: &[ToolInvocation]) -> String {
    let Some(first) = invocations.first() else {
        return GENERIC_FILLER.into();
    };
    let Some(result) = first.result.as_ref() else {
        return GENERIC_FILLER.into();
    };

    let text = match first.result_type() {
        Some("department" | "hod") => department_summary(result),
        Some("resources") => list_summary(
            result,
            "resources",
            "title",
            "Here are some resources you might find useful:",
        ),
        Some("news") => list_summary(result, "news", "title", "Here are the latest updates:"),
        _ => None,
    };
    text.unwrap_or_else(|| GENERIC_FILLER.into())
}
