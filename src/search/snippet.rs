use serde_json::Value;

const DESCRIPTION_FIELDS: &[&str] = &["description", "service_description"];
const SERVICE_AREA_KEYS: &[&str] = &["service_area", "service_areas"];

/// Remove embedding vectors (any key ending in `embedding`, at any depth)
/// and, on request, service-area polygons from a document.
pub fn strip_source(source: &mut Value, exclude_service_area: bool) {
    match source {
        Value::Object(map) => {
            map.retain(|key, _| {
                !key.ends_with("embedding")
                    && !(exclude_service_area && SERVICE_AREA_KEYS.contains(&key.as_str()))
            });
            for value in map.values_mut() {
                strip_source(value, exclude_service_area);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_source(item, exclude_service_area);
            }
        }
        _ => {}
    }
}

/// First sentence of the document description mentioning any of `terms`.
pub fn relevant_text(source: &Value, terms: &[String]) -> Option<String> {
    let terms: Vec<String> = terms
        .iter()
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() >= 3)
        .collect();
    if terms.is_empty() {
        return None;
    }

    let description = DESCRIPTION_FIELDS
        .iter()
        .find_map(|f| source.get(*f).and_then(Value::as_str))
        .or_else(|| {
            source
                .get("service")
                .and_then(|s| s.get("description"))
                .and_then(Value::as_str)
        })?;

    sentences(description)
        .into_iter()
        .find(|s| {
            let lower = s.to_lowercase();
            terms.iter().any(|t| lower.contains(t.as_str()))
        })
        .map(str::to_string)
}

fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                let end = i + c.len_utf8();
                let s = text[start..end].trim();
                if !s.is_empty() {
                    out.push(s);
                }
                start = end;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}
