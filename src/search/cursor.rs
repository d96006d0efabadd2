use serde_json::{json, Value};
use std::cmp::Ordering;

use super::CombinedHit;

/// Pagination boundary: the `(score, doc_id)` of the last hit served, plus
/// the fingerprint of the weights that produced that score.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub score: f64,
    pub doc_id: String,
    pub fingerprint: Option<String>,
}

impl Cursor {
    pub fn for_hit(hit: &CombinedHit, fingerprint: &str) -> Self {
        Self {
            score: hit.total_score,
            doc_id: hit.doc_id.clone(),
            fingerprint: Some(fingerprint.to_string()),
        }
    }

    /// Parse `[score, docId]` or `[score, docId, fingerprint]`.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let parts = value
            .as_array()
            .ok_or_else(|| "search_after must be an array".to_string())?;
        if !(2..=3).contains(&parts.len()) {
            return Err(format!(
                "search_after must have 2 or 3 elements, got {}",
                parts.len()
            ));
        }
        let score = parts[0]
            .as_f64()
            .filter(|s| s.is_finite())
            .ok_or_else(|| "search_after[0] must be a finite number".to_string())?;
        let doc_id = match &parts[1] {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return Err("search_after[1] must be a document id".to_string()),
        };
        let fingerprint = match parts.get(2) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err("search_after[2] must be a string".to_string()),
        };
        Ok(Self {
            score,
            doc_id,
            fingerprint,
        })
    }

    pub fn to_json(&self) -> Value {
        match &self.fingerprint {
            Some(fp) => json!([self.score, self.doc_id, fp]),
            None => json!([self.score, self.doc_id]),
        }
    }

    /// Whether a hit sorts strictly after this boundary under
    /// score-descending, id-ascending order.
    pub fn precedes(&self, score: f64, doc_id: &str) -> bool {
        match self.score.total_cmp(&score) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => doc_id > self.doc_id.as_str(),
        }
    }
}

/// The tail of a sorted hit list that follows `cursor`.
///
/// The boundary document is located by id first so a score that lost
/// precision in transit still resumes at the right place.
pub fn page_after<'a>(hits: &'a [CombinedHit], cursor: Option<&Cursor>) -> &'a [CombinedHit] {
    let Some(cursor) = cursor else {
        return hits;
    };
    if let Some(pos) = hits.iter().position(|h| h.doc_id == cursor.doc_id) {
        return &hits[pos + 1..];
    }
    let start = hits
        .iter()
        .position(|h| cursor.precedes(h.total_score, &h.doc_id))
        .unwrap_or(hits.len());
    &hits[start..]
}
