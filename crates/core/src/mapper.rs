use serde_json::Value;

use crate::filter;
use crate::query::BuiltQuery;
use crate::{RawHit, SearchHit};

/// Normalizes raw store hits into [`SearchHit`]s, applying any client-side
/// predicates. Store order is preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMapper;

impl ResultMapper {
    pub fn map(&self, raw_hits: Vec<RawHit>, query: &BuiltQuery) -> Vec<SearchHit> {
        raw_hits
            .into_iter()
            .map(to_search_hit)
            .filter(|hit| filter::matches_all(&query.client_predicates, hit))
            .collect()
    }
}

pub fn to_search_hit(raw: RawHit) -> SearchHit {
    let fields = &raw.fields;
    let id = fields
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| raw.id.as_deref().map(local_id))
        .unwrap_or_default();

    SearchHit {
        id,
        name: string_field(fields.get("name")),
        space: string_field(fields.get("space")),
        amenities: fields
            .get("amenities")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        price: fields.get("price").and_then(numeric),
        score: raw.relevance,
    }
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// Some feeds store price as a decimal string.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// `id:airbnb:airbnb::10006546` -> `10006546`.
fn local_id(document_id: &str) -> String {
    document_id
        .rsplit_once("::")
        .map_or(document_id, |(_, local)| local)
        .to_string()
}
