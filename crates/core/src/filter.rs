//! Structured predicates shared by in-engine (YQL) and client-side filtering.
//!
//! A [`Predicate`] renders to a YQL clause for pre-filtering and evaluates
//! against a [`SearchHit`] for post-filtering, so both placements apply the
//! same semantics.

use crate::SearchHit;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    PriceAtLeast(f64),
    PriceAtMost(f64),
    /// Case-sensitive exact membership in the amenity list.
    HasAmenity(String),
}

impl Predicate {
    pub fn to_yql(&self) -> String {
        match self {
            Predicate::PriceAtLeast(min) => format!("price >= {}", format_number(*min)),
            Predicate::PriceAtMost(max) => format!("price <= {}", format_number(*max)),
            Predicate::HasAmenity(amenity) => {
                format!("amenities contains \"{}\"", escape_yql_string(amenity))
            }
        }
    }

    /// A hit without a price never satisfies a price bound.
    pub fn matches(&self, hit: &SearchHit) -> bool {
        match self {
            Predicate::PriceAtLeast(min) => hit.price.is_some_and(|price| price >= *min),
            Predicate::PriceAtMost(max) => hit.price.is_some_and(|price| price <= *max),
            Predicate::HasAmenity(amenity) => hit.amenities.iter().any(|item| item == amenity),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_yql())
    }
}

pub fn matches_all(predicates: &[Predicate], hit: &SearchHit) -> bool {
    predicates.iter().all(|predicate| predicate.matches(hit))
}

/// Joins clauses with `and`; `None` when there is nothing to join.
pub fn conjunction(predicates: &[Predicate]) -> Option<String> {
    if predicates.is_empty() {
        return None;
    }
    Some(
        predicates
            .iter()
            .map(Predicate::to_yql)
            .collect::<Vec<_>>()
            .join(" and "),
    )
}

// Integral bounds render without a trailing `.0`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn escape_yql_string(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
