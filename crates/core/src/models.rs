use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::filter::Predicate;
use crate::SearchError;

pub const DEFAULT_TOP_K: usize = 10;

/// A property listing as written to the store. A later write with the same
/// `id` fully replaces the earlier one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub space: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub price: f64,
    pub embedding: Vec<f32>,
}

/// Where the structured predicates of a [`Query`] are evaluated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterPlacement {
    /// Inside the store, ANDed with the nearest-neighbor clause.
    #[default]
    Pre,
    /// Client-side on the retrieved top-k. May return fewer than `top_k` hits.
    Post,
}

impl std::str::FromStr for FilterPlacement {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            other => Err(format!("unknown filter placement `{other}` (expected pre|post)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub text: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub require_amenity: Option<String>,
    pub top_k: usize,
    pub placement: FilterPlacement,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            min_price: None,
            max_price: None,
            require_amenity: None,
            top_k: DEFAULT_TOP_K,
            placement: FilterPlacement::default(),
        }
    }

    pub fn with_price_range(mut self, min_price: Option<f64>, max_price: Option<f64>) -> Self {
        self.min_price = min_price;
        self.max_price = max_price;
        self
    }

    pub fn with_amenity(mut self, amenity: impl Into<String>) -> Self {
        self.require_amenity = Some(amenity.into());
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_placement(mut self, placement: FilterPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.text.trim().is_empty() {
            return Err(SearchError::InvalidQuery("query text is empty".to_string()));
        }
        if self.top_k == 0 {
            return Err(SearchError::InvalidQuery("top_k must be positive".to_string()));
        }
        for (label, bound) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if let Some(value) = bound {
                if !value.is_finite() || value < 0.0 {
                    return Err(SearchError::InvalidQuery(format!(
                        "{label} must be a non-negative number, got {value}"
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(SearchError::InvalidQuery(format!(
                    "min_price {min} is greater than max_price {max}"
                )));
            }
        }
        Ok(())
    }

    /// Structured predicates in a fixed order: min price, max price, amenity.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(min) = self.min_price {
            predicates.push(Predicate::PriceAtLeast(min));
        }
        if let Some(max) = self.max_price {
            predicates.push(Predicate::PriceAtMost(max));
        }
        if let Some(amenity) = &self.require_amenity {
            predicates.push(Predicate::HasAmenity(amenity.clone()));
        }
        predicates
    }
}

/// One hit as returned by the store: a relevance score and an untyped field bag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawHit {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub space: String,
    pub amenities: Vec<String>,
    pub price: Option<f64>,
    pub score: f64,
}

/// Acknowledgement of a successful document write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    pub status: u16,
}

/// Running counters emitted while an ingestion pass is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IngestProgress {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl IngestProgress {
    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.processed as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestionOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Last error message per failed document id.
    pub failures: BTreeMap<String, String>,
}

impl IngestionOutcome {
    pub fn record_success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.total += 1;
        self.failed += 1;
        self.failures.insert(id.into(), reason.into());
    }

    /// `None` for an empty run.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.succeeded as f64 / self.total as f64)
    }

    pub fn progress(&self) -> IngestProgress {
        IngestProgress {
            processed: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_to_ten_hits_prefiltered() {
        let query = Query::new("cozy loft");
        assert_eq!(query.top_k, 10);
        assert_eq!(query.placement, FilterPlacement::Pre);
        assert!(query.predicates().is_empty());
    }

    #[test]
    fn validate_rejects_inverted_price_range() {
        let query = Query::new("loft").with_price_range(Some(200.0), Some(100.0));
        assert!(matches!(query.validate(), Err(SearchError::InvalidQuery(_))));
    }

    #[test]
    fn validate_rejects_blank_text_and_zero_top_k() {
        assert!(Query::new("   ").validate().is_err());
        assert!(Query::new("loft").with_top_k(0).validate().is_err());
        assert!(Query::new("loft")
            .with_price_range(Some(-1.0), None)
            .validate()
            .is_err());
    }

    #[test]
    fn predicates_follow_fixed_order() {
        let query = Query::new("loft")
            .with_amenity("WiFi")
            .with_price_range(Some(50.0), Some(150.0));
        assert_eq!(
            query.predicates(),
            vec![
                Predicate::PriceAtLeast(50.0),
                Predicate::PriceAtMost(150.0),
                Predicate::HasAmenity("WiFi".to_string()),
            ]
        );
    }

    #[test]
    fn outcome_counters_stay_consistent() {
        let mut outcome = IngestionOutcome::default();
        assert_eq!(outcome.success_rate(), None);

        outcome.record_success();
        outcome.record_failure("c", "500");
        outcome.record_success();

        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.failed, outcome.total - outcome.succeeded);
        let rate = outcome.success_rate().unwrap_or_default();
        assert!((rate - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(outcome.failures.get("c").map(String::as_str), Some("500"));
    }

    #[test]
    fn placement_parses_case_insensitively() {
        assert_eq!("POST".parse::<FilterPlacement>(), Ok(FilterPlacement::Post));
        assert!("middle".parse::<FilterPlacement>().is_err());
    }
}
