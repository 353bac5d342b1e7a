//! Query parameters for the list endpoints.
//!
//! Unset fields are skipped during serialization, which keeps them out of
//! both the query string and the derived cache key.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<String>,
}

impl EventsQuery {
    pub fn by_category(category_id: i64) -> Self {
        Self {
            category_id: Some(category_id),
            ..Default::default()
        }
    }

    pub fn by_municipality(municipality_id: i64) -> Self {
        Self {
            municipality_id: Some(municipality_id),
            ..Default::default()
        }
    }

    /// Copy of this query pinned to `page`
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredEventsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<i64>,
}

impl FilteredEventsQuery {
    pub fn by_municipality(
        municipality_id: i64,
        from_date: Option<String>,
        to_date: Option<String>,
        audience: Option<i64>,
    ) -> Self {
        Self {
            municipality_id: Some(municipality_id),
            from_date,
            to_date,
            audience,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeachesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub beach_type: Option<String>,
}

impl BeachesQuery {
    pub fn public_only() -> Self {
        Self {
            is_public: Some(true),
            ..Default::default()
        }
    }

    pub fn by_municipality(municipality_id: i64) -> Self {
        Self {
            municipality_id: Some(municipality_id),
            ..Default::default()
        }
    }
}

/// Single-record lookups are keyed by `{ "id": n }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdQuery {
    pub id: i64,
}
