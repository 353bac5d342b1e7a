use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Language, Municipality};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name_en: String,
    pub name_sq: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub photo: Option<String>,
}

impl Category {
    pub fn localized_name(&self, lang: Language) -> &str {
        lang.pick(&self.name_en, &self.name_sq)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub event_name_en: String,
    pub event_name_sq: String,
    pub from_date: String,
    pub to_date: String,
    pub category: Category,
    #[serde(default)]
    pub event_hours: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub municipality: Municipality,
    #[serde(default)]
    pub photo_urls: Vec<String>,
}

/// Envelope returned by `GET /events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub total: u32,
    pub per_page: u32,
    pub current_page: u32,
    pub total_pages: u32,
}

impl EventsResponse {
    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }
}

impl Event {
    pub fn localized_name(&self, lang: Language) -> &str {
        lang.pick(&self.event_name_en, &self.event_name_sq)
    }

    pub fn municipality_name(&self) -> &str {
        &self.municipality.name
    }

    /// First photo, used as the card thumbnail
    pub fn cover_photo(&self) -> Option<&str> {
        self.photo_urls.first().map(|s| s.as_str())
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        parse_date(&self.from_date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        parse_date(&self.to_date)
    }

    /// "Jul 10, 2026" for single-day events, "Jul 10 - Jul 14, 2026" otherwise
    pub fn formatted_date_range(&self) -> String {
        match (self.start_date(), self.end_date()) {
            (Some(start), Some(end)) if start == end => start.format("%b %d, %Y").to_string(),
            (Some(start), Some(end)) => format!(
                "{} - {}",
                start.format("%b %d"),
                end.format("%b %d, %Y")
            ),
            (Some(start), None) => start.format("%b %d, %Y").to_string(),
            // Fall back to the raw string, truncated to the date part
            _ => self.from_date.chars().take(10).collect(),
        }
    }
}

/// Accepts RFC 3339 timestamps as well as plain `YYYY-MM-DD` dates.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    let date_part: String = raw.chars().take(10).collect();
    NaiveDate::parse_from_str(&date_part, "%Y-%m-%d").ok()
}
