//! Builders shared by the unit tests.

use crate::models::{Beach, Category, Event, EventsResponse, Municipality};

pub fn municipality(id: i64, name: &str) -> Municipality {
    Municipality {
        id,
        name: name.to_string(),
        slug: name.to_lowercase(),
        created_at: None,
        updated_at: None,
        has_beaches: false,
        image: None,
    }
}

pub fn event(id: i64, municipality_id: i64, municipality_name: &str) -> Event {
    Event {
        id,
        event_name_en: format!("Event {}", id),
        event_name_sq: format!("Ngjarja {}", id),
        from_date: "2026-07-10".to_string(),
        to_date: "2026-07-10".to_string(),
        category: Category {
            id: 1,
            name_en: "Culture".to_string(),
            name_sq: "Kulturë".to_string(),
            created_at: None,
            updated_at: None,
            photo: None,
        },
        event_hours: None,
        latitude: 41.0,
        longitude: 19.5,
        municipality: municipality(municipality_id, municipality_name),
        photo_urls: Vec::new(),
    }
}

pub fn beach(id: i64, municipality_id: i64, municipality_name: &str) -> Beach {
    Beach {
        id,
        name_en: format!("Beach {}", id),
        name_sq: format!("Plazhi {}", id),
        code: String::new(),
        area: String::new(),
        number: id,
        beach_type: "sandy".to_string(),
        latitude: "40.0".to_string(),
        longitude: "19.8".to_string(),
        is_public: true,
        pin_location: String::new(),
        description_en: String::new(),
        description_sq: String::new(),
        area_coordinates: String::new(),
        municipality: municipality(municipality_id, municipality_name),
        photo_urls: Vec::new(),
    }
}

/// Page `page` of a collection of `total_pages` pages holding `per_page`
/// events each, with ids numbered consecutively across pages.
pub fn events_page(page: u32, total_pages: u32, per_page: u32) -> EventsResponse {
    let first = (page - 1) * per_page;
    let events = (first..first + per_page)
        .map(|i| event(i as i64 + 1, 1, "Tirana"))
        .collect();
    EventsResponse {
        events,
        total: total_pages * per_page,
        per_page,
        current_page: page,
        total_pages,
    }
}
