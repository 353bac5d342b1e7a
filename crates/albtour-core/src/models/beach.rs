use serde::{Deserialize, Serialize};

use super::{Language, Municipality};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beach {
    pub id: i64,
    pub name_en: String,
    pub name_sq: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub number: i64,
    #[serde(rename = "type", default)]
    pub beach_type: String,
    // The API sends coordinates as strings for beaches
    pub latitude: String,
    pub longitude: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub pin_location: String,
    #[serde(default)]
    pub description_en: String,
    #[serde(default)]
    pub description_sq: String,
    #[serde(default)]
    pub area_coordinates: String,
    pub municipality: Municipality,
    #[serde(default)]
    pub photo_urls: Vec<String>,
}

impl Beach {
    pub fn localized_name(&self, lang: Language) -> &str {
        lang.pick(&self.name_en, &self.name_sq)
    }

    pub fn localized_description(&self, lang: Language) -> &str {
        lang.pick(&self.description_en, &self.description_sq)
    }

    /// Parsed (latitude, longitude), if both strings are valid numbers
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude.trim().parse().ok()?;
        let lng = self.longitude.trim().parse().ok()?;
        Some((lat, lng))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCategory {
    pub id: i64,
    pub name_en: String,
    pub name_sq: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

impl PlaceCategory {
    pub fn localized_name(&self, lang: Language) -> &str {
        lang.pick(&self.name_en, &self.name_sq)
    }
}

/// A recommendation near a beach (restaurant, hotel, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: i64,
    pub name_en: String,
    pub name_sq: String,
    pub latitude: String,
    pub longitude: String,
    pub featured: Option<bool>,
    #[serde(default)]
    pub distance: f64,
    pub photo_url: Option<String>,
}

impl Place {
    pub fn localized_name(&self, lang: Language) -> &str {
        lang.pick(&self.name_en, &self.name_sq)
    }

    pub fn is_featured(&self) -> bool {
        self.featured.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlaceGroup {
    pub category: PlaceCategory,
    #[serde(default)]
    pub places: Vec<Place>,
}

/// `GET /beaches/{id}` adds nearby places to the plain beach record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedBeach {
    #[serde(flatten)]
    pub beach: Beach,
    #[serde(default)]
    pub nearby_places: Vec<NearbyPlaceGroup>,
}

impl DetailedBeach {
    /// Nearby place groups ordered by the category's `sort_order`
    pub fn sorted_place_groups(&self) -> Vec<&NearbyPlaceGroup> {
        let mut groups: Vec<&NearbyPlaceGroup> = self.nearby_places.iter().collect();
        groups.sort_by_key(|g| g.category.sort_order);
        groups
    }
}
