use serde::{Deserialize, Serialize};

/// Display language for the bilingual `*_en` / `*_sq` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Sq,
}

impl Language {
    /// Parse a language code, accepting "al" as an alias for Albanian.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "sq" | "al" => Some(Language::Sq),
            _ => None,
        }
    }

    /// Pick between an English and an Albanian value, falling back to the
    /// other language when the preferred one is blank.
    pub fn pick<'a>(&self, en: &'a str, sq: &'a str) -> &'a str {
        let (preferred, other) = match self {
            Language::En => (en, sq),
            Language::Sq => (sq, en),
        };
        if preferred.trim().is_empty() {
            other
        } else {
            preferred
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::En => write!(f, "en"),
            Language::Sq => write!(f, "sq"),
        }
    }
}
