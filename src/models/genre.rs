use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Closed movie genre taxonomy, each mapped to its TMDB genre code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Action,
    Adventure,
    Animation,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Family,
    Fantasy,
    History,
    Horror,
    Music,
    Mystery,
    Romance,
    #[serde(rename = "science fiction")]
    ScienceFiction,
    Thriller,
    War,
    Western,
}

impl Genre {
    /// Every member of the taxonomy, in prompt order
    pub const ALL: [Genre; 18] = [
        Genre::Action,
        Genre::Adventure,
        Genre::Animation,
        Genre::Comedy,
        Genre::Crime,
        Genre::Documentary,
        Genre::Drama,
        Genre::Family,
        Genre::Fantasy,
        Genre::History,
        Genre::Horror,
        Genre::Music,
        Genre::Mystery,
        Genre::Romance,
        Genre::ScienceFiction,
        Genre::Thriller,
        Genre::War,
        Genre::Western,
    ];

    /// Lowercase name as it appears in prompts and model replies
    pub fn name(&self) -> &'static str {
        match self {
            Genre::Action => "action",
            Genre::Adventure => "adventure",
            Genre::Animation => "animation",
            Genre::Comedy => "comedy",
            Genre::Crime => "crime",
            Genre::Documentary => "documentary",
            Genre::Drama => "drama",
            Genre::Family => "family",
            Genre::Fantasy => "fantasy",
            Genre::History => "history",
            Genre::Horror => "horror",
            Genre::Music => "music",
            Genre::Mystery => "mystery",
            Genre::Romance => "romance",
            Genre::ScienceFiction => "science fiction",
            Genre::Thriller => "thriller",
            Genre::War => "war",
            Genre::Western => "western",
        }
    }

    /// TMDB `with_genres` code
    pub fn tmdb_code(&self) -> u32 {
        match self {
            Genre::Action => 28,
            Genre::Adventure => 12,
            Genre::Animation => 16,
            Genre::Comedy => 35,
            Genre::Crime => 80,
            Genre::Documentary => 99,
            Genre::Drama => 18,
            Genre::Family => 10751,
            Genre::Fantasy => 14,
            Genre::History => 36,
            Genre::Horror => 27,
            Genre::Music => 10402,
            Genre::Mystery => 9648,
            Genre::Romance => 10749,
            Genre::ScienceFiction => 878,
            Genre::Thriller => 53,
            Genre::War => 10752,
            Genre::Western => 37,
        }
    }

    /// Comma separated taxonomy for prompts
    pub fn taxonomy_list() -> String {
        Genre::ALL
            .iter()
            .map(Genre::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown genre: {0}")]
pub struct UnknownGenre(pub String);

impl FromStr for Genre {
    type Err = UnknownGenre;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "sci-fi" | "scifi" | "science-fiction" => Ok(Genre::ScienceFiction),
            other => Genre::ALL
                .iter()
                .copied()
                .find(|genre| genre.name() == other)
                .ok_or_else(|| UnknownGenre(s.to_string())),
        }
    }
}

/// Movie language filter, mapped to the ISO 639-1 code TMDB expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
    Tamil,
    Telugu,
    French,
    German,
    Korean,
    Japanese,
    Spanish,
    Italian,
    Chinese,
    All,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::English,
        Language::Hindi,
        Language::Tamil,
        Language::Telugu,
        Language::French,
        Language::German,
        Language::Korean,
        Language::Japanese,
        Language::Spanish,
        Language::Italian,
        Language::Chinese,
        Language::All,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Tamil => "ta",
            Language::Telugu => "te",
            Language::French => "fr",
            Language::German => "de",
            Language::Korean => "ko",
            Language::Japanese => "ja",
            Language::Spanish => "es",
            Language::Italian => "it",
            Language::Chinese => "zh",
            Language::All => "all",
        }
    }

    /// Code sent on the discovery query; "all" has no TMDB equivalent
    pub fn query_code(&self) -> &'static str {
        match self {
            Language::All => "en",
            other => other.code(),
        }
    }
}
