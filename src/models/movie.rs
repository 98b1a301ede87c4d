use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt::Display;

use super::{TmdbMovie, TmdbMovieDetails};

/// A normalized catalog entry; only the catalog client creates these
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieRecord {
    /// TMDB movie id, used for the detail lookup
    pub id: u64,
    pub title: String,
    /// Plot summary, empty when the catalog has none
    pub overview: String,
    /// Raw release date as supplied, possibly empty or malformed
    pub release_date: String,
    pub vote_average: f64,
    pub popularity: f64,
    pub poster_url: Option<String>,
    pub genre_ids: Vec<u32>,
}

impl MovieRecord {
    /// Normalizes a raw discovery result; the poster URL exists only when a
    /// poster path was supplied.
    pub fn from_tmdb(movie: TmdbMovie, image_base_url: &str) -> Self {
        let poster_url = movie
            .poster_path
            .filter(|path| !path.trim().is_empty())
            .map(|path| format!("{}{}", image_base_url, path));

        Self {
            id: movie.id,
            title: movie.title,
            overview: movie.overview.unwrap_or_default(),
            release_date: movie.release_date.unwrap_or_default(),
            vote_average: movie.vote_average.unwrap_or(0.0),
            popularity: movie.popularity.unwrap_or(0.0),
            poster_url,
            genre_ids: movie.genre_ids,
        }
    }

    pub fn release_year(&self) -> Option<i32> {
        NaiveDate::parse_from_str(&self.release_date, "%Y-%m-%d")
            .ok()
            .map(|date| date.year())
    }

    pub fn year_label(&self) -> String {
        self.release_year()
            .map(|year| year.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Plot coherence rating as judged by the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoherenceScore {
    /// A value in the closed range 1..=10
    Rated(f64),
    Unavailable,
}

impl CoherenceScore {
    pub const MIN: f64 = 1.0;
    pub const MAX: f64 = 10.0;

    /// Out-of-range and non-finite values are unavailable
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() && (Self::MIN..=Self::MAX).contains(&value) {
            CoherenceScore::Rated(value)
        } else {
            CoherenceScore::Unavailable
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CoherenceScore::Rated(_))
    }
}

impl Display for CoherenceScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoherenceScore::Rated(value) => write!(f, "{:.1}/10", value),
            CoherenceScore::Unavailable => write!(f, "unavailable"),
        }
    }
}

impl Serialize for CoherenceScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Extra facts from the per-movie detail query
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieDetails {
    pub director: String,
    pub cast: String,
    pub runtime: Option<u32>,
    pub budget: u64,
    pub revenue: u64,
    pub imdb_id: String,
}

const TOP_BILLED: usize = 5;

impl From<TmdbMovieDetails> for MovieDetails {
    fn from(details: TmdbMovieDetails) -> Self {
        let credits = details.credits.unwrap_or_default();

        let director = credits
            .crew
            .iter()
            .find(|member| member.job == "Director")
            .map(|member| member.name.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let cast: Vec<&str> = credits
            .cast
            .iter()
            .take(TOP_BILLED)
            .map(|actor| actor.name.as_str())
            .collect();

        Self {
            director,
            cast: if cast.is_empty() {
                "Unknown".to_string()
            } else {
                cast.join(", ")
            },
            runtime: details.runtime,
            budget: details.budget.unwrap_or(0),
            revenue: details.revenue.unwrap_or(0),
            imdb_id: details.imdb_id.unwrap_or_default(),
        }
    }
}
