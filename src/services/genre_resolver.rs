use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    models::Genre,
    services::providers::{CompletionRequest, LlmProvider},
};

const SYSTEM_PROMPT: &str = "You are a mood-to-genre prediction assistant.";
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 50;

/// What the user told us
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// A mood word such as "happy" or "adventurous"
    Mood(String),
    /// A free-form request such as "something scary set in space"
    Request(String),
    /// A genre picked directly; no model call is made
    Genre(String),
}

impl Signal {
    pub fn text(&self) -> &str {
        match self {
            Signal::Mood(text) | Signal::Request(text) | Signal::Genre(text) => text,
        }
    }
}

/// Maps a user signal onto the genre taxonomy.
///
/// Total: every path ends in a taxonomy member. Anything the model says that
/// cannot be matched, and any failure to reach it, yields the default genre.
#[derive(Clone)]
pub struct GenreResolver {
    llm: Option<Arc<dyn LlmProvider>>,
    default_genre: Genre,
}

impl GenreResolver {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, default_genre: Genre) -> Self {
        Self { llm, default_genre }
    }

    pub fn default_genre(&self) -> Genre {
        self.default_genre
    }

    pub async fn resolve(&self, signal: &Signal) -> Genre {
        match signal {
            Signal::Genre(name) => name.parse().unwrap_or_else(|_| {
                tracing::warn!(genre = %name, fallback = %self.default_genre, "Unknown genre selection");
                self.default_genre
            }),
            Signal::Mood(_) | Signal::Request(_) => self.predict(signal).await,
        }
    }

    async fn predict(&self, signal: &Signal) -> Genre {
        let Some(llm) = &self.llm else {
            tracing::debug!(fallback = %self.default_genre, "No model configured, using default genre");
            return self.default_genre;
        };

        let reply = match llm.complete(build_request(signal)).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    provider = llm.name(),
                    fallback = %self.default_genre,
                    "Genre prediction failed"
                );
                return self.default_genre;
            }
        };

        match match_taxonomy(&reply) {
            Some(genre) => {
                tracing::info!(signal = %signal.text(), genre = %genre, "Genre predicted");
                genre
            }
            None => {
                tracing::warn!(
                    reply = %reply,
                    fallback = %self.default_genre,
                    "Model reply is not a known genre"
                );
                self.default_genre
            }
        }
    }
}

fn build_request(signal: &Signal) -> CompletionRequest {
    let subject = match signal {
        Signal::Request(text) => format!("the request '{}'", text.trim()),
        Signal::Mood(text) | Signal::Genre(text) => format!("the mood '{}'", text.trim()),
    };

    let prompt = format!(
        "Based on {}, predict the most suitable movie genre.\n\
         Choose from: {}.\n\n\
         Return only the genre name in lowercase, nothing else.",
        subject,
        Genre::taxonomy_list()
    );

    CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt,
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

/// Accepts an exact taxonomy name, or a reply containing exactly one
/// taxonomy name. Everything else is rejected.
pub fn match_taxonomy(reply: &str) -> Option<Genre> {
    let cleaned = reply.trim().to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(genre) = cleaned.parse::<Genre>() {
        return Some(genre);
    }

    let words: Vec<&str> = cleaned
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
        .collect();

    let mut found = Genre::ALL
        .iter()
        .copied()
        .filter(|genre| contains_phrase(&words, genre.name()));

    match (found.next(), found.next()) {
        (Some(genre), None) => Some(genre),
        _ => None,
    }
}

/// Whole-word match, so "war" is not found inside "award"
fn contains_phrase(words: &[&str], phrase: &str) -> bool {
    let phrase: Vec<&str> = phrase.split(' ').collect();
    words.windows(phrase.len()).any(|window| window == phrase.as_slice())
}
