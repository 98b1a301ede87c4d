use std::sync::Arc;

use crate::{
    models::{CoherenceScore, Genre},
    services::providers::{CompletionRequest, LlmProvider},
};

const SYSTEM_PROMPT: &str = "You are a movie plot analysis expert.";
const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 10;

/// Placeholder some catalogs use instead of an empty overview
pub const NO_SUMMARY_SENTINEL: &str = "no summary available";

/// Asks the model to rate plot coherence on a 1-10 scale.
///
/// Single attempt. Missing credentials, missing plots, transport failures and
/// unusable replies all produce [`CoherenceScore::Unavailable`].
#[derive(Clone)]
pub struct PlotScorer {
    llm: Option<Arc<dyn LlmProvider>>,
}

impl PlotScorer {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { llm }
    }

    pub async fn score(&self, title: &str, plot: &str, genre: Genre) -> CoherenceScore {
        let Some(llm) = &self.llm else {
            return CoherenceScore::Unavailable;
        };

        if !has_plot(plot) {
            tracing::debug!(title = %title, "No plot to score");
            return CoherenceScore::Unavailable;
        }

        let reply = match llm.complete(build_request(title, plot, genre)).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    title = %title,
                    provider = llm.name(),
                    "Plot scoring failed"
                );
                return CoherenceScore::Unavailable;
            }
        };

        let score = parse_score(&reply);
        if score.is_available() {
            tracing::info!(title = %title, score = %score, "Plot scored");
        } else {
            tracing::warn!(title = %title, reply = %reply, "Unusable score reply");
        }
        score
    }
}

fn has_plot(plot: &str) -> bool {
    let trimmed = plot.trim();
    !trimmed.is_empty()
        && !trimmed
            .trim_end_matches('.')
            .eq_ignore_ascii_case(NO_SUMMARY_SENTINEL)
}

fn build_request(title: &str, plot: &str, genre: Genre) -> CompletionRequest {
    let prompt = format!(
        "Rate the plot coherence of this movie on a scale of 1-10:\n\n\
         Title: {}\n\
         Genre: {}\n\
         Plot: {}\n\n\
         Consider:\n\
         - Does the plot make logical sense?\n\
         - Is it well-structured?\n\
         - Does it match the genre?\n\n\
         Return only a number between 1-10, nothing else.",
        title, genre, plot
    );

    CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt,
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

/// Keeps digits and decimal points, then requires a number in 1..=10
pub fn parse_score(reply: &str) -> CoherenceScore {
    let cleaned: String = reply
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    cleaned
        .parse::<f64>()
        .map(CoherenceScore::from_value)
        .unwrap_or(CoherenceScore::Unavailable)
}
