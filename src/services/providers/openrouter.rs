/// OpenRouter chat-completion provider
///
/// POST {api_url}/chat/completions with a bearer token; the reply text is
/// `choices[0].message.content`.
use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage},
    services::providers::{CompletionRequest, LlmProvider},
};
use reqwest::Client as HttpClient;

#[derive(Clone)]
pub struct OpenRouterProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    referer: String,
    title: String,
}

impl OpenRouterProvider {
    /// Builds a provider from configuration, or `None` when no API key is set
    pub fn from_config(config: &Config) -> AppResult<Option<Self>> {
        let Some(api_key) = config.openrouter_key() else {
            tracing::warn!("OPENROUTER_API_KEY not set; genre prediction and plot scoring disabled");
            return Ok(None);
        };

        let http_client = HttpClient::builder()
            .timeout(config.llm_timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Some(Self {
            http_client,
            api_key: api_key.to_string(),
            api_url: config.openrouter_api_url.trim_end_matches('/').to_string(),
            model: config.llm_model.clone(),
            referer: config.openrouter_referer.clone(),
            title: config.openrouter_title.clone(),
        }))
    }

    fn build_body(&self, request: CompletionRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(request.system),
                ChatMessage::user(request.prompt),
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn complete(&self, request: CompletionRequest) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.api_url);
        let body = self.build_body(request);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion.first_content().ok_or_else(|| {
            AppError::Malformed("OpenRouter response contained no choices".to_string())
        })?;

        tracing::debug!(
            model = %self.model,
            provider = "openrouter",
            reply = %content,
            "Completion received"
        );

        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}
