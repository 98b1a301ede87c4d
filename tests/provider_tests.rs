use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cinemood_api::{
    config::Config,
    error::AppError,
    services::providers::{
        openrouter::OpenRouterProvider, tmdb::TmdbProvider, CatalogProvider, CompletionRequest,
        DiscoverQuery, LlmProvider,
    },
};

fn llm_config(server: &MockServer) -> Config {
    Config {
        openrouter_api_key: Some("sk-or-test".to_string()),
        openrouter_api_url: server.uri(),
        llm_timeout_secs: 1,
        ..Config::default()
    }
}

fn tmdb_config(server: &MockServer) -> Config {
    Config {
        tmdb_api_key: Some("tmdb-test".to_string()),
        tmdb_api_url: server.uri(),
        tmdb_timeout_secs: 1,
        ..Config::default()
    }
}

fn prompt() -> CompletionRequest {
    CompletionRequest {
        system: "You are a mood-to-genre prediction assistant.".to_string(),
        prompt: "User's mood: happy".to_string(),
        temperature: 0.3,
        max_tokens: 50,
    }
}

#[tokio::test]
async fn test_openrouter_sends_credentials_and_attribution() {
    let server = MockServer::start().await;
    let config = llm_config(&server);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-or-test"))
        .and(header("HTTP-Referer", config.openrouter_referer.as_str()))
        .and(header("X-Title", config.openrouter_title.as_str()))
        .and(body_partial_json(json!({
            "model": config.llm_model,
            "max_tokens": 50,
            "messages": [
                { "role": "system", "content": "You are a mood-to-genre prediction assistant." },
                { "role": "user", "content": "User's mood: happy" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": " Comedy \n" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenRouterProvider::from_config(&config).unwrap().unwrap();
    let reply = provider.complete(prompt()).await.unwrap();
    assert_eq!(reply.trim(), "Comedy");
}

#[tokio::test]
async fn test_openrouter_error_status_and_empty_choices() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let provider = OpenRouterProvider::from_config(&llm_config(&server))
        .unwrap()
        .unwrap();

    let rejected = provider.complete(prompt()).await.unwrap_err();
    assert!(matches!(
        rejected,
        AppError::UpstreamStatus { status: 401, .. }
    ));
    assert!(!rejected.is_retryable());

    let empty = provider.complete(prompt()).await.unwrap_err();
    assert!(matches!(empty, AppError::Malformed(_)));
}

#[tokio::test]
async fn test_tmdb_discover_query_and_partial_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .and(query_param("api_key", "tmdb-test"))
        .and(query_param("with_genres", "878"))
        .and(query_param("language", "ja"))
        .and(query_param("sort_by", "popularity.desc"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "results": [
                { "id": 1, "title": "Akira", "release_date": "1988-07-16" },
                { "id": 2, "overview": "missing a title" },
                { "id": 3, "title": "Paprika", "poster_path": null }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = TmdbProvider::from_config(&tmdb_config(&server))
        .unwrap()
        .unwrap();
    let movies = provider
        .discover(&DiscoverQuery::most_popular(878, "ja"))
        .await
        .unwrap();

    let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["Akira", "Paprika"]);
}

#[tokio::test]
async fn test_tmdb_slow_response_is_a_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "results": [] }))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let provider = TmdbProvider::from_config(&tmdb_config(&server))
        .unwrap()
        .unwrap();
    let error = provider
        .discover(&DiscoverQuery::most_popular(18, "en"))
        .await
        .unwrap_err();

    assert!(error.is_timeout());
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_tmdb_server_error_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/42"))
        .and(query_param("append_to_response", "credits"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let provider = TmdbProvider::from_config(&tmdb_config(&server))
        .unwrap()
        .unwrap();
    let error = provider.movie_details(42).await.unwrap_err();

    assert!(matches!(error, AppError::UpstreamStatus { status: 502, .. }));
    assert!(error.is_retryable());
}
