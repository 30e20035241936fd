use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Substituted when the service replies 2xx but the answer field is missing
/// or empty. Not treated as an error.
pub const NO_ANSWER_FALLBACK: &str = "No response received.";

#[derive(Serialize)]
struct AskRequest {
    query: String,
}

#[derive(Deserialize)]
struct AskResponse {
    answer: Option<String>,
}

/// HTTP client for the answer service: POSTs a query, gets back an answer.
#[derive(Clone)]
pub struct AskClient {
    client: Client,
    endpoint: String,
}

impl AskClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn ask(&self, query: &str) -> Result<String> {
        let request = AskRequest {
            query: query.to_string(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "ask request failed with status: {}",
                response.status()
            ));
        }

        let ask_response: AskResponse = response.json().await?;
        Ok(extract_answer(ask_response))
    }
}

fn extract_answer(response: AskResponse) -> String {
    match response.answer {
        Some(answer) if !answer.is_empty() => answer,
        _ => NO_ANSWER_FALLBACK.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ChatRole, Session, CONNECT_ERROR_MESSAGE};

    /// Serve exactly one request on a loopback port, replying with the given
    /// status and body. Returns the endpoint URL.
    fn one_shot_server(status: u16, body: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();

        std::thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let response = tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(
                        tiny_http::Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"application/json"[..],
                        )
                        .unwrap(),
                    );
                let _ = request.respond(response);
            }
        });

        format!("http://{}/ask", addr)
    }

    fn test_client(endpoint: &str) -> AskClient {
        AskClient::new(endpoint, std::time::Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_ask_posts_query_and_returns_answer() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();

        let handle = std::thread::spawn(move || {
            let mut request = server.recv().unwrap();
            let mut body = String::new();
            use std::io::Read;
            request.as_reader().read_to_string(&mut body).unwrap();

            let response = tiny_http::Response::from_string(r#"{"answer": "X is Y."}"#);
            request.respond(response).unwrap();
            body
        });

        let client = test_client(&format!("http://{}/ask", addr));
        let answer = client.ask("What is X?").await.unwrap();
        assert_eq!(answer, "X is Y.");

        let received: serde_json::Value =
            serde_json::from_str(&handle.join().unwrap()).unwrap();
        assert_eq!(received, serde_json::json!({ "query": "What is X?" }));
    }

    #[tokio::test]
    async fn test_ask_non_2xx_status_is_an_error() {
        let endpoint = one_shot_server(500, r#"{"detail": "boom"}"#);
        let client = test_client(&endpoint);
        assert!(client.ask("hi").await.is_err());
    }

    #[tokio::test]
    async fn test_ask_unparseable_body_is_an_error() {
        let endpoint = one_shot_server(200, "not json");
        let client = test_client(&endpoint);
        assert!(client.ask("hi").await.is_err());
    }

    #[tokio::test]
    async fn test_ask_missing_answer_falls_back() {
        let endpoint = one_shot_server(200, "{}");
        let client = test_client(&endpoint);
        assert_eq!(client.ask("hi").await.unwrap(), NO_ANSWER_FALLBACK);
    }

    #[tokio::test]
    async fn test_session_round_trip_through_client() {
        let endpoint = one_shot_server(200, r#"{"answer": "X is Y."}"#);
        let client = test_client(&endpoint);

        let mut session = Session::new();
        let query = session.begin_submit(Some("What is X?")).unwrap();
        session.attach(tokio::spawn(async move { client.ask(&query).await }));

        while !session.try_settle().await {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, ChatRole::User);
        assert_eq!(session.messages[0].content, "What is X?");
        assert_eq!(session.messages[1].role, ChatRole::Assistant);
        assert_eq!(session.messages[1].content, "X is Y.");
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_session_failure_round_trip_through_client() {
        let endpoint = one_shot_server(502, "bad gateway");
        let client = test_client(&endpoint);

        let mut session = Session::new();
        let query = session.begin_submit(Some("hi")).unwrap();
        session.attach(tokio::spawn(async move { client.ask(&query).await }));

        while !session.try_settle().await {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].content, CONNECT_ERROR_MESSAGE);
        assert!(!session.is_loading());
    }

    #[test]
    fn test_request_payload_carries_query() {
        let request = AskRequest {
            query: "What is X?".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({ "query": "What is X?" }));
    }

    #[test]
    fn test_answer_extracted_from_response() {
        let response: AskResponse = serde_json::from_str(r#"{"answer": "X is Y."}"#).unwrap();
        assert_eq!(extract_answer(response), "X is Y.");
    }

    #[test]
    fn test_missing_answer_uses_fallback() {
        let response: AskResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(extract_answer(response), NO_ANSWER_FALLBACK);
    }

    #[test]
    fn test_empty_answer_uses_fallback() {
        let response: AskResponse = serde_json::from_str(r#"{"answer": ""}"#).unwrap();
        assert_eq!(extract_answer(response), NO_ANSWER_FALLBACK);
    }

    #[test]
    fn test_extra_fields_ignored() {
        let response: AskResponse =
            serde_json::from_str(r#"{"answer": "ok", "sources": ["a", "b"]}"#).unwrap();
        assert_eq!(extract_answer(response), "ok");
    }
}
