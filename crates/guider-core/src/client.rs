use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::normalize::{normalize, normalize_stored};
use crate::state::{ChatTurn, SessionId};

#[derive(Serialize)]
struct ChatRequest<'a> {
    chat_session_id: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    response: Value,
}

/// One entry in the history sidebar
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionSummary {
    pub chat_session_id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize)]
struct SessionsResponse {
    #[serde(default)]
    sessions: Vec<SessionSummary>,
}

#[derive(Deserialize)]
struct StoredMessage {
    role: String,
    #[serde(default)]
    content: Value,
}

#[derive(Deserialize)]
struct SessionMessagesResponse {
    #[serde(default)]
    messages: Vec<StoredMessage>,
}

impl StoredMessage {
    fn into_turn(self) -> ChatTurn {
        let text = match &self.content {
            Value::String(s) => s.clone(),
            other => normalize(other),
        };
        if self.role == "ai" {
            ChatTurn::settled_assistant(normalize_stored(&text))
        } else {
            ChatTurn::user(text)
        }
    }
}

/// HTTP client for the advising backend
#[derive(Clone)]
pub struct AdvisorClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl AdvisorClient {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Session history is only stored for signed-in users
    pub fn has_auth(&self) -> bool {
        self.auth_token.is_some()
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends one message and returns the normalized assistant reply
    pub async fn send_message(&self, session_id: &SessionId, message: &str) -> ClientResult<String> {
        let url = format!("{}/chat/response", self.base_url);
        let request = ChatRequest {
            chat_session_id: session_id.as_str(),
            message,
        };

        tracing::info!(session = %session_id, "sending chat message");
        let response = self
            .authorize(self.client.post(&url))
            .json(&request)
            .send()
            .await?;

        let body = Self::success_body(response).await?;
        let chat_response: ChatResponse = serde_json::from_str(&body)?;
        Ok(normalize(&chat_response.response))
    }

    pub async fn list_sessions(&self) -> ClientResult<Vec<SessionSummary>> {
        let url = format!("{}/chat/sessions", self.base_url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let body = Self::success_body(response).await?;
        let sessions: SessionsResponse = serde_json::from_str(&body)?;
        tracing::debug!(count = sessions.sessions.len(), "loaded session list");
        Ok(sessions.sessions)
    }

    /// Fetches a stored conversation as settled turns
    pub async fn fetch_session(&self, session_id: &SessionId) -> ClientResult<Vec<ChatTurn>> {
        let url = format!("{}/chat/sessions/{}", self.base_url, session_id);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let body = Self::success_body(response).await?;
        let stored: SessionMessagesResponse = serde_json::from_str(&body)?;
        tracing::info!(session = %session_id, messages = stored.messages.len(), "loaded session history");
        Ok(stored.messages.into_iter().map(StoredMessage::into_turn).collect())
    }

    async fn success_body(response: Response) -> ClientResult<String> {
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "advising backend returned an error");
            // The status alone is enough when the error body cannot be read
            let text = response.text().await.unwrap_or_default();
            let message = if text.trim().is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                text
            };
            return Err(ClientError::Status(message));
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sid() -> SessionId {
        SessionId::from("session-1".to_string())
    }

    #[tokio::test]
    async fn test_send_message_plain_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/response"))
            .and(body_json(serde_json::json!({
                "chat_session_id": "session-1",
                "message": "What GE courses should I take?"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "response": "Try **Area D**." })),
            )
            .mount(&server)
            .await;

        let client = AdvisorClient::new(&server.uri(), None);
        let reply = client
            .send_message(&sid(), "What GE courses should I take?")
            .await
            .expect("send message");
        assert_eq!(reply, "Try **Area D**.");
    }

    #[tokio::test]
    async fn test_send_message_parts_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/response"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": [{"text": "A"}, {"text": "B"}, {"foo": 1}]
            })))
            .mount(&server)
            .await;

        let client = AdvisorClient::new(&server.uri(), None);
        let reply = client.send_message(&sid(), "hi").await.expect("send message");
        assert_eq!(reply, "A\nB");
    }

    #[tokio::test]
    async fn test_server_error_body_becomes_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/response"))
            .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
            .mount(&server)
            .await;

        let client = AdvisorClient::new(&server.uri(), None);
        let err = client.send_message(&sid(), "hi").await.unwrap_err();
        assert!(matches!(err, ClientError::Status(_)));
        assert_eq!(err.to_string(), "server error");
    }

    #[tokio::test]
    async fn test_server_error_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = AdvisorClient::new(&server.uri(), None);
        let err = client.send_message(&sid(), "hi").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502");
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = AdvisorClient::new(&server.uri(), None);
        let err = client.send_message(&sid(), "hi").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_request_error() {
        // Nothing listens on port 9 on the test machine
        let client = AdvisorClient::new("http://127.0.0.1:9", None);
        let err = client.send_message(&sid(), "hi").await.unwrap_err();
        assert!(matches!(err, ClientError::Request(_)));
    }

    #[tokio::test]
    async fn test_truncated_success_body_is_request_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promises 100 bytes, sends a few, then hangs up
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"resp",
                )
                .await;
            let _ = socket.shutdown().await;
        });

        let client = AdvisorClient::new(&format!("http://{addr}"), None);
        let err = client
            .send_message(&SessionId::from("s-1".to_string()), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Request(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_bearer_token_is_attached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chat/sessions"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sessions": [
                    {"chat_session_id": "s1", "title": "Switching majors"},
                    {"chat_session_id": "s2", "title": "CS prerequisites"}
                ]
            })))
            .mount(&server)
            .await;

        let client = AdvisorClient::new(&server.uri(), Some("secret-token".to_string()));
        assert!(client.has_auth());
        let sessions = client.list_sessions().await.expect("list sessions");
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].title, "Switching majors");
    }

    #[tokio::test]
    async fn test_fetch_session_maps_roles_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chat/sessions/session-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [
                    {"role": "user", "content": "How do I switch majors?"},
                    {"role": "ai", "content": "[{\"text\":\"Talk to an advisor.\"},{\"text\":\"File a petition.\"}]"},
                    {"role": "ai", "content": "Plain answer"}
                ]
            })))
            .mount(&server)
            .await;

        let client = AdvisorClient::new(&format!("{}/", server.uri()), None);
        let turns = client.fetch_session(&sid()).await.expect("fetch session");
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, ChatRole::User);
        assert_eq!(turns[1].role, ChatRole::Assistant);
        assert_eq!(turns[1].content(), "Talk to an advisor.\nFile a petition.");
        assert!(turns[1].is_settled());
        assert_eq!(turns[2].content(), "Plain answer");
    }
}
