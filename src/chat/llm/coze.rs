//! Coze bot adapter (open_api v2 chat).
//!
//! Coze takes the latest user turn as `query` and everything before it as
//! `chat_history`, and reports failures through `msg` rather than an error
//! object.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use uuid::Uuid;

use crate::error::Error;
use crate::Result;

use super::types::{http_error, CozeRequest, CozeResponse};
use super::{ChatAdapter, ChatRequest};

const COZE_API_URL: &str = "https://api.coze.cn/open_api/v2";

#[derive(Clone)]
pub struct Coze {
    client: Client,
    /// Stable end-user id for this process
    user: String,
}

impl Coze {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            user: Uuid::new_v4().simple().to_string(),
        }
    }

    fn build_url(&self, request: &ChatRequest<'_>) -> String {
        let configured = request.participant.base_url.trim();
        let base = if configured.is_empty() { COZE_API_URL } else { configured };
        format!("{}/chat", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatAdapter for Coze {
    fn name(&self) -> &str {
        "CoZe"
    }

    async fn send_chat(&self, request: &ChatRequest<'_>) -> Result<String> {
        let (last, earlier) = request
            .messages
            .split_last()
            .ok_or_else(|| Error::provider(self.name(), "no messages to send"))?;

        // The Coze bot id travels in `api_version`; the participant id is the fallback.
        let participant = request.participant;
        let bot_id = participant
            .api_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(participant.id.as_str());

        let body = CozeRequest {
            bot_id,
            user: &self.user,
            query: &last.content,
            chat_history: earlier,
            stream: false,
        };

        debug!("CoZe request for bot {} with {} history messages", bot_id, earlier.len());

        let mut req = self.client.post(self.build_url(request)).json(&body);
        if let Some(key) = participant.credential().api_key() {
            req = req.bearer_auth(key);
        }
        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("CoZe responded {} ({} bytes)", status, text.len());

        let parsed: CozeResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(Error::Json(e)),
            Err(_) => return Err(http_error(status, &text)),
        };

        if parsed.msg == "success" {
            return parsed
                .messages
                .into_iter()
                .find(|m| m.kind == "answer" && !m.content.is_empty())
                .map(|m| m.content)
                .ok_or_else(|| Error::provider(self.name(), "empty answer"));
        }
        if !parsed.msg.is_empty() {
            return Err(Error::provider(self.name(), parsed.msg));
        }

        match parsed.error {
            Some(err) => Err(Error::provider(self.name(), err.message())),
            None if status.is_success() => Err(Error::Other("response contained no answer".to_string())),
            None => Err(http_error(status, &text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::llm::stub;
    use crate::chat::message::{ChatMessage, Role};
    use crate::config::ParticipantConfig;

    fn participant(url: String) -> ParticipantConfig {
        let mut participant = ParticipantConfig::new("p", "CoZe", "");
        participant.base_url = url;
        participant.api_key = "pat".to_string();
        participant.api_version = Some("7350".to_string());
        participant
    }

    #[tokio::test]
    async fn test_answer_message_extracted() {
        let (url, server) = stub::serve_once(
            200,
            r#"{"msg": "success", "messages": [
                {"type": "verbose", "content": "{}"},
                {"type": "answer", "content": "coze answer"}
            ]}"#,
        )
        .await;
        let participant = participant(url);
        let messages = vec![
            ChatMessage::new(Role::System, "sys"),
            ChatMessage::user("earlier"),
            ChatMessage::user("now"),
        ];

        let reply = Coze::new(Client::new())
            .send_chat(&ChatRequest { participant: &participant, messages: &messages })
            .await
            .unwrap();
        assert_eq!(reply, "coze answer");

        let captured = server.await.unwrap();
        assert_eq!(captured.body["bot_id"], "7350");
        assert_eq!(captured.body["query"], "now");
        assert_eq!(captured.body["chat_history"].as_array().unwrap().len(), 2);
        assert_eq!(captured.header("authorization"), Some("Bearer pat"));
    }

    #[tokio::test]
    async fn test_failure_msg_is_provider_error() {
        let (url, _server) = stub::serve_once(200, r#"{"msg": "bot not found", "code": 4000}"#).await;
        let participant = participant(url);
        let messages = vec![ChatMessage::user("now")];

        let err = Coze::new(Client::new())
            .send_chat(&ChatRequest { participant: &participant, messages: &messages })
            .await
            .unwrap_err();
        assert!(err.is_provider());
        assert_eq!(err.to_string(), "bot not found");
    }

    #[tokio::test]
    async fn test_missing_answer() {
        let (url, _server) = stub::serve_once(200, r#"{"msg": "success", "messages": []}"#).await;
        let participant = participant(url);
        let messages = vec![ChatMessage::user("now")];

        let err = Coze::new(Client::new())
            .send_chat(&ChatRequest { participant: &participant, messages: &messages })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "empty answer");
    }

    #[tokio::test]
    async fn test_error_object_is_provider_error() {
        let (url, _server) =
            stub::serve_once(401, r#"{"error": {"message": "invalid api key"}}"#).await;
        let participant = participant(url);
        let messages = vec![ChatMessage::user("now")];

        let err = Coze::new(Client::new())
            .send_chat(&ChatRequest { participant: &participant, messages: &messages })
            .await
            .unwrap_err();
        assert!(err.is_provider());
        assert_eq!(err.to_string(), "invalid api key");
    }

    #[tokio::test]
    async fn test_unreadable_bodies_are_plain_errors() {
        let messages = vec![ChatMessage::user("now")];

        let (url, _server) = stub::serve_once(502, "<html>Bad Gateway</html>").await;
        let gateway = participant(url);
        let err = Coze::new(Client::new())
            .send_chat(&ChatRequest { participant: &gateway, messages: &messages })
            .await
            .unwrap_err();
        assert!(!err.is_provider());
        assert_eq!(err.to_string(), "HTTP 502: <html>Bad Gateway</html>");

        let (url, _server) = stub::serve_once(200, "not json").await;
        let garbled = participant(url);
        let err = Coze::new(Client::new())
            .send_chat(&ChatRequest { participant: &garbled, messages: &messages })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn test_no_key_sends_no_authorization() {
        let (url, server) = stub::serve_once(
            200,
            r#"{"msg": "success", "messages": [{"type": "answer", "content": "ok"}]}"#,
        )
        .await;
        let mut participant = participant(url);
        participant.api_key.clear();
        let messages = vec![ChatMessage::user("now")];

        Coze::new(Client::new())
            .send_chat(&ChatRequest { participant: &participant, messages: &messages })
            .await
            .unwrap();
        assert_eq!(server.await.unwrap().header("authorization"), None);
    }
}
