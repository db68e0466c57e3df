//! Thin client for the Microsoft Graph chat endpoints.
//!
//! Every operation is a single bearer-authenticated HTTP call returning
//! `Result<T, GraphError>`. The client never retries and never panics;
//! abort-versus-continue decisions belong to the provisioning workflow.

use serde::Deserialize;
use serde_json::json;
use teamlink_config::GraphConfig;
use thiserror::Error;
use tracing::{debug, warn};

const AAD_MEMBER_TYPE: &str = "#microsoft.graph.aadUserConversationMember";
const USER_BIND_V1: &str = "https://graph.microsoft.com/v1.0/users";
const USER_BIND_BETA: &str = "https://graph.microsoft.com/beta/users";

/// Members added after creation see the full chat history.
const FULL_HISTORY_START: &str = "0001-01-01T00:00:00Z";

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph returned {status} for {operation}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("graph request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("graph response for {operation} is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMember {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatList {
    #[serde(default)]
    pub value: Vec<Chat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberList {
    #[serde(default)]
    pub value: Vec<ChatMember>,
}

#[derive(Debug, Clone, Deserialize)]
struct CreatedMessage {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    pub fn new(config: &GraphConfig) -> Result<Self, GraphError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .user_agent("teamlink-host")
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a group chat with a single owner member. Only HTTP 201 counts
    /// as success.
    pub async fn create_chat(
        &self,
        token: &str,
        topic: &str,
        owner_email: &str,
    ) -> Result<Chat, GraphError> {
        let body = json!({
            "chatType": "group",
            "topic": topic,
            "members": [
                {
                    "@odata.type": AAD_MEMBER_TYPE,
                    "roles": ["owner"],
                    "user@odata.bind": format!("{USER_BIND_V1}/{owner_email}"),
                }
            ],
        });

        let response = self
            .http
            .post(format!("{}/chats", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let response = expect_status("create_chat", &[201], response).await?;
        let chat: Chat = response.json().await?;
        debug!(chat_id = %chat.id, topic, "chat created");
        Ok(chat)
    }

    /// Add one member with the `guest` role and full-history visibility.
    /// Graph answers 201 here, but some tenants return 200.
    pub async fn add_member(
        &self,
        token: &str,
        chat_id: &str,
        member_email: &str,
    ) -> Result<ChatMember, GraphError> {
        let body = json!({
            "@odata.type": AAD_MEMBER_TYPE,
            "roles": ["guest"],
            "visibleHistoryStartDateTime": FULL_HISTORY_START,
            "user@odata.bind": format!("{USER_BIND_BETA}/{member_email}"),
        });

        let response = self
            .http
            .post(format!("{}/chats/{chat_id}/members", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let response = expect_status("add_member", &[200, 201], response).await?;
        let member: ChatMember = response.json().await?;
        debug!(chat_id, member_email, "member added");
        Ok(member)
    }

    pub async fn list_chats(&self, token: &str) -> Result<ChatList, GraphError> {
        let response = self
            .http
            .get(format!("{}/chats", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        let response = expect_status("list_chats", &[200], response).await?;
        Ok(response.json().await?)
    }

    pub async fn list_members(&self, token: &str, chat_id: &str) -> Result<MemberList, GraphError> {
        let response = self
            .http
            .get(format!("{}/chats/{chat_id}/members", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        let response = expect_status("list_members", &[200], response).await?;
        Ok(response.json().await?)
    }

    /// Post an HTML anchor to the chat and pin the resulting message. The
    /// two calls are not atomic: a pin failure leaves the message posted.
    pub async fn send_pinned_link(
        &self,
        token: &str,
        chat_id: &str,
        link: &str,
        key: &str,
    ) -> Result<(), GraphError> {
        let content = format!("<p><a href='{link}'>{key}</a></p>");
        let message = self.send_html(token, chat_id, &content).await?;
        let message_id = message.id.ok_or(GraphError::MissingField {
            operation: "send_pinned_link",
            field: "id",
        })?;

        let response = self
            .http
            .post(format!(
                "{}/chats/{chat_id}/messages/{message_id}/pin",
                self.base_url
            ))
            .bearer_auth(token)
            .send()
            .await?;
        expect_status("pin_message", &[201, 204], response).await?;
        debug!(chat_id, message_id, "issue link pinned");
        Ok(())
    }

    /// Post the templated greeting addressed to the issue assignee.
    pub async fn send_greeting(
        &self,
        token: &str,
        chat_id: &str,
        issue_title: &str,
        assignee: Option<&str>,
        assignee_email: Option<&str>,
    ) -> Result<(), GraphError> {
        let name = greeting_display_name(assignee, assignee_email);
        let content = format!(
            "<p>Hello {name},</p><p>Please take a look at {issue_title}.</p><p>Thanks!</p>"
        );
        self.send_html(token, chat_id, &content).await?;
        debug!(chat_id, "greeting sent");
        Ok(())
    }

    async fn send_html(
        &self,
        token: &str,
        chat_id: &str,
        content: &str,
    ) -> Result<CreatedMessage, GraphError> {
        let body = json!({
            "body": {
                "contentType": "html",
                "content": content,
            },
        });

        let response = self
            .http
            .post(format!("{}/chats/{chat_id}/messages", self.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let response = expect_status("send_message", &[201], response).await?;
        Ok(response.json().await?)
    }
}

/// Prefer the assignee display name; fall back to the local part of the
/// assignee email.
pub fn greeting_display_name(assignee: Option<&str>, assignee_email: Option<&str>) -> String {
    if let Some(name) = assignee.filter(|name| !name.trim().is_empty()) {
        return name.trim().to_string();
    }
    assignee_email
        .and_then(|email| email.split('@').next())
        .filter(|local| !local.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "there".to_string())
}

async fn expect_status(
    operation: &'static str,
    accepted: &[u16],
    response: reqwest::Response,
) -> Result<reqwest::Response, GraphError> {
    let status = response.status().as_u16();
    if accepted.contains(&status) {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(operation, status, body, "graph call rejected");
    Err(GraphError::Status {
        operation,
        status,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::greeting_display_name;

    #[test]
    fn display_name_prefers_assignee() {
        assert_eq!(
            greeting_display_name(Some("Alice"), Some("alice@x.com")),
            "Alice"
        );
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        assert_eq!(greeting_display_name(None, Some("alice@x.com")), "alice");
        assert_eq!(
            greeting_display_name(Some("   "), Some("bob@y.org")),
            "bob"
        );
    }

    #[test]
    fn display_name_has_a_neutral_fallback() {
        assert_eq!(greeting_display_name(None, None), "there");
    }
}
