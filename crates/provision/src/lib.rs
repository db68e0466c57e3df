//! Sequential provisioning workflow: token, chat, members, messages.
//!
//! Every step runs in order with no parallelism. Chat creation failure
//! aborts the whole attempt; member adds and message delivery are
//! best-effort, with failures collected into the report instead of being
//! dropped into the log alone.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use teamlink_auth::{AuthError, TokenProvider};
use teamlink_config::RetryConfig;
use teamlink_graph::{GraphClient, GraphError};
use thiserror::Error;
use tracing::{info, warn};

const TEAMS_CHAT_URL_BASE: &str = "https://teams.microsoft.com/l/chat";

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("chat creation failed: {0}")]
    ChatCreate(#[source] GraphError),
}

/// Everything needed to provision one chat.
#[derive(Debug, Clone)]
pub struct ChatSpec {
    pub name: String,
    pub owner_email: String,
    pub member_emails: Vec<String>,
    pub issue_link: Option<String>,
    pub issue_key: Option<String>,
    pub issue_title: Option<String>,
    pub assignee: Option<String>,
    pub assignee_email: Option<String>,
}

/// The record handed back to the extension for one created chat.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedChat {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub members: Vec<String>,
    #[serde(rename = "webUrl")]
    pub web_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberFailure {
    pub email: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStep {
    PinnedLink,
    Greeting,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageFailure {
    pub step: MessageStep,
    pub error: String,
}

/// Outcome of a provisioning run whose chat creation succeeded. Recorded
/// failures did not stop the run; the chat and any members that did attach
/// are already committed on the Graph side.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub chat: ProvisionedChat,
    pub member_failures: Vec<MemberFailure>,
    pub message_failures: Vec<MessageFailure>,
}

/// Bounded retry with doubling backoff, applied to message delivery. Chat
/// creation is read-after-write laggy on the Graph side, so the first send
/// into a fresh chat can 404.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    /// Delay before the attempt after `attempt` (1-based) failed.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

pub struct ChatProvisioner {
    tokens: Arc<dyn TokenProvider>,
    graph: GraphClient,
    retry: RetryPolicy,
}

impl ChatProvisioner {
    pub fn new(tokens: Arc<dyn TokenProvider>, graph: GraphClient, retry: RetryPolicy) -> Self {
        Self {
            tokens,
            graph,
            retry,
        }
    }

    /// Provision one chat. `AuthError` propagates unchanged; a chat-creation
    /// failure aborts with no partial result; everything after that point is
    /// best-effort and recorded in the report.
    pub async fn provision(&self, spec: &ChatSpec) -> Result<ProvisionReport, ProvisionError> {
        let token = self.tokens.get_token().await?;

        let chat = self
            .graph
            .create_chat(&token, &spec.name, &spec.owner_email)
            .await
            .map_err(ProvisionError::ChatCreate)?;
        info!(chat_id = %chat.id, name = %spec.name, "chat created");

        let mut member_failures = Vec::new();
        for email in &spec.member_emails {
            if let Err(error) = self.graph.add_member(&token, &chat.id, email).await {
                warn!(chat_id = %chat.id, email, %error, "member add failed");
                member_failures.push(MemberFailure {
                    email: email.clone(),
                    error: error.to_string(),
                });
            }
        }

        let mut message_failures = Vec::new();
        if let (Some(link), Some(key), Some(title)) = (
            spec.issue_link.as_deref(),
            spec.issue_key.as_deref(),
            spec.issue_title.as_deref(),
        ) {
            if let Err(error) = self
                .with_retry("send_pinned_link", || {
                    self.graph.send_pinned_link(&token, &chat.id, link, key)
                })
                .await
            {
                warn!(chat_id = %chat.id, %error, "pinned link delivery failed");
                message_failures.push(MessageFailure {
                    step: MessageStep::PinnedLink,
                    error: error.to_string(),
                });
            }

            if let Err(error) = self
                .with_retry("send_greeting", || {
                    self.graph.send_greeting(
                        &token,
                        &chat.id,
                        title,
                        spec.assignee.as_deref(),
                        spec.assignee_email.as_deref(),
                    )
                })
                .await
            {
                warn!(chat_id = %chat.id, %error, "greeting delivery failed");
                message_failures.push(MessageFailure {
                    step: MessageStep::Greeting,
                    error: error.to_string(),
                });
            }
        }

        Ok(ProvisionReport {
            chat: ProvisionedChat {
                web_url: format!("{TEAMS_CHAT_URL_BASE}/{}/0", chat.id),
                id: chat.id,
                name: spec.name.clone(),
                owner: spec.owner_email.clone(),
                members: spec.member_emails.clone(),
            },
            member_failures,
            message_failures,
        })
    }

    async fn with_retry<F, Fut>(&self, operation: &str, mut call: F) -> Result<(), GraphError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<(), GraphError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(()) => return Ok(()),
                Err(error) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff_delay(attempt);
                    warn!(operation, attempt, ?delay, %error, "retrying after failure");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
