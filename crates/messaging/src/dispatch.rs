use serde_json::Value;
use teamlink_provision::{ChatProvisioner, ChatSpec, ProvisionError};
use tracing::{error, info, warn};

use crate::sanitize::sanitize_chat_name;
use crate::types::{CreateSelectedChatsRequest, HostResponse, Issue};

pub const ACTION_CREATE_SELECTED_CHATS: &str = "createSelectedChats";

/// Turns one decoded request frame into one response frame. All failures
/// come back as `{success:false}` responses; nothing here crashes the host
/// loop.
pub struct Dispatcher {
    provisioner: ChatProvisioner,
}

impl Dispatcher {
    pub fn new(provisioner: ChatProvisioner) -> Self {
        Self { provisioner }
    }

    pub async fn handle(&self, request: Value) -> HostResponse {
        let action = request
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match action.as_str() {
            ACTION_CREATE_SELECTED_CHATS => self.create_selected_chats(request).await,
            other => {
                warn!(action = other, "rejecting unrecognized action");
                HostResponse::failure(format!("Unknown action: {other}"))
            }
        }
    }

    async fn create_selected_chats(&self, request: Value) -> HostResponse {
        let request: CreateSelectedChatsRequest = match serde_json::from_value(request) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "request payload failed to decode");
                return HostResponse::failure(format!("Malformed request: {error}"));
            }
        };

        if let Err(error) = request.validate() {
            warn!(%error, "rejecting incomplete batch request");
            return HostResponse::failure(error.to_string());
        }
        let owner_email = request.owner_email.as_deref().unwrap_or_default();

        info!(
            issues = request.selected_issues.len(),
            owner = owner_email,
            members = request.member_emails.len(),
            "processing batch"
        );

        let mut results = Vec::new();
        for issue in &request.selected_issues {
            let spec = chat_spec_for_issue(issue, owner_email, &request.member_emails);
            match self.provisioner.provision(&spec).await {
                Ok(report) => {
                    for failure in &report.member_failures {
                        warn!(
                            chat_id = %report.chat.id,
                            email = %failure.email,
                            error = %failure.error,
                            "member missing from created chat"
                        );
                    }
                    for failure in &report.message_failures {
                        warn!(
                            chat_id = %report.chat.id,
                            step = ?failure.step,
                            error = %failure.error,
                            "message delivery incomplete"
                        );
                    }
                    results.push(report.chat);
                }
                Err(ProvisionError::Auth(auth_error)) => {
                    // Without a credential no later issue can succeed
                    // either; abort the rest of the batch.
                    error!(%auth_error, "aborting batch, no credential");
                    return HostResponse::failure(auth_error.to_string());
                }
                Err(provision_error) => {
                    error!(title = %issue.title, %provision_error, "skipping issue");
                }
            }
        }

        if results.is_empty() {
            return HostResponse::failure("Failed to create any chats");
        }
        HostResponse::ok(results)
    }
}

fn chat_spec_for_issue(issue: &Issue, owner_email: &str, member_emails: &[String]) -> ChatSpec {
    let mut members = member_emails.to_vec();
    if let Some(email) = issue
        .assignee_email
        .as_ref()
        .filter(|email| !email.is_empty())
    {
        if !members.contains(email) {
            members.push(email.clone());
        }
    }

    ChatSpec {
        name: sanitize_chat_name(&issue.title),
        owner_email: owner_email.to_string(),
        member_emails: members,
        issue_link: issue.link.clone(),
        issue_key: issue.key.clone(),
        issue_title: (!issue.title.is_empty()).then(|| issue.title.clone()),
        assignee: issue.assignee.clone(),
        assignee_email: issue.assignee_email.clone(),
    }
}
