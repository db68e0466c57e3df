use serde::Deserialize;

use super::ValidationError;

/// One issue-tracker entry selected in the extension. Pure input record,
/// never persisted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub assignee_email: Option<String>,
}

/// The `createSelectedChats` batch payload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSelectedChatsRequest {
    #[serde(default)]
    pub selected_issues: Vec<Issue>,
    #[serde(default)]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub member_emails: Vec<String>,
}

impl CreateSelectedChatsRequest {
    /// Reject incomplete batches before any Graph traffic happens.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.selected_issues.is_empty() {
            return Err(ValidationError::NoIssues);
        }
        if self
            .owner_email
            .as_deref()
            .map_or(true, |owner| owner.trim().is_empty())
        {
            return Err(ValidationError::MissingOwner);
        }
        if self.member_emails.is_empty() {
            return Err(ValidationError::NoMembers);
        }
        Ok(())
    }
}
