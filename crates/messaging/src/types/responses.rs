use serde::Serialize;
use teamlink_provision::ProvisionedChat;

/// The single response frame shape: either a failure message or the list
/// of created chats in request order.
#[derive(Debug, Clone, Serialize)]
pub struct HostResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<ProvisionedChat>>,
}

impl HostResponse {
    pub fn ok(result: Vec<ProvisionedChat>) -> Self {
        Self {
            success: true,
            message: Some("Chats created successfully".to_string()),
            result: Some(result),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            result: None,
        }
    }
}
