use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Status,
    Progress,
    General,
}

/// Body posted to the notification relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub to: String,
    pub client_name: String,
    pub project_name: String,
    pub update_type: UpdateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub success: bool,
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_relay_field_names() {
        let req = NotificationRequest {
            to: "ana@example.com".into(),
            client_name: "Ana".into(),
            project_name: "Website".into(),
            update_type: UpdateType::Progress,
            old_value: Some("20".into()),
            new_value: Some("50".into()),
            message: None,
        };

        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "to": "ana@example.com",
                "clientName": "Ana",
                "projectName": "Website",
                "updateType": "progress",
                "oldValue": "20",
                "newValue": "50",
            })
        );
    }
}
