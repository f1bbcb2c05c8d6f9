use serde::{Deserialize, Serialize};

/// Provider-neutral notification payload. Optional fields are left out of the
/// serialized form entirely when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    #[serde(rename = "click_action", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            link: None,
            image: None,
        }
    }

    /// Empty strings count as "no link".
    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = link.filter(|l| !l.trim().is_empty());
        self
    }

    /// Empty strings count as "no image".
    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image.filter(|i| !i.trim().is_empty());
        self
    }
}

/// Outcome of a single token within a multicast send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub token: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResponse {
    pub fn delivered(token: impl Into<String>, message_id: Option<String>) -> Self {
        Self {
            token: token.into(),
            success: true,
            message_id,
            error: None,
        }
    }

    pub fn failed(token: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub responses: Vec<SendResponse>,
}

impl DeliveryReport {
    pub fn from_responses(responses: Vec<SendResponse>) -> Self {
        let success_count = responses.iter().filter(|r| r.success).count();
        Self {
            success_count,
            failure_count: responses.len() - success_count,
            responses,
        }
    }
}
