use serde::{Deserialize, Serialize};

/// Document stored in the tokens collection. The token value doubles as the
/// document identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Missing in a stored document reads as empty; the registry skips those.
    #[serde(default)]
    pub token: String,
}

impl TokenRecord {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.token
    }
}
