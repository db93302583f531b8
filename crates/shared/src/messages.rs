use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An entry of the store's message feed.
///
/// `technical` entries describe protocol or infrastructure failures, as opposed to
/// business validation results attached to a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalMessage {
    pub id: Uuid,
    pub text: String,
    pub technical: bool,
    pub target: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TechnicalMessage {
    pub fn technical(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            technical: true,
            target: None,
            created_at: Utc::now(),
        }
    }

    pub fn business(text: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            technical: false,
            target: Some(target.into()),
            created_at: Utc::now(),
        }
    }
}
