//! Bot Framework activity wire types.
//!
//! Only the slice of the Activity schema this bot actually reads or
//! writes. Everything is optional with camelCase wire names; unknown
//! fields from the channel are ignored, absent fields default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity type for plain messages.
pub const ACTIVITY_TYPE_MESSAGE: &str = "message";

/// One inbound or outbound event in a bot conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<ChannelAccount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChannelAccount>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Adaptive Card submission data, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    /// Teams-specific envelope (team id, tenant id, …).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<serde_json::Value>,
}

impl Activity {
    /// A plain-text message activity.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            activity_type: ACTIVITY_TYPE_MESSAGE.to_string(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A message activity carrying a single card attachment.
    pub fn with_attachment(attachment: Attachment) -> Self {
        Self {
            activity_type: ACTIVITY_TYPE_MESSAGE.to_string(),
            attachments: vec![attachment],
            ..Self::default()
        }
    }

    /// The activity id used when replacing or deleting the card this
    /// activity responded to: the replied-to id, falling back to the
    /// activity's own id.
    pub fn target_activity_id(&self) -> Option<&str> {
        self.reply_to_id.as_deref().or(self.id.as_deref())
    }
}

/// A user or bot account on a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aad_object_id: Option<String>,
}

/// The conversation an activity belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// A card attachment on a message activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attachment {
    pub content_type: String,
    pub content: serde_json::Value,
}

/// Team details returned by `GET {serviceUrl}/v3/teams/{teamId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aad_group_id: Option<String>,
}

/// Id assigned by the connector when an activity is sent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceResponse {
    #[serde(default)]
    pub id: String,
}
