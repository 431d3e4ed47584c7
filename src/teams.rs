//! Teams metadata extraction.
//!
//! Accessor-style helpers over the raw activity: every lookup returns a
//! default (empty string) on a missing field or a failed remote call,
//! never an error. The submit flow must survive any shape of activity
//! the channel sends.

use tracing::warn;

use crate::connector::Connector;
use crate::schema::Activity;

// ── Team context ────────────────────────────────────────────────────

/// Team/channel metadata for one submission. Best-effort: fields are
/// empty strings when the team-details lookup fails (e.g. personal
/// chat, where there is no team).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamContext {
    pub tenant_id: String,
    pub group_id: String,
    pub team_id: String,
    pub channel_id: String,
    pub service_url: String,
}

/// Fetch team details through the connector and combine them with the
/// activity's own channel data. Never fails; a lookup error degrades to
/// an all-empty context.
pub async fn team_context(connector: &dyn Connector, activity: &Activity) -> TeamContext {
    let service_url = activity.service_url.clone().unwrap_or_default();
    let channel_id = conversation_id(activity);

    let team_id = channel_data_id(activity, "team");
    let tenant_id = channel_data_id(activity, "tenant");

    if team_id.is_empty() || service_url.is_empty() {
        return TeamContext {
            tenant_id,
            channel_id,
            service_url,
            ..TeamContext::default()
        };
    }

    match connector.team_details(&service_url, &team_id).await {
        Ok(details) => TeamContext {
            tenant_id,
            group_id: details.aad_group_id.unwrap_or_default(),
            team_id: details.id.unwrap_or_default(),
            channel_id,
            service_url,
        },
        Err(e) => {
            warn!(error = %e, team_id, "team details lookup failed; using empty context");
            TeamContext::default()
        }
    }
}

/// Pull `channelData.<section>.id` out of the Teams envelope.
fn channel_data_id(activity: &Activity, section: &str) -> String {
    activity
        .channel_data
        .as_ref()
        .and_then(|d| d.get(section))
        .and_then(|s| s.get("id"))
        .and_then(|id| id.as_str())
        .unwrap_or_default()
        .to_string()
}

// ── Sender and ids ──────────────────────────────────────────────────

/// Display identity of the activity's sender.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub aad_object_id: String,
}

/// Extract the sender's display name and AAD object id. No remote call.
pub fn user_info(activity: &Activity) -> UserInfo {
    let from = activity.from.as_ref();
    UserInfo {
        name: from
            .and_then(|f| f.name.clone())
            .unwrap_or_default(),
        aad_object_id: from
            .and_then(|f| f.aad_object_id.clone())
            .unwrap_or_default(),
    }
}

/// Conversation, message, and sender ids for one activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityIds {
    pub channel_id: String,
    pub message_id: String,
    pub user_id: String,
}

/// Extract the ids straight off the activity, defaulting to empty.
pub fn activity_ids(activity: &Activity) -> ActivityIds {
    ActivityIds {
        channel_id: conversation_id(activity),
        message_id: activity.id.clone().unwrap_or_default(),
        user_id: activity
            .from
            .as_ref()
            .and_then(|f| f.id.clone())
            .unwrap_or_default(),
    }
}

fn conversation_id(activity: &Activity) -> String {
    activity
        .conversation
        .as_ref()
        .and_then(|c| c.id.clone())
        .unwrap_or_default()
}

// ── Form data ───────────────────────────────────────────────────────

/// The submitted form fields. Missing keys become empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub title: String,
    pub description: String,
}

impl FormData {
    /// Extract `title` / `description` from a card submission value.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let field = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Self {
            title: field("title"),
            description: field("description"),
        }
    }
}

// ── Command extraction ──────────────────────────────────────────────

/// Strip the leading mention token from a message: split on the first
/// whitespace and take the trimmed remainder. Text with no whitespace
/// yields an empty command.
pub fn extract_command(text: &str) -> String {
    match text.trim().split_once(char::is_whitespace) {
        Some((_mention, rest)) => rest.trim().to_string(),
        None => String::new(),
    }
}
