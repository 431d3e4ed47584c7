//! Logic App notifier — one POST per submission, no retries.

use serde::Serialize;
use tracing::error;

use crate::teams::{ActivityIds, FormData, TeamContext, UserInfo};

/// The flat payload the Logic App trigger expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPayload {
    pub team_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub user_id: String,
    pub user_name: String,
    pub title: String,
    pub description: String,
    /// Always empty. The deployed workflow stamps its own receive time;
    /// populating this field here would change its behavior.
    pub timestamp: String,
}

impl OutboundPayload {
    /// Assemble the payload from the four per-submission sources.
    pub fn assemble(
        team: &TeamContext,
        user: &UserInfo,
        ids: &ActivityIds,
        form: &FormData,
    ) -> Self {
        Self {
            team_id: team.team_id.clone(),
            channel_id: ids.channel_id.clone(),
            message_id: ids.message_id.clone(),
            user_id: ids.user_id.clone(),
            user_name: user.name.clone(),
            title: form.title.clone(),
            description: form.description.clone(),
            timestamp: String::new(),
        }
    }
}

/// Outcome of one notify attempt. `detail` holds the raw response body
/// on success, or a descriptive error otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyResult {
    pub success: bool,
    pub detail: String,
}

impl NotifyResult {
    fn ok(detail: String) -> Self {
        Self {
            success: true,
            detail,
        }
    }

    fn err(detail: String) -> Self {
        Self {
            success: false,
            detail,
        }
    }
}

/// Sends submissions to the configured Logic App endpoint. Exactly one
/// attempt per call; failure is reported, never retried.
pub struct Notifier {
    client: reqwest::Client,
    endpoint: String,
}

impl Notifier {
    /// `endpoint` may be empty — notify() then fails without touching
    /// the network.
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// POST the payload as JSON. 200 means delivered; anything else is
    /// a failure with a descriptive message.
    pub async fn notify(&self, payload: &OutboundPayload) -> NotifyResult {
        if self.endpoint.is_empty() {
            return NotifyResult::err("LOGICAPP_ENDPOINT not configured".to_string());
        }

        let resp = match self.client.post(&self.endpoint).json(payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let msg = format!("Logic App connection error: {e}");
                error!("{msg}");
                return NotifyResult::err(msg);
            }
        };

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::OK {
            NotifyResult::ok(body)
        } else {
            let msg = format!(
                "Logic App request failed (HTTP {}): {}",
                status.as_u16(),
                body
            );
            error!("{msg}");
            NotifyResult::err(msg)
        }
    }
}
