//! The bot: one turn per inbound activity.
//!
//! `route()` classifies the activity, the handlers do the work. The
//! submit and cancel paths never let an error escape the turn; the
//! create-form path propagates send failures to the server's error
//! hook.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::cards;
use crate::connector::Connector;
use crate::error::{ConnectorError, Result};
use crate::notifier::{Notifier, NotifyResult, OutboundPayload};
use crate::schema::{ACTIVITY_TYPE_MESSAGE, Activity};
use crate::teams::{self, FormData};

/// Which handler a message activity dispatches to. Classification is
/// total: anything that is not a recognized card action falls through
/// to the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Show the input form. `command` is the text after the mention
    /// token; every command renders the same form.
    CreateForm { command: String },
    /// A form submission carrying the card value.
    Submit(serde_json::Value),
    /// The card's Cancel button.
    Cancel,
}

/// Classify one message activity.
pub fn route(activity: &Activity) -> Route {
    if let Some(value) = &activity.value {
        if value.get("action").and_then(|a| a.as_str()) == Some("cancel") {
            return Route::Cancel;
        }
        // Both keys present counts as a submission, even when empty.
        if value.get("title").is_some() && value.get("description").is_some() {
            return Route::Submit(value.clone());
        }
    }

    let command = teams::extract_command(activity.text.as_deref().unwrap_or(""));
    Route::CreateForm { command }
}

/// The bot itself: a connector back to the channel and a notifier
/// toward the Logic App. No state survives a turn.
pub struct Bot {
    connector: Arc<dyn Connector>,
    notifier: Notifier,
}

impl Bot {
    pub fn new(connector: Arc<dyn Connector>, notifier: Notifier) -> Self {
        Self {
            connector,
            notifier,
        }
    }

    /// Handle one inbound activity. Non-message activities are ignored.
    pub async fn on_turn(&self, activity: &Activity) -> Result<()> {
        if activity.activity_type != ACTIVITY_TYPE_MESSAGE {
            debug!(activity_type = %activity.activity_type, "ignoring non-message activity");
            return Ok(());
        }

        match route(activity) {
            Route::CreateForm { command } => {
                debug!(%command, "showing input form");
                self.create_form(activity).await
            }
            Route::Submit(value) => {
                self.handle_submit(activity, &value).await;
                Ok(())
            }
            Route::Cancel => {
                self.handle_cancel(activity).await;
                Ok(())
            }
        }
    }

    // ── Create form ─────────────────────────────────────────────────

    /// Reply with the input card. Send failures propagate.
    async fn create_form(&self, activity: &Activity) -> Result<()> {
        let (service_url, conversation_id) = address(activity)?;
        let reply = Activity::with_attachment(cards::input_card());
        self.connector
            .send_activity(service_url, conversation_id, &reply)
            .await?;
        Ok(())
    }

    // ── Submit ──────────────────────────────────────────────────────

    /// Forward the submission to the Logic App, then update the card on
    /// success or report the failure as text. Errors are caught here;
    /// this handler never fails the turn.
    async fn handle_submit(&self, activity: &Activity, value: &serde_json::Value) {
        match self.deliver_submission(activity, value).await {
            Ok(result) if result.success => {
                self.update_to_success(activity).await;
            }
            Ok(result) => {
                self.reply_text(
                    activity,
                    &format!("❌ Failed to send to Logic App: {}", result.detail),
                )
                .await;
            }
            Err(e) => {
                error!(error = %e, "submission failed");
                self.reply_text(activity, &format!("❌ Error during submission: {e}"))
                    .await;
            }
        }
    }

    /// Steps 1–6: gather metadata, assemble the payload, notify.
    async fn deliver_submission(
        &self,
        activity: &Activity,
        value: &serde_json::Value,
    ) -> std::result::Result<NotifyResult, ConnectorError> {
        let team = teams::team_context(self.connector.as_ref(), activity).await;
        let user = teams::user_info(activity);
        let ids = teams::activity_ids(activity);
        let form = FormData::from_value(value);

        let payload = OutboundPayload::assemble(&team, &user, &ids, &form);
        info!(
            team_id = %payload.team_id,
            user = %payload.user_name,
            title = %payload.title,
            "forwarding submission to Logic App"
        );

        Ok(self.notifier.notify(&payload).await)
    }

    /// Replace the original card with the success notice. Best-effort:
    /// a failed update is logged and otherwise ignored.
    async fn update_to_success(&self, activity: &Activity) {
        let Ok((service_url, conversation_id)) = address(activity) else {
            warn!("cannot update card: activity has no address");
            return;
        };
        let Some(target_id) = activity.target_activity_id() else {
            warn!("cannot update card: activity has no id");
            return;
        };

        let update = Activity {
            id: Some(target_id.to_string()),
            conversation: activity.conversation.clone(),
            ..Activity::with_attachment(cards::success_card())
        };

        if let Err(e) = self
            .connector
            .update_activity(service_url, conversation_id, target_id, &update)
            .await
        {
            warn!(error = %e, "failed to update card to success");
        }
    }

    // ── Cancel ──────────────────────────────────────────────────────

    /// Delete the card. If the channel refuses (or the message is
    /// already gone), fall back to a plain-text reply. Never fails.
    async fn handle_cancel(&self, activity: &Activity) {
        let deleted = match (address(activity), activity.target_activity_id()) {
            (Ok((service_url, conversation_id)), Some(target_id)) => self
                .connector
                .delete_activity(service_url, conversation_id, target_id)
                .await
                .map_err(|e| e.to_string()),
            (Err(e), _) => Err(e.to_string()),
            (_, None) => Err("activity has no id to delete".to_string()),
        };

        if let Err(reason) = deleted {
            warn!(%reason, "failed to delete card");
            self.reply_text(activity, "Cancelled.").await;
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    /// Best-effort user notification when a turn fails outright. Used
    /// by the server's error hook; never fails.
    pub async fn report_turn_error(&self, activity: &Activity) {
        self.reply_text(activity, "The bot encountered an error or bug.")
            .await;
    }

    /// Best-effort plain-text reply; a send failure is logged only.
    async fn reply_text(&self, activity: &Activity, text: &str) {
        let Ok((service_url, conversation_id)) = address(activity) else {
            error!(%text, "cannot reply: activity has no address");
            return;
        };
        if let Err(e) = self
            .connector
            .send_activity(service_url, conversation_id, &Activity::message(text))
            .await
        {
            error!(error = %e, %text, "failed to send reply");
        }
    }
}

/// The service URL and conversation id every connector call needs.
fn address(activity: &Activity) -> std::result::Result<(&str, &str), ConnectorError> {
    let service_url = activity
        .service_url
        .as_deref()
        .ok_or(ConnectorError::MissingField("serviceUrl"))?;
    let conversation_id = activity
        .conversation
        .as_ref()
        .and_then(|c| c.id.as_deref())
        .ok_or(ConnectorError::MissingField("conversation.id"))?;
    Ok((service_url, conversation_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attachment, ChannelAccount, ConversationAccount, TeamDetails};
    use async_trait::async_trait;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    // ── Mock connector ──────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Send {
            conversation_id: String,
            text: Option<String>,
            attachments: Vec<Attachment>,
        },
        Update {
            activity_id: String,
            attachments: Vec<Attachment>,
        },
        Delete {
            activity_id: String,
        },
        TeamDetails {
            team_id: String,
        },
    }

    #[derive(Default)]
    struct MockConnector {
        calls: Mutex<Vec<Call>>,
        fail_delete: bool,
        fail_team_details: bool,
    }

    impl MockConnector {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn send_activity(
            &self,
            _service_url: &str,
            conversation_id: &str,
            activity: &Activity,
        ) -> std::result::Result<String, ConnectorError> {
            self.record(Call::Send {
                conversation_id: conversation_id.to_string(),
                text: activity.text.clone(),
                attachments: activity.attachments.clone(),
            });
            Ok("sent-id".to_string())
        }

        async fn update_activity(
            &self,
            _service_url: &str,
            _conversation_id: &str,
            activity_id: &str,
            activity: &Activity,
        ) -> std::result::Result<(), ConnectorError> {
            self.record(Call::Update {
                activity_id: activity_id.to_string(),
                attachments: activity.attachments.clone(),
            });
            Ok(())
        }

        async fn delete_activity(
            &self,
            _service_url: &str,
            _conversation_id: &str,
            activity_id: &str,
        ) -> std::result::Result<(), ConnectorError> {
            self.record(Call::Delete {
                activity_id: activity_id.to_string(),
            });
            if self.fail_delete {
                return Err(ConnectorError::Status {
                    operation: "delete_activity".into(),
                    status: 405,
                    body: "not supported".into(),
                });
            }
            Ok(())
        }

        async fn team_details(
            &self,
            _service_url: &str,
            team_id: &str,
        ) -> std::result::Result<TeamDetails, ConnectorError> {
            self.record(Call::TeamDetails {
                team_id: team_id.to_string(),
            });
            if self.fail_team_details {
                return Err(ConnectorError::Status {
                    operation: "team_details".into(),
                    status: 403,
                    body: "forbidden".into(),
                });
            }
            Ok(TeamDetails {
                id: Some("T1".into()),
                name: Some("Eng".into()),
                aad_group_id: Some("g-1".into()),
            })
        }
    }

    // ── Fixtures ────────────────────────────────────────────────────

    fn text_activity(text: &str) -> Activity {
        Activity {
            activity_type: "message".into(),
            id: Some("msg1".into()),
            text: Some(text.into()),
            service_url: Some("https://smba.example/amer/".into()),
            from: Some(ChannelAccount {
                id: Some("u1".into()),
                name: Some("Alice".into()),
                aad_object_id: None,
            }),
            conversation: Some(ConversationAccount {
                id: Some("19:abc".into()),
                ..ConversationAccount::default()
            }),
            channel_data: Some(serde_json::json!({
                "team": {"id": "T1"},
                "tenant": {"id": "tenant-1"}
            })),
            ..Activity::default()
        }
    }

    fn submission_activity(value: serde_json::Value) -> Activity {
        Activity {
            value: Some(value),
            reply_to_id: Some("card-msg".into()),
            ..text_activity("")
        }
    }

    /// Spin up a capture endpoint standing in for the Logic App.
    async fn logic_app_server(
        status: axum::http::StatusCode,
        body: &'static str,
    ) -> (String, std::sync::Arc<Mutex<Vec<serde_json::Value>>>) {
        let received = std::sync::Arc::new(Mutex::new(Vec::new()));
        let received_for_handler = std::sync::Arc::clone(&received);
        let app = Router::new().route(
            "/",
            post(move |Json(payload): Json<serde_json::Value>| {
                received_for_handler.lock().unwrap().push(payload);
                async move { (status, body) }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://127.0.0.1:{port}/"), received)
    }

    fn bot_with(connector: Arc<MockConnector>, endpoint: String) -> Bot {
        Bot::new(connector, Notifier::new(endpoint))
    }

    // ── Routing ─────────────────────────────────────────────────────

    #[test]
    fn route_cancel_action() {
        let activity = submission_activity(serde_json::json!({"action": "cancel"}));
        assert_eq!(route(&activity), Route::Cancel);
    }

    #[test]
    fn route_cancel_wins_over_form_keys() {
        let activity = submission_activity(serde_json::json!({
            "action": "cancel", "title": "x", "description": "y"
        }));
        assert_eq!(route(&activity), Route::Cancel);
    }

    #[test]
    fn route_submission_with_both_keys() {
        let value = serde_json::json!({"title": "Buy milk", "description": "2%"});
        let activity = submission_activity(value.clone());
        assert_eq!(route(&activity), Route::Submit(value));
    }

    #[test]
    fn route_submission_with_empty_strings() {
        let value = serde_json::json!({"title": "", "description": ""});
        assert_eq!(
            route(&submission_activity(value.clone())),
            Route::Submit(value)
        );
    }

    #[test]
    fn route_value_missing_keys_falls_through_to_form() {
        let activity = submission_activity(serde_json::json!({"title": "only"}));
        assert_eq!(
            route(&activity),
            Route::CreateForm {
                command: String::new()
            }
        );
    }

    #[test]
    fn route_text_extracts_command() {
        assert_eq!(
            route(&text_activity("@Bot create")),
            Route::CreateForm {
                command: "create".into()
            }
        );
    }

    #[test]
    fn route_any_command_creates_form() {
        for text in ["@Bot create", "@Bot help", "@Bot", "hello there", ""] {
            assert!(matches!(
                route(&text_activity(text)),
                Route::CreateForm { .. }
            ));
        }
    }

    // ── Create form ─────────────────────────────────────────────────

    #[tokio::test]
    async fn text_turn_sends_input_card() {
        let connector = Arc::new(MockConnector::default());
        let bot = bot_with(Arc::clone(&connector), String::new());

        bot.on_turn(&text_activity("@Bot create")).await.unwrap();

        let calls = connector.calls();
        assert_eq!(calls.len(), 1);
        let Call::Send {
            conversation_id,
            attachments,
            ..
        } = &calls[0]
        else {
            panic!("expected send, got {:?}", calls[0]);
        };
        assert_eq!(conversation_id, "19:abc");
        assert_eq!(attachments.len(), 1);
        assert_eq!(
            attachments[0].content_type,
            cards::ADAPTIVE_CARD_CONTENT_TYPE
        );
        assert_eq!(attachments[0].content["body"][0]["text"], "Create New Item");
    }

    #[tokio::test]
    async fn non_message_activity_ignored() {
        let connector = Arc::new(MockConnector::default());
        let bot = bot_with(Arc::clone(&connector), String::new());

        let activity = Activity {
            activity_type: "conversationUpdate".into(),
            ..text_activity("")
        };
        bot.on_turn(&activity).await.unwrap();
        assert!(connector.calls().is_empty());
    }

    #[tokio::test]
    async fn create_form_without_address_errors() {
        let connector = Arc::new(MockConnector::default());
        let bot = bot_with(Arc::clone(&connector), String::new());

        let activity = Activity {
            activity_type: "message".into(),
            text: Some("hi".into()),
            ..Activity::default()
        };
        assert!(bot.on_turn(&activity).await.is_err());
    }

    // ── Submit ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn submit_posts_exact_payload_and_updates_card() {
        let (endpoint, received) = logic_app_server(axum::http::StatusCode::OK, "OK").await;
        let connector = Arc::new(MockConnector::default());
        let bot = bot_with(Arc::clone(&connector), endpoint);

        let activity =
            submission_activity(serde_json::json!({"title": "Buy milk", "description": "2%"}));
        bot.on_turn(&activity).await.unwrap();

        let payloads = received.lock().unwrap().clone();
        assert_eq!(payloads.len(), 1, "exactly one POST attempted");
        assert_eq!(
            payloads[0],
            serde_json::json!({
                "teamId": "T1",
                "channelId": "19:abc",
                "messageId": "msg1",
                "userId": "u1",
                "userName": "Alice",
                "title": "Buy milk",
                "description": "2%",
                "timestamp": ""
            })
        );

        // Card replaced in place at the replied-to id.
        let calls = connector.calls();
        let update = calls
            .iter()
            .find_map(|c| match c {
                Call::Update {
                    activity_id,
                    attachments,
                } => Some((activity_id.clone(), attachments.clone())),
                _ => None,
            })
            .expect("update_activity called");
        assert_eq!(update.0, "card-msg");
        assert_eq!(update.1[0].content["body"][0]["text"], "✅ Success");
        // No plain-text reply on the happy path.
        assert!(!calls.iter().any(|c| matches!(c, Call::Send { .. })));
    }

    #[tokio::test]
    async fn submit_with_unreachable_endpoint_reports_error_and_keeps_card() {
        let connector = Arc::new(MockConnector::default());
        let bot = bot_with(Arc::clone(&connector), "http://127.0.0.1:1/".into());

        let activity =
            submission_activity(serde_json::json!({"title": "Buy milk", "description": "2%"}));
        bot.on_turn(&activity).await.unwrap();

        let calls = connector.calls();
        let reply = calls
            .iter()
            .find_map(|c| match c {
                Call::Send { text, .. } => text.clone(),
                _ => None,
            })
            .expect("error reply sent");
        assert!(
            reply.contains("Logic App connection error"),
            "got: {reply}"
        );
        assert!(
            !calls.iter().any(|c| matches!(c, Call::Update { .. })),
            "card must be left unmodified on failure"
        );
    }

    #[tokio::test]
    async fn submit_unconfigured_endpoint_reports_error() {
        let connector = Arc::new(MockConnector::default());
        let bot = bot_with(Arc::clone(&connector), String::new());

        let activity = submission_activity(serde_json::json!({"title": "t", "description": "d"}));
        bot.on_turn(&activity).await.unwrap();

        let reply = connector
            .calls()
            .iter()
            .find_map(|c| match c {
                Call::Send { text, .. } => text.clone(),
                _ => None,
            })
            .expect("error reply sent");
        assert!(reply.contains("LOGICAPP_ENDPOINT not configured"), "got: {reply}");
    }

    #[tokio::test]
    async fn submit_with_failed_team_lookup_sends_empty_team_id() {
        let (endpoint, received) = logic_app_server(axum::http::StatusCode::OK, "OK").await;
        let connector = Arc::new(MockConnector {
            fail_team_details: true,
            ..MockConnector::default()
        });
        let bot = bot_with(Arc::clone(&connector), endpoint);

        let activity = submission_activity(serde_json::json!({"title": "t", "description": "d"}));
        bot.on_turn(&activity).await.unwrap();

        let payloads = received.lock().unwrap().clone();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["teamId"], "");
        assert_eq!(payloads[0]["title"], "t");
    }

    #[tokio::test]
    async fn submit_empty_fields_still_posted() {
        let (endpoint, received) = logic_app_server(axum::http::StatusCode::OK, "OK").await;
        let connector = Arc::new(MockConnector::default());
        let bot = bot_with(Arc::clone(&connector), endpoint);

        let activity = submission_activity(serde_json::json!({"title": "", "description": ""}));
        bot.on_turn(&activity).await.unwrap();

        let payloads = received.lock().unwrap().clone();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["title"], "");
        assert_eq!(payloads[0]["description"], "");
    }

    // ── Cancel ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn cancel_deletes_replied_to_card_without_network_call() {
        let connector = Arc::new(MockConnector::default());
        // Unconfigured notifier: any notify attempt would show up as an
        // error reply, which we assert is absent.
        let bot = bot_with(Arc::clone(&connector), String::new());

        let activity = submission_activity(serde_json::json!({"action": "cancel"}));
        bot.on_turn(&activity).await.unwrap();

        let calls = connector.calls();
        assert_eq!(
            calls,
            vec![Call::Delete {
                activity_id: "card-msg".into()
            }]
        );
    }

    #[tokio::test]
    async fn cancel_falls_back_to_own_id() {
        let connector = Arc::new(MockConnector::default());
        let bot = bot_with(Arc::clone(&connector), String::new());

        let activity = Activity {
            reply_to_id: None,
            value: Some(serde_json::json!({"action": "cancel"})),
            ..text_activity("")
        };
        bot.on_turn(&activity).await.unwrap();

        assert_eq!(
            connector.calls(),
            vec![Call::Delete {
                activity_id: "msg1".into()
            }]
        );
    }

    #[tokio::test]
    async fn cancel_delete_failure_sends_cancelled_text() {
        let connector = Arc::new(MockConnector {
            fail_delete: true,
            ..MockConnector::default()
        });
        let bot = bot_with(Arc::clone(&connector), String::new());

        let activity = submission_activity(serde_json::json!({"action": "cancel"}));
        bot.on_turn(&activity).await.unwrap();

        let calls = connector.calls();
        assert!(matches!(calls[0], Call::Delete { .. }));
        assert_eq!(
            calls[1],
            Call::Send {
                conversation_id: "19:abc".into(),
                text: Some("Cancelled.".into()),
                attachments: vec![],
            }
        );
    }
}
