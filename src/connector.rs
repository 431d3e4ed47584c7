//! Bot Framework Connector API client.
//!
//! The bot talks back to Teams through the connector REST surface on
//! the activity's `serviceUrl`: send / update / delete an activity, and
//! the team-details lookup. A trait seam keeps the bot testable with a
//! recording mock.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::ConnectorError;
use crate::schema::{Activity, ResourceResponse, TeamDetails};

/// Outbound operations against the Bot Framework Connector API.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Post an activity to a conversation; returns the id the channel
    /// assigned to it.
    async fn send_activity(
        &self,
        service_url: &str,
        conversation_id: &str,
        activity: &Activity,
    ) -> Result<String, ConnectorError>;

    /// Replace an existing activity's content in place.
    async fn update_activity(
        &self,
        service_url: &str,
        conversation_id: &str,
        activity_id: &str,
        activity: &Activity,
    ) -> Result<(), ConnectorError>;

    /// Delete an activity from a conversation.
    async fn delete_activity(
        &self,
        service_url: &str,
        conversation_id: &str,
        activity_id: &str,
    ) -> Result<(), ConnectorError>;

    /// Fetch team details for a Teams team id.
    async fn team_details(
        &self,
        service_url: &str,
        team_id: &str,
    ) -> Result<TeamDetails, ConnectorError>;
}

// ── HTTP implementation ─────────────────────────────────────────────

const TOKEN_SCOPE: &str = "https://api.botframework.com/.default";

/// Margin subtracted from a token's lifetime before it is re-fetched.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// reqwest-backed connector. Holds the bot credentials and a cached
/// bearer token; with an empty app id no Authorization header is sent
/// (local emulator mode).
pub struct HttpConnector {
    client: reqwest::Client,
    config: AppConfig,
    /// Token endpoint override, used by tests. `None` means the public
    /// Microsoft login endpoint.
    login_base: Option<String>,
    token: Mutex<Option<CachedToken>>,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

impl HttpConnector {
    pub fn new(config: AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            login_base: None,
            token: Mutex::new(None),
        }
    }

    #[cfg(test)]
    fn with_login_base(config: AppConfig, login_base: String) -> Self {
        Self {
            login_base: Some(login_base),
            ..Self::new(config)
        }
    }

    fn token_url(&self) -> String {
        let tenant = if self.config.app_tenant_id.is_empty() {
            // Multi-tenant bots authenticate against the shared tenant.
            "botframework.com"
        } else {
            &self.config.app_tenant_id
        };
        let base = self
            .login_base
            .as_deref()
            .unwrap_or("https://login.microsoftonline.com");
        format!("{}/{}/oauth2/v2.0/token", base.trim_end_matches('/'), tenant)
    }

    /// Get a bearer token via the client-credentials grant, reusing the
    /// cached one until close to expiry. Returns `None` when the bot
    /// runs without credentials.
    async fn bearer_token(&self) -> Result<Option<String>, ConnectorError> {
        if self.config.app_id.is_empty() {
            return Ok(None);
        }

        let mut cached = self.token.lock().await;
        if let Some(t) = cached.as_ref() {
            if Utc::now() < t.expires_at {
                return Ok(Some(t.token.clone()));
            }
        }

        debug!("fetching Bot Framework bearer token");
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.app_id.as_str()),
            ("client_secret", self.config.app_password.expose_secret()),
            ("scope", TOKEN_SCOPE),
        ];

        let resp = self
            .client
            .post(self.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| ConnectorError::Auth(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ConnectorError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ConnectorError::Auth(e.to_string()))?;

        let lifetime = (token.expires_in - TOKEN_REFRESH_MARGIN_SECS).max(60);
        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Utc::now() + Duration::seconds(lifetime),
        });

        Ok(Some(token.access_token))
    }

    fn conversation_url(service_url: &str, conversation_id: &str) -> String {
        format!(
            "{}/v3/conversations/{}/activities",
            service_url.trim_end_matches('/'),
            conversation_id
        )
    }

    async fn request(
        &self,
        operation: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ConnectorError> {
        let builder = match self.bearer_token().await? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| ConnectorError::request(operation, e))?;

        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(ConnectorError::Status {
                operation: operation.to_string(),
                status,
                body,
            })
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn send_activity(
        &self,
        service_url: &str,
        conversation_id: &str,
        activity: &Activity,
    ) -> Result<String, ConnectorError> {
        let url = Self::conversation_url(service_url, conversation_id);
        let resp = self
            .request("send_activity", self.client.post(url).json(activity))
            .await?;

        // The channel may return an empty body for some activity kinds.
        let resource: ResourceResponse = resp.json().await.unwrap_or_default();
        Ok(resource.id)
    }

    async fn update_activity(
        &self,
        service_url: &str,
        conversation_id: &str,
        activity_id: &str,
        activity: &Activity,
    ) -> Result<(), ConnectorError> {
        let url = format!(
            "{}/{}",
            Self::conversation_url(service_url, conversation_id),
            activity_id
        );
        self.request("update_activity", self.client.put(url).json(activity))
            .await?;
        Ok(())
    }

    async fn delete_activity(
        &self,
        service_url: &str,
        conversation_id: &str,
        activity_id: &str,
    ) -> Result<(), ConnectorError> {
        let url = format!(
            "{}/{}",
            Self::conversation_url(service_url, conversation_id),
            activity_id
        );
        self.request("delete_activity", self.client.delete(url))
            .await?;
        Ok(())
    }

    async fn team_details(
        &self,
        service_url: &str,
        team_id: &str,
    ) -> Result<TeamDetails, ConnectorError> {
        let url = format!(
            "{}/v3/teams/{}",
            service_url.trim_end_matches('/'),
            team_id
        );
        let resp = self.request("team_details", self.client.get(url)).await?;
        resp.json()
            .await
            .map_err(|e| ConnectorError::request("team_details", e))
    }
}
