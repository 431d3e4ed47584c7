//! Process configuration, read once at startup from the environment.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Bot configuration — Bot Framework credentials plus the Logic App
/// endpoint. Built once in `main` and treated as immutable for the
/// process lifetime.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `MicrosoftAppId` — empty means unauthenticated (local emulator).
    pub app_id: String,
    /// `MicrosoftAppPassword`.
    pub app_password: SecretString,
    /// `MicrosoftAppType` (e.g. "MultiTenant"). Carried for Bot
    /// Framework configuration parity; the token exchange does not
    /// read it.
    pub app_type: String,
    /// `MicrosoftAppTenantId` — empty for multi-tenant bots.
    pub app_tenant_id: String,
    /// `LOGICAPP_ENDPOINT` — the workflow trigger URL. An empty value is
    /// not a startup error; it surfaces per turn as a notifier failure.
    pub logicapp_endpoint: String,
    /// Bind address for the inbound HTTP server.
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    /// Build config from environment variables. Credentials and the
    /// endpoint default to empty (misconfiguration is detected at use
    /// time); only a malformed `PORT` fails startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            app_id: std::env::var("MicrosoftAppId").unwrap_or_default(),
            app_password: SecretString::from(
                std::env::var("MicrosoftAppPassword").unwrap_or_default(),
            ),
            app_type: std::env::var("MicrosoftAppType").unwrap_or_default(),
            app_tenant_id: std::env::var("MicrosoftAppTenantId").unwrap_or_default(),
            logicapp_endpoint: std::env::var("LOGICAPP_ENDPOINT").unwrap_or_default(),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_port(std::env::var("PORT").ok())?,
        })
    }
}

/// Parse the `PORT` variable, defaulting to the Bot Framework's
/// conventional 3978 when unset.
fn parse_port(value: Option<String>) -> Result<u16, ConfigError> {
    match value {
        None => Ok(3978),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "PORT".to_string(),
            message: format!("not a valid port number: {raw:?}"),
        }),
    }
}
