//! Defines the JSON protocol used between the dashboard shell and
//! jobdeck-service over stdin/stdout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// The action selector accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    // Connection management
    GetAuthUrl,
    ExchangeCode,
    RefreshToken,
    Disconnect,
    // Data sync
    ToGoogle,
    FromGoogle,
    SyncAll,
    SyncSingleEvent,
}

/// Request sent from the shell to the service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub action: Action,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from the service to the shell.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

impl<T: Serialize> Response<T> {
    pub fn success(data: T) -> String {
        serde_json::to_string(&Response::Success { data }).unwrap()
    }
}

impl Response<()> {
    pub fn error(msg: &str) -> String {
        serde_json::to_string(&Response::<()>::Error {
            error: msg.to_string(),
        })
        .unwrap()
    }
}

impl<T: DeserializeOwned> Response<T> {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

/// Consent URL and the state parameter the caller must verify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUrlData {
    pub authorization_url: String,
    pub state: String,
    pub scopes: Vec<String>,
}

/// Connection summary returned by the credential actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatus {
    pub user_id: String,
    pub calendar_id: String,
    pub sync_enabled: bool,
    pub token_expiry: DateTime<Utc>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_use_snake_case_wire_names() {
        for (action, wire) in [
            (Action::GetAuthUrl, "\"get_auth_url\""),
            (Action::ExchangeCode, "\"exchange_code\""),
            (Action::RefreshToken, "\"refresh_token\""),
            (Action::Disconnect, "\"disconnect\""),
            (Action::ToGoogle, "\"to_google\""),
            (Action::FromGoogle, "\"from_google\""),
            (Action::SyncAll, "\"sync_all\""),
            (Action::SyncSingleEvent, "\"sync_single_event\""),
        ] {
            assert_eq!(serde_json::to_string(&action).unwrap(), wire);
        }
    }

    #[test]
    fn request_params_default_to_null() {
        let request: Request = serde_json::from_str(r#"{"action": "sync_all"}"#).unwrap();
        assert_eq!(request.action, Action::SyncAll);
        assert!(request.params.is_null());
    }

    #[test]
    fn response_envelope_tags_status() {
        let ok = Response::success(crate::sync::PushReport::default());
        assert!(ok.contains("\"status\":\"success\""));
        let parsed: Response<crate::sync::PushReport> = Response::parse(&ok).unwrap();
        assert!(matches!(parsed, Response::Success { .. }));

        let err = Response::error("boom");
        assert!(err.contains("\"status\":\"error\""));
        let parsed: Response<()> = Response::parse(&err).unwrap();
        assert!(matches!(parsed, Response::Error { .. }));
    }
}
