//! Firebase Cloud Messaging (HTTP v1) transport.
//!
//! Authenticates with a service-account key: an RS256-signed JWT is swapped
//! for an OAuth2 access token, which is cached until shortly before expiry.

use async_trait::async_trait;
use cakeday_core::config::PushConfig;
use cakeday_core::error::{CakedayError, Result};
use cakeday_core::traits::PushTransport;
use cakeday_core::types::{PushMessage, SendOutcome};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

const FCM_BASE_URL: &str = "https://fcm.googleapis.com/v1";
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Refresh the access token this long before it expires.
const TOKEN_SLACK_SECS: i64 = 60;

/// The fields of a Google service-account key file that we use.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

impl ServiceAccount {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CakedayError::config(format!("Invalid service account JSON: {e}")))
    }

    /// Inline JSON wins over a key file path.
    pub fn from_config(config: &PushConfig) -> Result<Self> {
        if let Some(json) = config.service_account.as_deref().filter(|s| !s.trim().is_empty()) {
            return Self::from_json(json);
        }
        if let Some(path) = &config.service_account_path {
            let path = shellexpand::tilde(path).to_string();
            let json = std::fs::read_to_string(&path)
                .map_err(|e| CakedayError::config(format!("Cannot read {path}: {e}")))?;
            return Self::from_json(&json);
        }
        Err(CakedayError::config(
            "FCM needs FIREBASE_SERVICE_ACCOUNT or push.service_account_path",
        ))
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct FcmTransport {
    account: ServiceAccount,
    client: reqwest::Client,
    base_url: String,
    token: Mutex<Option<CachedToken>>,
}

impl FcmTransport {
    pub fn new(account: ServiceAccount, client: reqwest::Client) -> Self {
        Self {
            account,
            client,
            base_url: FCM_BASE_URL.into(),
            token: Mutex::new(None),
        }
    }

    pub fn from_config(config: &PushConfig) -> Result<Self> {
        let account = ServiceAccount::from_config(config)?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CakedayError::Http(e.to_string()))?;
        tracing::info!("🔥 FCM transport ready for project {}", account.project_id);
        Ok(Self::new(account, client))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            iss: &self.account.client_email,
            scope: FCM_SCOPE,
            aud: &self.account.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes())
            .map_err(|e| CakedayError::AuthFailed(format!("Bad service account key: {e}")))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| CakedayError::AuthFailed(format!("JWT signing failed: {e}")))
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(TOKEN_SLACK_SECS) > now {
                return Ok(token.access_token.clone());
            }
        }

        let assertion = self.sign_assertion(now)?;
        let resp = self
            .client
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| CakedayError::AuthFailed(format!("Token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CakedayError::AuthFailed(format!("Token endpoint {status}: {text}")));
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| CakedayError::AuthFailed(format!("Bad token response: {e}")))?;
        tracing::debug!("FCM access token refreshed, valid for {}s", body.expires_in);

        let access_token = body.access_token.clone();
        *cached = Some(CachedToken {
            access_token: body.access_token,
            expires_at: now + Duration::seconds(body.expires_in),
        });
        Ok(access_token)
    }
}

#[async_trait]
impl PushTransport for FcmTransport {
    fn name(&self) -> &str {
        "fcm"
    }

    async fn send(&self, message: &PushMessage) -> SendOutcome {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("❌ FCM auth: {e}");
                return SendOutcome::TransientFailure(e.to_string());
            }
        };

        let url = format!("{}/projects/{}/messages:send", self.base_url, self.account.project_id);
        let body = serde_json::json!({
            "message": {
                "token": message.token,
                "notification": {
                    "title": message.title,
                    "body": message.body,
                }
            }
        });

        let resp = match self.client.post(&url).bearer_auth(token).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => return SendOutcome::TransientFailure(format!("FCM request failed: {e}")),
        };

        let status = resp.status();
        if status.is_success() {
            return SendOutcome::Delivered;
        }
        let text = resp.text().await.unwrap_or_default();
        classify_error(status.as_u16(), &text)
    }
}

/// Map an FCM error response onto a delivery outcome.
///
/// Only answers that say the token itself is dead are permanent: 404 or an
/// `UNREGISTERED` code, or a 400 `INVALID_ARGUMENT` that names the token.
pub fn classify_error(status: u16, body: &str) -> SendOutcome {
    let json: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    let error = &json["error"];
    let grpc_status = error["status"].as_str().unwrap_or("");
    let message = error["message"].as_str().unwrap_or(body);

    let codes: Vec<&str> = error["details"]
        .as_array()
        .map(|details| details.iter().filter_map(|d| d["errorCode"].as_str()).collect())
        .unwrap_or_default();

    let unregistered = status == 404 || grpc_status == "NOT_FOUND" || codes.contains(&"UNREGISTERED");
    let invalid_token = status == 400
        && (grpc_status == "INVALID_ARGUMENT" || codes.contains(&"INVALID_ARGUMENT"))
        && message.to_lowercase().contains("token");

    let reason = format!("FCM {status}: {message}");
    if unregistered || invalid_token {
        SendOutcome::PermanentInvalidToken(reason)
    } else {
        SendOutcome::TransientFailure(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_is_permanent() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND",
            "details":[{"@type":"type.googleapis.com/google.firebase.fcm.v1.FcmError","errorCode":"UNREGISTERED"}]}}"#;
        assert!(matches!(classify_error(404, body), SendOutcome::PermanentInvalidToken(_)));
    }

    #[test]
    fn test_bad_token_argument_is_permanent() {
        let body = r#"{"error":{"code":400,"message":"The registration token is not a valid FCM registration token","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(classify_error(400, body), SendOutcome::PermanentInvalidToken(_)));
    }

    #[test]
    fn test_other_bad_argument_is_transient() {
        let body = r#"{"error":{"code":400,"message":"Invalid JSON payload received.","status":"INVALID_ARGUMENT"}}"#;
        assert!(matches!(classify_error(400, body), SendOutcome::TransientFailure(_)));
    }

    #[test]
    fn test_server_errors_are_transient() {
        assert!(matches!(classify_error(503, "upstream down"), SendOutcome::TransientFailure(_)));
        assert!(matches!(classify_error(429, "{}"), SendOutcome::TransientFailure(_)));
        let body = r#"{"error":{"code":401,"status":"UNAUTHENTICATED","message":"auth token expired"}}"#;
        assert!(matches!(classify_error(401, body), SendOutcome::TransientFailure(_)));
    }

    #[test]
    fn test_service_account_json() {
        let json = r#"{"type":"service_account","project_id":"cakes","client_email":"svc@cakes.iam.gserviceaccount.com","private_key":"---"}"#;
        let account = ServiceAccount::from_json(json).unwrap();
        assert_eq!(account.project_id, "cakes");
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);
        assert!(ServiceAccount::from_json("{}").is_err());
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let err = ServiceAccount::from_config(&PushConfig::default()).unwrap_err();
        assert!(matches!(err, CakedayError::Config(_)));
    }

    #[tokio::test]
    async fn test_bad_key_fails_transiently_without_network() {
        let account = ServiceAccount {
            project_id: "cakes".into(),
            client_email: "svc@cakes".into(),
            private_key: "not a pem".into(),
            token_uri: DEFAULT_TOKEN_URI.into(),
        };
        let transport = FcmTransport::new(account, reqwest::Client::new());
        let outcome = transport.send(&PushMessage::new("tok", "t", "b")).await;
        assert!(matches!(outcome, SendOutcome::TransientFailure(ref m) if m.contains("key")));
    }
}
