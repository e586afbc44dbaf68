//! Twilio SMS client behind the `SmsSender` seam.

use crate::config::AppConfig;
use crate::phone;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Uniform result of an SMS send. Nothing past this boundary ever throws:
/// provider failures become a failed outcome with a human-readable message.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn sent(message_id: String) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> SendOutcome;
}

#[derive(Clone)]
struct TwilioCredentials {
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    credentials: Option<TwilioCredentials>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

impl TwilioClient {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_base_url(config, "https://api.twilio.com".to_string())
    }

    pub fn with_base_url(config: &AppConfig, base_url: String) -> Self {
        let credentials = match (
            &config.twilio_account_sid,
            &config.twilio_auth_token,
            &config.twilio_phone_number,
        ) {
            (Some(sid), Some(token), Some(from))
                if !sid.is_empty() && !token.is_empty() && !from.is_empty() =>
            {
                Some(TwilioCredentials {
                    account_sid: sid.clone(),
                    auth_token: token.clone(),
                    from_number: from.clone(),
                })
            }
            _ => {
                warn!("Twilio credentials not configured; SMS sends will fail fast");
                None
            }
        };

        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SmsSender for TwilioClient {
    #[instrument(skip(self, body))]
    async fn send(&self, to: &str, body: &str) -> SendOutcome {
        let Some(creds) = &self.credentials else {
            return SendOutcome::failed("SMS provider is not configured");
        };

        let destination = phone::normalize_us(to);
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, creds.account_sid
        );

        let params = [
            ("To", destination.as_str()),
            ("From", creds.from_number.as_str()),
            ("Body", body),
        ];

        let response = match self
            .http
            .post(&url)
            .basic_auth(&creds.account_sid, Some(&creds.auth_token))
            .form(&params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "twilio request failed");
                return SendOutcome::failed("SMS provider unreachable");
            }
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = %e, "failed reading twilio response");
                return SendOutcome::failed("SMS provider returned an unreadable response");
            }
        };

        if !status.is_success() {
            let message = serde_json::from_slice::<TwilioErrorResponse>(&bytes)
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| format!("SMS provider rejected the message ({status})"));
            error!(status = %status, message, "twilio API error");
            return SendOutcome::failed(message);
        }

        match serde_json::from_slice::<TwilioMessageResponse>(&bytes) {
            Ok(message) => {
                info!(sid = %message.sid, "SMS queued");
                SendOutcome::sent(message.sid)
            }
            Err(e) => {
                error!(error = %e, "failed decoding twilio response");
                SendOutcome::failed("SMS provider returned an unexpected response")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_config() -> AppConfig {
        AppConfig::new(
            "127.0.0.1".into(),
            18080,
            "test".into(),
            "https://book.example.com".into(),
            "sk_test_123".into(),
            "whsec_test".into(),
            "test-admin-key".into(),
        )
    }

    #[tokio::test]
    async fn unconfigured_client_fails_fast_without_network() {
        let client = TwilioClient::from_config(&bare_config());
        let outcome = client.send("3103097901", "hello").await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("SMS provider is not configured"));
        assert!(outcome.message_id.is_none());
    }

    #[test]
    fn partial_credentials_do_not_configure_the_client() {
        let mut cfg = bare_config();
        cfg.twilio_account_sid = Some("AC123".into());
        let client = TwilioClient::from_config(&cfg);
        assert!(client.credentials.is_none());
    }
}
