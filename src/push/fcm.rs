use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::PushTransport;
use crate::{
    config::FirebaseCredentials,
    error::{AppError, AppResult},
    models::{DeliveryReport, Notification, SendResponse},
};

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const FCM_API_BASE: &str = "https://fcm.googleapis.com/v1";

/// Refresh access tokens this long before Google says they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct ServiceAccountClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
pub struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    webpush: Option<WebpushConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WebpushConfig<'a> {
    fcm_options: WebpushFcmOptions<'a>,
}

#[derive(Debug, Serialize)]
struct WebpushFcmOptions<'a> {
    link: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendSuccess {
    name: Option<String>,
}

impl<'a> FcmMessage<'a> {
    pub fn new(token: &'a str, notification: &'a Notification) -> Self {
        Self {
            token,
            notification: FcmNotification {
                title: &notification.title,
                body: &notification.body,
                image: notification.image.as_deref(),
            },
            webpush: notification.link.as_deref().map(|link| WebpushConfig {
                fcm_options: WebpushFcmOptions { link },
            }),
        }
    }
}

/// Firebase Cloud Messaging over the HTTP v1 API, authenticated with a
/// service account.
pub struct FcmTransport {
    http: reqwest::Client,
    credentials: FirebaseCredentials,
    encoding_key: EncodingKey,
    access_token: Mutex<Option<CachedToken>>,
}

impl FcmTransport {
    pub fn new(credentials: FirebaseCredentials) -> AppResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())?;

        Ok(Self {
            http: reqwest::Client::new(),
            credentials,
            encoding_key,
            access_token: Mutex::new(None),
        })
    }

    fn send_url(&self) -> String {
        format!(
            "{}/projects/{}/messages:send",
            FCM_API_BASE, self.credentials.project_id
        )
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> AppResult<String> {
        let claims = ServiceAccountClaims {
            iss: &self.credentials.client_email,
            scope: MESSAGING_SCOPE,
            aud: TOKEN_URI,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    async fn access_token(&self) -> AppResult<String> {
        let mut cached = self.access_token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at > now {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.sign_assertion(now)?;
        let response = self
            .http
            .post(TOKEN_URI)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Delivery(format!(
                "access token request failed ({}): {}",
                status, body
            )));
        }

        let token: AccessTokenResponse = response.json().await?;
        tracing::debug!("Obtained FCM access token valid for {}s", token.expires_in);

        let expires_at = now + Duration::seconds(token.expires_in - EXPIRY_MARGIN_SECS);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }

    async fn send_one(
        &self,
        access_token: &str,
        token: &str,
        notification: &Notification,
    ) -> AppResult<SendResponse> {
        let request = SendRequest {
            message: FcmMessage::new(token, notification),
        };

        let response = self
            .http
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: SendSuccess = response.json().await?;
            return Ok(SendResponse::delivered(token, body.name));
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!("FCM rejected token {} ({}): {}", token, status, body);
        Ok(SendResponse::failed(token, format!("{}: {}", status, body)))
    }
}

#[async_trait]
impl PushTransport for FcmTransport {
    async fn send_multicast(
        &self,
        tokens: &[String],
        notification: &Notification,
    ) -> AppResult<DeliveryReport> {
        let access_token = self.access_token().await?;

        let results = join_all(
            tokens
                .iter()
                .map(|token| self.send_one(&access_token, token, notification)),
        )
        .await;

        let responses = results.into_iter().collect::<AppResult<Vec<_>>>()?;
        Ok(DeliveryReport::from_responses(responses))
    }
}
