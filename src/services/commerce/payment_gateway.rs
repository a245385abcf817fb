use crate::{config::AppConfig, errors::ServiceError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, instrument, warn};

/// What the orchestrator asks the provider to authorize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub user_id: i32,
}

/// A pending charge the client still has to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAuthorization {
    /// Provider-side identifier, stored on the order for reconciliation.
    pub id: String,
    pub client_secret: String,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("declined: {0}")]
    Declined(String),

    #[error("provider error: {0}")]
    Failed(String),

    /// No answer within the deadline; a charge may exist.
    #[error("no response from provider: {0}")]
    Ambiguous(String),

    #[error("payment provider not configured")]
    NotConfigured,
}

impl From<AuthorizationError> for ServiceError {
    fn from(err: AuthorizationError) -> Self {
        match err {
            AuthorizationError::Ambiguous(msg) => ServiceError::AuthorizationAmbiguous(msg),
            other => ServiceError::AuthorizationFailed(other.to_string()),
        }
    }
}

/// Payment provider seam. Implementations must not retry on their own.
#[async_trait]
pub trait PaymentAuthorizer: Send + Sync {
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<PaymentAuthorization, AuthorizationError>;
}

/// Creates Stripe PaymentIntents over the REST API.
#[derive(Clone)]
pub struct StripePaymentAuthorizer {
    client: reqwest::Client,
    api_base: String,
    secret_key: Option<String>,
}

#[derive(Deserialize)]
struct PaymentIntentResponse {
    id: String,
    client_secret: Option<String>,
}

#[derive(Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
    code: Option<String>,
}

impl StripePaymentAuthorizer {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("payment client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            cfg.payment_api_base.clone(),
            cfg.payment_secret_key().map(str::to_string),
            cfg.payment_timeout(),
        )
    }

    fn classify_transport_error(err: reqwest::Error) -> AuthorizationError {
        if err.is_timeout() {
            AuthorizationError::Ambiguous(err.to_string())
        } else if err.is_connect() {
            AuthorizationError::Failed(err.to_string())
        } else {
            // The request may have reached the provider.
            AuthorizationError::Ambiguous(err.to_string())
        }
    }
}

#[async_trait]
impl PaymentAuthorizer for StripePaymentAuthorizer {
    #[instrument(skip(self), fields(amount_cents = request.amount_cents, user_id = request.user_id))]
    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<PaymentAuthorization, AuthorizationError> {
        let secret_key = self
            .secret_key
            .as_deref()
            .ok_or(AuthorizationError::NotConfigured)?;

        let form = [
            ("amount", request.amount_cents.to_string()),
            ("currency", request.currency.clone()),
            ("metadata[userId]", request.user_id.to_string()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(secret_key)
            .form(&form)
            .send()
            .await
            .map_err(Self::classify_transport_error)?;

        let status = response.status();
        if status.is_success() {
            let intent: PaymentIntentResponse = response.json().await.map_err(|e| {
                error!(error = %e, "Unreadable payment intent response");
                Self::classify_transport_error(e)
            })?;
            let client_secret = intent.client_secret.ok_or_else(|| {
                AuthorizationError::Ambiguous(format!(
                    "payment intent {} returned without client secret",
                    intent.id
                ))
            })?;
            return Ok(PaymentAuthorization {
                id: intent.id,
                client_secret,
                amount_cents: request.amount_cents,
                currency: request.currency.clone(),
            });
        }

        let detail = response
            .json::<StripeErrorEnvelope>()
            .await
            .ok()
            .map(|envelope| {
                let message = envelope.error.message.unwrap_or_default();
                match envelope.error.code {
                    Some(code) => format!("{} ({})", message, code),
                    None => message,
                }
            })
            .filter(|detail| !detail.is_empty())
            .unwrap_or_else(|| status.to_string());

        if status.is_client_error() {
            warn!(status = status.as_u16(), detail = %detail, "Payment declined");
            Err(AuthorizationError::Declined(detail))
        } else {
            warn!(status = status.as_u16(), detail = %detail, "Payment provider error");
            Err(AuthorizationError::Failed(detail))
        }
    }
}
