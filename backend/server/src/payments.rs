//! # Payment relay
//!
//! Forwards card and PIX payment requests to Mercado Pago's
//! `POST /v1/payments`. Every forwarded call carries a fresh
//! `X-Idempotency-Key`, so a retried browser request never reuses a key.
//!
//! Requests arrive wrapped as `{"body": {...}}`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment provider is not configured")]
    NotConfigured,

    #[error("Malformed payment request: {0}")]
    Malformed(String),

    #[error("Payment provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Unreadable payment provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub body: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    pub email: String,
    pub identification: Identification,
}

/// Body sent to the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    pub transaction_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
    pub payment_method_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_id: Option<Value>,
    pub payer: Payer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
}

/// Card payment as produced by the card form, already in provider shape.
#[derive(Debug, Clone, Deserialize)]
pub struct CardPayment {
    pub transaction_amount: f64,
    pub token: String,
    #[serde(default)]
    pub description: Option<String>,
    pub installments: u32,
    pub payment_method_id: String,
    #[serde(default)]
    pub issuer_id: Option<Value>,
    pub payer: Payer,
}

/// Flat PIX form body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixPayment {
    #[serde(rename = "transaction_amount")]
    pub transaction_amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    pub payment_method_id: String,
    pub email: String,
    pub identification_type: String,
    pub number: String,
}

impl From<CardPayment> for PaymentRequest {
    fn from(value: CardPayment) -> Self {
        Self {
            transaction_amount: value.transaction_amount,
            token: Some(value.token),
            description: value.description,
            installments: Some(value.installments),
            payment_method_id: value.payment_method_id,
            issuer_id: value.issuer_id,
            payer: value.payer,
            notification_url: None,
        }
    }
}

impl PixPayment {
    pub fn into_request(self, notification_base_url: Option<&str>) -> PaymentRequest {
        PaymentRequest {
            transaction_amount: self.transaction_amount,
            token: None,
            description: self.description,
            installments: None,
            payment_method_id: self.payment_method_id,
            issuer_id: None,
            payer: Payer {
                email: self.email,
                identification: Identification {
                    kind: self.identification_type,
                    number: self.number,
                },
            },
            notification_url: notification_base_url
                .map(|base| base.trim().trim_end_matches('/'))
                .filter(|base| !base.is_empty())
                .map(|base| format!("{base}/v1/webhook")),
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
        idempotency_key: Uuid,
    ) -> Result<Value, PaymentError>;
}

pub struct MercadoPago {
    client: Client,
    api_url: String,
    access_token: Option<String>,
}

impl MercadoPago {
    pub fn new(
        api_url: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }
}

#[async_trait]
impl PaymentGateway for MercadoPago {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
        idempotency_key: Uuid,
    ) -> Result<Value, PaymentError> {
        let access_token = self
            .access_token
            .as_deref()
            .ok_or(PaymentError::NotConfigured)?;

        let response = self
            .client
            .post(format!("{}/v1/payments", self.api_url))
            .bearer_auth(access_token)
            .header("X-Idempotency-Key", idempotency_key.to_string())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(rejection(status, &text));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

fn rejection(status: StatusCode, text: &str) -> PaymentError {
    let message = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|body| body.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("payment rejected")
                .to_string()
        });

    PaymentError::Rejected {
        status: status.as_u16(),
        message,
    }
}

/// Sends `request` with a freshly generated idempotency key.
pub async fn relay(
    gateway: &dyn PaymentGateway,
    request: PaymentRequest,
) -> Result<Value, PaymentError> {
    let idempotency_key = Uuid::new_v4();

    info!(
        "Relaying {} payment of {} ({idempotency_key})",
        request.payment_method_id, request.transaction_amount
    );

    match gateway.create_payment(&request, idempotency_key).await {
        Ok(result) => {
            let status = result
                .get("status")
                .and_then(|status| status.as_str())
                .unwrap_or("unknown");
            info!("Payment {idempotency_key} accepted, status {status}");
            Ok(result)
        }
        Err(e) => {
            warn!("Payment {idempotency_key} failed: {e}");
            Err(e)
        }
    }
}
