//! # Authentication
//!
//! Thin wrapper around an external identity provider speaking the Identity
//! Toolkit v1 REST API (`accounts:signUp`, `accounts:signInWithPassword`,
//! `accounts:sendOobCode`, `accounts:lookup`).
//!
//! Being signed in is not enough to edit content: the caller's uid must also
//! have a document in `administradores`, written on sign-up.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, StatusCode,
        header::AUTHORIZATION,
        request::Parts,
    },
};
use catalog::{Administrator, DocumentRef, Validate};
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::{error::AppError, state::AppState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailExists,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("Invalid email")]
    InvalidEmail,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid or expired session")]
    Unauthorized,

    #[error("Account is not an administrator")]
    NotAdministrator,

    #[error("Identity provider is not configured")]
    NotConfigured,

    #[error("Identity provider error: {0}")]
    Provider(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::EmailExists => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::MissingToken | AuthError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::WeakPassword(_) | AuthError::InvalidEmail => StatusCode::BAD_REQUEST,
            AuthError::NotAdministrator => StatusCode::FORBIDDEN,
            AuthError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Maps an Identity Toolkit error message such as
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    pub fn from_provider_message(message: &str) -> Self {
        let (code, detail) = match message.split_once(':') {
            Some((code, detail)) => (code.trim(), detail.trim()),
            None => (message.trim(), ""),
        };

        match code {
            "EMAIL_EXISTS" => AuthError::EmailExists,
            "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" | "INVALID_LOGIN_CREDENTIALS" => {
                AuthError::InvalidCredentials
            }
            "WEAK_PASSWORD" => AuthError::WeakPassword(detail.to_string()),
            "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail,
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "USER_DISABLED" => {
                AuthError::Unauthorized
            }
            _ => AuthError::Provider(message.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id_token: String,
    pub refresh_token: String,
    pub uid: String,
    pub email: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;

    async fn lookup(&self, id_token: &str) -> Result<Identity, AuthError>;
}

pub struct IdentityToolkit {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    expires_in: String,
}

impl From<TokenResponse> for Session {
    fn from(value: TokenResponse) -> Self {
        Self {
            id_token: value.id_token,
            refresh_token: value.refresh_token,
            uid: value.local_id,
            email: value.email,
            expires_in: value.expires_in.parse().unwrap_or(3600),
        }
    }
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl IdentityToolkit {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, AuthError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let api_key = self.api_key.as_deref().ok_or(AuthError::NotConfigured)?;
        let url = format!("{}/accounts:{method}", self.base_url);

        let response = self
            .client
            .post(url)
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let envelope: ErrorEnvelope = response
                .json()
                .await
                .map_err(|_| AuthError::Provider(format!("identity provider returned {status}")))?;

            return Err(AuthError::from_provider_message(&envelope.error.message));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkit {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let response: TokenResponse = self.call("signUp", &body).await?;

        Ok(response.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let body = json!({ "email": email, "password": password, "returnSecureToken": true });
        let response: TokenResponse = self.call("signInWithPassword", &body).await?;

        Ok(response.into())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let body = json!({ "requestType": "PASSWORD_RESET", "email": email });
        let _: serde_json::Value = self.call("sendOobCode", &body).await?;

        Ok(())
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, AuthError> {
        let body = json!({ "idToken": id_token });
        let response: LookupResponse = self.call("lookup", &body).await?;

        response
            .users
            .into_iter()
            .next()
            .map(|user| Identity {
                uid: user.local_id,
                email: user.email,
            })
            .ok_or(AuthError::Unauthorized)
    }
}

/// Creates the account, then records it in `administradores/{uid}`.
pub async fn register_admin(
    state: &AppState,
    name: &str,
    email: &str,
    password: &str,
) -> Result<Administrator, AppError> {
    if name.trim().is_empty() {
        return Err(catalog::CatalogError::MissingField("name").into());
    }

    let session = state.identity.sign_up(email.trim(), password).await?;

    let admin = Administrator {
        uid: session.uid,
        email: if session.email.is_empty() {
            email.trim().to_string()
        } else {
            session.email
        },
        name: name.trim().to_string(),
    };
    admin.validate()?;

    state
        .store
        .set(
            &DocumentRef::administrator(&admin.uid),
            serde_json::to_value(&admin).map_err(crate::database::StoreError::from)?,
        )
        .await?;

    info!("Registered administrator {}", admin.uid);

    Ok(admin)
}

pub async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<Session, AppError> {
    Ok(state.identity.sign_in(email.trim(), password).await?)
}

pub async fn reset_password(state: &AppState, email: &str) -> Result<(), AppError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AuthError::InvalidEmail.into());
    }

    state.identity.send_password_reset(email).await?;

    Ok(())
}

/// Resolves a bearer token to a registered administrator.
pub async fn authenticate(state: &AppState, id_token: &str) -> Result<Administrator, AppError> {
    let identity = state.identity.lookup(id_token).await?;

    let Some(document) = state
        .store
        .get(&DocumentRef::administrator(&identity.uid))
        .await?
    else {
        warn!("Signed-in account {} is not an administrator", identity.uid);
        return Err(AuthError::NotAdministrator.into());
    };

    serde_json::from_value(document).map_err(|source| {
        crate::database::StoreError::Corrupt {
            document: DocumentRef::administrator(&identity.uid).to_string(),
            source,
        }
        .into()
    })
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// An authenticated administrator, taken from `Authorization: Bearer <idToken>`.
pub struct AdminSession(pub Administrator);

impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let admin = authenticate(state, token).await?;

        Ok(Self(admin))
    }
}
