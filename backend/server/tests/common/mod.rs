//! Shared fixtures: an in-memory store plus fake identity and payment providers.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use rastreando::{
    app,
    auth::{AuthError, Identity, IdentityProvider, Session},
    config::Config,
    database::MemoryStore,
    payments::{PaymentError, PaymentGateway, PaymentRequest},
    state::AppState,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

#[derive(Default)]
pub struct FakeIdentity {
    // email -> (password, uid)
    accounts: Mutex<HashMap<String, (String, String)>>,
    pub resets: Mutex<Vec<String>>,
}

impl FakeIdentity {
    fn session(uid: &str, email: &str) -> Session {
        Session {
            id_token: format!("token-{uid}"),
            refresh_token: format!("refresh-{uid}"),
            uid: uid.to_string(),
            email: email.to_string(),
            expires_in: 3600,
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let mut accounts = self.accounts.lock().unwrap();

        if accounts.contains_key(email) {
            return Err(AuthError::EmailExists);
        }
        if password.len() < 6 {
            return Err(AuthError::WeakPassword(
                "Password should be at least 6 characters".to_string(),
            ));
        }

        let uid = format!("uid-{}", accounts.len() + 1);
        accounts.insert(email.to_string(), (password.to_string(), uid.clone()));

        Ok(Self::session(&uid, email))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let accounts = self.accounts.lock().unwrap();

        match accounts.get(email) {
            Some((stored, uid)) if stored == password => Ok(Self::session(uid, email)),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        if !self.accounts.lock().unwrap().contains_key(email) {
            return Err(AuthError::InvalidCredentials);
        }

        self.resets.lock().unwrap().push(email.to_string());
        Ok(())
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, AuthError> {
        let uid = id_token
            .strip_prefix("token-")
            .ok_or(AuthError::Unauthorized)?;

        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|(_, (_, stored_uid))| stored_uid == uid)
            .map(|(email, (_, uid))| Identity {
                uid: uid.clone(),
                email: Some(email.clone()),
            })
            .ok_or(AuthError::Unauthorized)
    }
}

#[derive(Default)]
pub struct FakeGateway {
    pub calls: Mutex<Vec<(PaymentRequest, Uuid)>>,
    pub reject_with: Mutex<Option<String>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
        idempotency_key: Uuid,
    ) -> Result<Value, PaymentError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.clone(), idempotency_key));

        if let Some(message) = self.reject_with.lock().unwrap().clone() {
            return Err(PaymentError::Rejected {
                status: 400,
                message,
            });
        }

        Ok(json!({
            "id": 1234567,
            "status": "pending",
            "payment_method_id": request.payment_method_id,
            "transaction_amount": request.transaction_amount,
        }))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub identity: Arc<FakeIdentity>,
    pub gateway: Arc<FakeGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        let config = Config {
            notification_base_url: Some("https://hooks.example.com/".to_string()),
            ..Config::default()
        };
        let identity = Arc::new(FakeIdentity::default());
        let gateway = Arc::new(FakeGateway::default());

        let state = AppState::from_parts(
            config,
            Arc::new(MemoryStore::default()),
            identity.clone(),
            gateway.clone(),
        );

        Self {
            router: app(state.clone()),
            state,
            identity,
            gateway,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, None, None)).await
    }

    pub async fn get_as(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, None, Some(token))).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, Some(body), None)).await
    }

    pub async fn post_as(&self, uri: &str, body: Value, token: &str) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, Some(body), Some(token)))
            .await
    }

    pub async fn put_as(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::PUT, uri, Some(body), token)).await
    }

    /// Registers an administrator and returns its id token.
    pub async fn admin(&self, name: &str, email: &str) -> String {
        let (status, _) = self
            .post(
                "/auth/sign-up",
                json!({ "name": name, "email": email, "password": "segredo123" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, session) = self
            .post(
                "/auth/sign-in",
                json!({ "email": email, "password": "segredo123" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        session["idToken"].as_str().unwrap().to_string()
    }
}

pub fn request(method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
