use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use catalog::{Administrator, CancerType, Combination, ListKind, Neoplasia, Sex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{
    auth::{self, AdminSession, AuthError, Session, bearer_token},
    content::{self, SaveReport, Scope, StoredCancerType},
    error::AppError,
    payments::{self, CardPayment, Envelope, PaymentError, PixPayment},
    state::AppState,
};

type Shared = State<Arc<AppState>>;

#[derive(Deserialize)]
pub struct CombinationPath {
    sexo: String,
    neoplasia: String,
}

#[derive(Deserialize)]
pub struct SexPath {
    sexo: String,
}

#[derive(Deserialize)]
pub struct ScopeParams {
    #[serde(default)]
    scope: Scope,
}

#[derive(Deserialize)]
pub struct SexQuery {
    sexo: Option<String>,
}

#[derive(Serialize)]
pub struct NeoplasiaOption {
    value: Neoplasia,
    label: &'static str,
}

#[derive(Deserialize)]
pub struct ItemsPayload<T> {
    items: Vec<T>,
}

#[derive(Serialize)]
pub struct ItemsView<T> {
    sexo: Sex,
    #[serde(skip_serializing_if = "Option::is_none")]
    neoplasia: Option<Neoplasia>,
    items: Vec<T>,
}

#[derive(Deserialize)]
pub struct IndicationPayload {
    #[serde(default)]
    texto: String,
}

#[derive(Deserialize)]
pub struct SignUpRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    email: String,
}

pub async fn index_handler() -> impl IntoResponse {
    format!("Rastreando v{}", env!("CARGO_PKG_VERSION"))
}

pub async fn neoplasias_handler(
    query: Result<Query<SexQuery>, QueryRejection>,
) -> Result<Json<Vec<NeoplasiaOption>>, AppError> {
    let Query(query) = query?;
    let sex: Sex = query
        .sexo
        .ok_or_else(|| AppError::MalformedPayload("missing `sexo`".to_string()))?
        .parse()?;

    Ok(Json(
        sex.neoplasias()
            .iter()
            .map(|&neoplasia| NeoplasiaOption {
                value: neoplasia,
                label: neoplasia.label(),
            })
            .collect(),
    ))
}

pub async fn sign_up_handler(
    State(state): Shared,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Administrator>), AppError> {
    let Json(request) = payload?;
    let admin =
        auth::register_admin(&state, &request.name, &request.email, &request.password).await?;

    Ok((StatusCode::CREATED, Json(admin)))
}

pub async fn sign_in_handler(
    State(state): Shared,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<Session>, AppError> {
    let Json(request) = payload?;

    Ok(Json(
        auth::sign_in(&state, &request.email, &request.password).await?,
    ))
}

pub async fn password_reset_handler(
    State(state): Shared,
    payload: Result<Json<PasswordResetRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(request) = payload?;
    auth::reset_password(&state, &request.email).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Resolves the caller only when the request asks for its own copy.
async fn reader(
    state: &AppState,
    headers: &HeaderMap,
    scope: Scope,
) -> Result<Option<Administrator>, AppError> {
    match scope {
        Scope::All => Ok(None),
        Scope::Own => {
            let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
            Ok(Some(auth::authenticate(state, token).await?))
        }
    }
}

pub async fn get_combination_list<K: ListKind>(
    State(state): Shared,
    Path(path): Path<CombinationPath>,
    params: Result<Query<ScopeParams>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<ItemsView<K::Item>>, AppError> {
    let Query(params) = params?;
    let combination = Combination::parse(&path.sexo, &path.neoplasia)?;
    let key = combination.key();

    let items = match reader(&state, &headers, params.scope).await? {
        Some(admin) => content::read_own_list::<K>(state.store.as_ref(), &admin.uid, &key).await?,
        None => content::read_list::<K>(state.store.as_ref(), &key).await?,
    };

    Ok(Json(ItemsView {
        sexo: combination.sex(),
        neoplasia: Some(combination.neoplasia()),
        items,
    }))
}

pub async fn put_combination_list<K: ListKind>(
    State(state): Shared,
    AdminSession(admin): AdminSession,
    Path(path): Path<CombinationPath>,
    params: Result<Query<ScopeParams>, QueryRejection>,
    payload: Result<Json<ItemsPayload<K::Item>>, JsonRejection>,
) -> Result<Json<SaveReport>, AppError> {
    let Query(params) = params?;
    let Json(payload) = payload?;
    let combination = Combination::parse(&path.sexo, &path.neoplasia)?;

    let report = content::save_list::<K>(
        state.store.as_ref(),
        &admin.uid,
        params.scope,
        &combination.key(),
        payload.items,
    )
    .await?;

    Ok(Json(report))
}

pub async fn get_sex_list<K: ListKind>(
    State(state): Shared,
    Path(path): Path<SexPath>,
    params: Result<Query<ScopeParams>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<ItemsView<K::Item>>, AppError> {
    let Query(params) = params?;
    let sex: Sex = path.sexo.parse()?;

    let items = match reader(&state, &headers, params.scope).await? {
        Some(admin) => {
            content::read_own_list::<K>(state.store.as_ref(), &admin.uid, sex.as_str()).await?
        }
        None => content::read_list::<K>(state.store.as_ref(), sex.as_str()).await?,
    };

    Ok(Json(ItemsView {
        sexo: sex,
        neoplasia: None,
        items,
    }))
}

pub async fn put_sex_list<K: ListKind>(
    State(state): Shared,
    AdminSession(admin): AdminSession,
    Path(path): Path<SexPath>,
    params: Result<Query<ScopeParams>, QueryRejection>,
    payload: Result<Json<ItemsPayload<K::Item>>, JsonRejection>,
) -> Result<Json<SaveReport>, AppError> {
    let Query(params) = params?;
    let Json(payload) = payload?;
    let sex: Sex = path.sexo.parse()?;

    let report = content::save_list::<K>(
        state.store.as_ref(),
        &admin.uid,
        params.scope,
        sex.as_str(),
        payload.items,
    )
    .await?;

    Ok(Json(report))
}

pub async fn get_indication_handler(
    State(state): Shared,
    Path(path): Path<CombinationPath>,
    params: Result<Query<ScopeParams>, QueryRejection>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let combination = Combination::parse(&path.sexo, &path.neoplasia)?;

    let indication = match reader(&state, &headers, params.scope).await? {
        Some(admin) => {
            content::read_own_indication(state.store.as_ref(), &admin.uid, combination).await?
        }
        None => content::read_indication(state.store.as_ref(), combination).await?,
    };

    Ok(Json(indication))
}

pub async fn put_indication_handler(
    State(state): Shared,
    AdminSession(admin): AdminSession,
    Path(path): Path<CombinationPath>,
    params: Result<Query<ScopeParams>, QueryRejection>,
    payload: Result<Json<IndicationPayload>, JsonRejection>,
) -> Result<Json<SaveReport>, AppError> {
    let Query(params) = params?;
    let Json(payload) = payload?;
    let combination = Combination::parse(&path.sexo, &path.neoplasia)?;

    let report = content::save_indication(
        state.store.as_ref(),
        &admin.uid,
        params.scope,
        combination,
        payload.texto,
    )
    .await?;

    Ok(Json(report))
}

pub async fn list_cancer_types_handler(
    State(state): Shared,
) -> Result<Json<Vec<StoredCancerType>>, AppError> {
    Ok(Json(content::list_cancer_types(state.store.as_ref()).await?))
}

pub async fn add_cancer_type_handler(
    State(state): Shared,
    AdminSession(_admin): AdminSession,
    payload: Result<Json<CancerType>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredCancerType>), AppError> {
    let Json(cancer_type) = payload?;
    let stored = content::add_cancer_type(state.store.as_ref(), cancer_type).await?;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Relay failures of any kind, unreadable bodies included, answer 500.
fn malformed_payment(rejection: JsonRejection) -> PaymentError {
    PaymentError::Malformed(rejection.body_text())
}

pub async fn process_payment_handler(
    State(state): Shared,
    payload: Result<Json<Envelope<CardPayment>>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(envelope) = payload.map_err(malformed_payment)?;
    let result = payments::relay(state.payments.as_ref(), envelope.body.into()).await?;

    Ok(Json(result))
}

pub async fn create_pix_handler(
    State(state): Shared,
    payload: Result<Json<Envelope<PixPayment>>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(envelope) = payload.map_err(malformed_payment)?;
    let request = envelope
        .body
        .into_request(state.config.notification_base_url.as_deref());
    let result = payments::relay(state.payments.as_ref(), request).await?;

    Ok(Json(result))
}

/// Acknowledges provider notifications, nothing is stored.
pub async fn webhook_handler(payload: Result<Json<Value>, JsonRejection>) -> StatusCode {
    let Ok(Json(notification)) = payload else {
        info!("Received payment notification without a JSON body");
        return StatusCode::OK;
    };

    let field = |name: &str| {
        notification
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or("-")
            .to_string()
    };
    let data_id = notification
        .pointer("/data/id")
        .map(|id| match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "-".to_string());

    info!(
        "Payment notification type={} action={} id={data_id}",
        field("type"),
        field("action")
    );

    StatusCode::OK
}
