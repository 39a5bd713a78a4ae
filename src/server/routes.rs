use axum::{
    extract::{rejection::FormRejection, State},
    Form,
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tower_sessions::Session;
use crate::password;
use crate::product::{Product, ProductUpdate, normalize_name};
use crate::server::AppState;
use crate::server::session;
use crate::storage::users::normalize_username;

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub cost_price: f64,
    pub sell_price: f64,
    pub in_stock: i64,
}

/// Update form. A blank or missing field means "leave as is".
#[derive(Deserialize)]
pub struct ProductChange {
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub cost_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub sell_price: Option<f64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub in_stock: Option<i64>,
}

#[derive(Deserialize)]
pub struct ProductName {
    pub name: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self { message: message.into() })
    }
}

#[derive(Serialize)]
pub struct HomeResponse {
    pub has_users: bool,
    pub user: Option<String>,
}

#[derive(Serialize)]
pub struct UpdateResponse {
    pub name: String,
    pub updated: bool,
}

/// Failure of a request, rendered as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    Store(crate::Error),
    Unauthorized(String),
    Forbidden(String),
    /// Form body that could not be parsed
    BadForm(String),
    Internal(String),
}

impl From<crate::Error> for ApiError {
    fn from(e: crate::Error) -> Self {
        ApiError::Store(e)
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadForm(rejection.body_text())
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(e: tower_sessions::session::Error) -> Self {
        ApiError::Internal(format!("Session error: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use crate::Error;

        let (status, error) = match self {
            ApiError::Store(e) => {
                let status = match &e {
                    Error::DuplicateUser(_) | Error::ProductExists(_) => StatusCode::CONFLICT,
                    Error::ProductNotFound(_) => StatusCode::NOT_FOUND,
                    Error::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Request failed: {}", e);
                }
                (status, e.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadForm(msg) => {
                tracing::debug!("Rejected form: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            ApiError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Run a blocking store call off the async reactor.
async fn blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError::Internal(format!("Store task failed: {}", e)))?
        .map_err(ApiError::from)
}

async fn require_user(session: &Session) -> Result<String, ApiError> {
    session::current_user(session).await?.ok_or_else(|| {
        tracing::debug!("Rejected request without an active session");
        ApiError::Unauthorized("An active session is required".to_string())
    })
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

// ========== Account ==========

pub async fn home(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<HomeResponse>, ApiError> {
    let users = state.users.clone();
    let has_users = blocking(move || users.has_any_users()).await?;
    let user = session::current_user(&session).await?;

    Ok(Json(HomeResponse { has_users, user }))
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: Result<Form<Credentials>, FormRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if let Some(user) = session::current_user(&session).await? {
        tracing::warn!("Signup attempted while '{}' is signed in", user);
        return Err(ApiError::Forbidden("Sign out before creating another account".to_string()));
    }
    let Form(form) = form?;

    let username = normalize_username(&form.username)?;
    let users = state.users.clone();
    blocking(move || {
        let hash = password::hash_password(&form.password)?;
        users.register(&form.username, &hash)
    })
    .await?;

    tracing::info!("User '{}' registered", username);
    Ok((StatusCode::CREATED, MessageResponse::new(format!("Account '{}' created", username))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: Result<Form<Credentials>, FormRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Form(form) = form?;
    let username = normalize_username(&form.username)?;
    let users = state.users.clone();
    let outcome = blocking(move || users.authenticate(&form.username, &form.password)).await?;

    if outcome.is_authenticated() {
        session::set_current_user(&session, &username).await?;
        tracing::info!("User '{}' signed in", username);
        Ok(MessageResponse::new(format!("Welcome, {}", username)))
    } else if outcome.username_matched {
        tracing::warn!("Wrong password for '{}'", username);
        Err(ApiError::Unauthorized("Incorrect password".to_string()))
    } else {
        Err(ApiError::Unauthorized("No account registered with that username".to_string()))
    }
}

pub async fn signout(session: Session) -> Result<Json<MessageResponse>, ApiError> {
    match session::clear_current_user(&session).await? {
        Some(user) => {
            tracing::info!("User '{}' signed out", user);
            Ok(MessageResponse::new("Signed out"))
        }
        None => {
            tracing::debug!("Signout without an active session");
            Ok(MessageResponse::new("There was no user to sign out"))
        }
    }
}

// ========== Products ==========

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Vec<Product>>, ApiError> {
    require_user(&session).await?;
    let products = state.products.clone();
    Ok(Json(blocking(move || products.list_all()).await?))
}

pub async fn list_names(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Vec<String>>, ApiError> {
    require_user(&session).await?;
    let products = state.products.clone();
    Ok(Json(blocking(move || products.list_names()).await?))
}

pub async fn add_product(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: Result<Form<NewProduct>, FormRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let user = require_user(&session).await?;
    let Form(form) = form?;
    let products = state.products.clone();
    let name = normalize_name(&form.name)?;
    blocking(move || products.add(&form.name, form.cost_price, form.sell_price, form.in_stock)).await?;

    tracing::info!("'{}' added product '{}'", user, name);
    Ok((StatusCode::CREATED, MessageResponse::new(format!("Product '{}' added", name))))
}

pub async fn update_product(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: Result<Form<ProductChange>, FormRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    require_user(&session).await?;
    let Form(form) = form?;
    let products = state.products.clone();
    let name = normalize_name(&form.name)?;
    let change = ProductUpdate {
        cost_price: form.cost_price,
        sell_price: form.sell_price,
        in_stock: form.in_stock,
    };
    let updated = blocking(move || products.update(&form.name, change)).await?;

    Ok(Json(UpdateResponse { name, updated }))
}

pub async fn remove_product(
    State(state): State<Arc<AppState>>,
    session: Session,
    form: Result<Form<ProductName>, FormRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = require_user(&session).await?;
    let Form(form) = form?;
    let products = state.products.clone();
    let name = normalize_name(&form.name)?;
    blocking(move || products.remove(&form.name)).await?;

    tracing::info!("'{}' removed product '{}'", user, name);
    Ok(MessageResponse::new(format!("Product '{}' removed", name)))
}
