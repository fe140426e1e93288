//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use transfers_types::{
    AccountRepository, AppError, CreateTransferRequest, CreateUserRequest, ErrorResponse,
    HealthResponse, TransferId, TransferRepository, TransferResponse, UserId, UserResponse,
};

use crate::service::{TransferService, UserService};

/// Application state shared across handlers.
pub struct AppState<R: AccountRepository + TransferRepository> {
    pub users: UserService<R>,
    pub transfers: TransferService<R>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(AppError::bad_request(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self.0, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }

        let body = ErrorResponse {
            errors: self.0.messages(),
        };
        (status, Json(body)).into_response()
    }
}

fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request(format!("invalid user id: {}", raw)))
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK".into(),
    })
}

/// Execute a transfer between two users.
#[tracing::instrument(skip_all)]
pub async fn create_transfer<R: AccountRepository + TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<CreateTransferRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let cmd = req.validate().map_err(AppError::Validation)?;

    let transfer = state
        .transfers
        .transfer(cmd)
        .await
        .map_err(AppError::from)?;
    Ok((StatusCode::CREATED, Json(TransferResponse::from(&transfer))))
}

/// Get a transfer by ID.
#[tracing::instrument(skip(state), fields(transfer_id = %id))]
pub async fn get_transfer<R: AccountRepository + TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transfer_id: TransferId = id
        .parse()
        .map_err(|_| AppError::bad_request(format!("invalid transfer id: {}", id)))?;

    let transfer = state.transfers.get_transfer(transfer_id).await?;
    Ok(Json(TransferResponse::from(&transfer)))
}

/// Register a user.
#[tracing::instrument(skip_all)]
pub async fn create_user<R: AccountRepository + TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let user = state.users.create_user(req).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Get user by ID.
#[tracing::instrument(skip(state), fields(user_id = %id))]
pub async fn get_user<R: AccountRepository + TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&id)?;
    let user = state.users.get_user(user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// List transfers a user sent or received.
#[tracing::instrument(skip(state), fields(user_id = %id))]
pub async fn list_user_transfers<R: AccountRepository + TransferRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&id)?;
    let transfers = state.transfers.list_for_user(user_id).await?;
    let body: Vec<TransferResponse> = transfers.iter().map(TransferResponse::from).collect();
    Ok(Json(body))
}
