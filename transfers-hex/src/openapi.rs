//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use transfers_types::domain::{Currency, DocumentType, Roles, TransferId, TypeUser, UserId};
use transfers_types::dto::{
    CreateTransferRequest, CreateUserRequest, DocumentPayload, DocumentResponse, ErrorResponse,
    HealthResponse, TransferResponse, UserResponse, WalletPayload, WalletResponse,
};
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
async fn health() {}

/// Execute a transfer
///
/// Checks the payer's role and balance, asks the external authorizer, then
/// debits the payer and credits the payee atomically.
#[utoipa::path(
    post,
    path = "/transfers",
    tag = "transfers",
    request_body = CreateTransferRequest,
    responses(
        (status = 201, description = "Transfer committed", body = TransferResponse),
        (status = 400, description = "Invalid input or self-transfer", body = ErrorResponse),
        (status = 403, description = "Payer may not transfer, or authorization denied", body = ErrorResponse),
        (status = 404, description = "Payer or payee not found", body = ErrorResponse),
        (status = 422, description = "Insufficient balance", body = ErrorResponse),
        (status = 503, description = "Authorizer unavailable", body = ErrorResponse)
    )
)]
async fn create_transfer() {}

/// Get transfer by ID
#[utoipa::path(
    get,
    path = "/transfers/{id}",
    tag = "transfers",
    params(
        ("id" = String, Path, description = "Transfer ID (UUID)")
    ),
    responses(
        (status = 200, description = "Transfer found", body = TransferResponse),
        (status = 400, description = "Invalid transfer ID", body = ErrorResponse),
        (status = 404, description = "Transfer not found", body = ErrorResponse)
    )
)]
async fn get_transfer() {}

/// Register a user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email or document already registered", body = ErrorResponse)
    )
)]
async fn create_user() {}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = String, Path, description = "User ID (UUID)")
    ),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, description = "Invalid user ID", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
async fn get_user() {}

/// List transfers for a user
#[utoipa::path(
    get,
    path = "/users/{id}/transfers",
    tag = "users",
    params(
        ("id" = String, Path, description = "User ID (UUID)")
    ),
    responses(
        (status = 200, description = "Transfers sent or received, newest first", body = Vec<TransferResponse>),
        (status = 400, description = "Invalid user ID", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
async fn list_user_transfers() {}

/// OpenAPI documentation for the Transfers API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Transfers Service API",
        version = "1.0.0",
        description = "Peer-to-peer money transfers between users, with external authorization and asynchronous notifications.\n\nAmounts are integers in centavos (BRL). Every failure body has the shape `{\"errors\": [\"...\"]}`.",
        license(name = "MIT"),
    ),
    paths(
        health,
        create_transfer,
        get_transfer,
        create_user,
        get_user,
        list_user_transfers,
    ),
    components(
        schemas(
            CreateTransferRequest,
            TransferResponse,
            CreateUserRequest,
            DocumentPayload,
            WalletPayload,
            UserResponse,
            DocumentResponse,
            WalletResponse,
            ErrorResponse,
            HealthResponse,
            Currency,
            DocumentType,
            TypeUser,
            Roles,
            UserId,
            TransferId,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "User registration and lookup"),
        (name = "transfers", description = "Money transfers between users"),
    )
)]
pub struct ApiDoc;
