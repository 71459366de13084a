//! `OpenAPI` document for the HTTP surface, served at `/openapi.json`.

use axum::response::Json;
use utoipa::OpenApi;

use super::handlers::login::{LoginRequest, LoginResponse};
use super::handlers::user::CreateUserRequest;
use super::handlers::{ErrorResponse, MessageResponse};
use crate::session::UserInfo;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::health::health,
        super::handlers::login::login,
        super::handlers::logout::logout,
        super::handlers::user::create,
        super::handlers::validate::validate,
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        CreateUserRequest,
        UserInfo,
        ErrorResponse,
        MessageResponse
    )),
    tags(
        (name = "auth", description = "Session authentication"),
        (name = "user", description = "User management"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub async fn serve() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
