use crate::api::auth::AuthUser;
use crate::api::handlers::{engine_error, ErrorResponse};
use crate::session::{Engine, UserInfo};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/validate",
    responses(
        (status = 200, description = "Public projection of the authenticated user", body = UserInfo),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn validate(
    Extension(engine): Extension<Engine>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    match engine.info(&user.name).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(err) => engine_error("validate", &err).into_response(),
    }
}
