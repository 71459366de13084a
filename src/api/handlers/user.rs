use crate::api::handlers::{engine_error, error_response, ErrorResponse, MessageResponse};
use crate::session::Engine;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub login: String,
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/user",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Missing or malformed payload", body = ErrorResponse),
        (status = 409, description = "Name already taken", body = ErrorResponse),
        (status = 422, description = "Invalid name or password", body = ErrorResponse)
    ),
    tag = "user"
)]
#[instrument(skip_all)]
pub async fn create(
    Extension(engine): Extension<Engine>,
    payload: Option<Json<CreateUserRequest>>,
) -> impl IntoResponse {
    let Some(Json(req)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload").into_response();
    };

    match engine.create(&req.login, &req.password).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "Created".to_string(),
            }),
        )
            .into_response(),
        Err(err) => engine_error("user create", &err).into_response(),
    }
}
