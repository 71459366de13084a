use crate::api::auth::{self, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::api::handlers::{engine_error, error_response, ErrorResponse};
use crate::session::Engine;
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub username: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated; token pair in body and cookies", body = LoginResponse),
        (status = 400, description = "Missing or malformed payload", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    Extension(engine): Extension<Engine>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let Some(Json(req)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload").into_response();
    };

    match engine.login(&req.login, &req.password).await {
        Ok(pair) => {
            let mut headers = HeaderMap::new();
            if let Ok(cookie) = auth::token_cookie(ACCESS_COOKIE, &pair.access, engine.access_ttl())
            {
                headers.append(SET_COOKIE, cookie);
            }
            if let Ok(cookie) =
                auth::token_cookie(REFRESH_COOKIE, &pair.refresh, engine.refresh_ttl())
            {
                headers.append(SET_COOKIE, cookie);
            }

            let body = Json(LoginResponse {
                username: req.login,
                access_token: pair.access,
                refresh_token: pair.refresh,
            });
            (headers, body).into_response()
        }
        Err(err) => engine_error("login", &err).into_response(),
    }
}
