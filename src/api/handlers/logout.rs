use crate::api::auth::{self, AuthUser, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::api::handlers::{engine_error, ErrorResponse, MessageResponse};
use crate::session::Engine;
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Json},
};
use tracing::instrument;

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Cookies cleared", body = MessageResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(
    Extension(engine): Extension<Engine>,
    Extension(user): Extension<AuthUser>,
) -> impl IntoResponse {
    // Stateless on the engine side: outstanding tokens are not revoked,
    // only the client-held cookies are cleared.
    match engine.logout(&user.name).await {
        Ok(()) => {
            let mut headers = HeaderMap::new();
            for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
                if let Ok(cookie) = auth::clear_cookie(name) {
                    headers.append(SET_COOKIE, cookie);
                }
            }
            (
                headers,
                Json(MessageResponse {
                    message: "OK".to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => engine_error("logout", &err).into_response(),
    }
}
