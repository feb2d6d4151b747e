use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use crate::auth::jwt::verify_token;
use crate::error::AppError;

/// Identity of the caller, attached as a request extension once the token
/// checks out. Handlers take this instead of reaching into any global
/// session state.
#[derive(Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: String,
    pub username: String,
}

pub async fn require_auth(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let auth_header = match req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok()) {
        Some(h) => h,
        None => return unauthorized("Missing Authorization header"),
    };

    // Expect "Bearer <token>"
    let token = match auth_header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return unauthorized("Invalid Authorization format"),
    };

    let secret = match std::env::var("JWT_SECRET") {
        Ok(s) => s,
        Err(_) => return unauthorized("Server auth misconfiguration"),
    };

    let claims = match verify_token(token, &secret) {
        Ok(c) => c,
        Err(e) => return unauthorized(&format!("{e:?}")),
    };

    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        role: claims.role,
        username: claims.username,
    });

    next.run(req).await
}

/// Admin gate for everything under /admin. Runs after require_auth, so the
/// extension is always present.
pub async fn require_admin(req: Request<axum::body::Body>, next: Next) -> Response {
    let is_admin = req.extensions().get::<AuthContext>().map(|ctx| ctx.role == "admin");
    match is_admin {
        Some(true) => next.run(req).await,
        Some(false) => AppError::forbidden("Admin access required").into_response(),
        None => unauthorized("Missing authentication context"),
    }
}

fn unauthorized(reason: &str) -> Response {
    tracing::debug!(reason, "Rejecting unauthenticated request");
    AppError::Unauthorized.into_response()
}
