use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web::Data,
};
use tracing::debug;

use crate::{
    auth::{auth::AuthUser, jwt::verify_token},
    config::Config,
    error::AppError,
    models::TokenType,
};

/// Resolves the bearer access token into an [`AuthUser`] or answers 401 on its own.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => return Ok(reject(req, "Authentication credentials were not provided.")),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t.to_owned(),
        None => return Ok(reject(req, "Authorization header must start with Bearer")),
    };

    let claims = match verify_token(&token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            return Ok(reject(req, "Invalid or expired token"));
        }
    };

    if claims.token_type != TokenType::Access {
        return Ok(reject(req, "Invalid or expired token"));
    }

    req.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role: claims.role,
    });

    next.call(req).await
}

fn reject(req: ServiceRequest, message: &'static str) -> ServiceResponse<BoxBody> {
    req.into_response(AppError::Unauthorized(message).error_response())
}
