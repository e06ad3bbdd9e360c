use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, validate_new_password, verify_password},
    },
    config::Config,
    db,
    error::AppError,
    model::{role::Role, user::User},
    models::{
        LoginReqDto, LoginResponse, MessageResponse, PasswordChangeDto, RefreshReqDto, TokenPair,
        TokenType,
    },
};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

const INVALID_CREDENTIALS: AppError = AppError::Unauthorized("Invalid credentials");

fn issue_pair(
    user_id: u64,
    username: &str,
    role: Role,
    config: &Config,
) -> Result<(TokenPair, crate::models::Claims), AppError> {
    let access = generate_access_token(
        user_id,
        username.to_string(),
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )?;

    let (refresh, refresh_claims) = generate_refresh_token(
        user_id,
        username.to_string(),
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )?;

    Ok((TokenPair { access, refresh }, refresh_claims))
}

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse)
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.login)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if user.login.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty login or password");
        return Err(INVALID_CREDENTIALS);
    }

    let db_user = match db::users::find_by_username(pool.get_ref(), user.login.trim()).await? {
        Some(u) => u,
        None => {
            info!("Invalid credentials: user not found");
            return Err(INVALID_CREDENTIALS);
        }
    };

    if !db_user.is_active {
        info!(user_id = db_user.id, "Invalid credentials: user inactive");
        return Err(INVALID_CREDENTIALS);
    }

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(INVALID_CREDENTIALS);
    }

    let role = Role::from_db(&db_user.role);
    let (pair, refresh_claims) = issue_pair(db_user.id, &db_user.username, role, &config)?;

    debug!(user_id = db_user.id, jti = %refresh_claims.jti, "Storing refresh token");
    db::tokens::store_refresh(pool.get_ref(), &refresh_claims).await?;

    if let Err(e) = db::users::touch_last_login(pool.get_ref(), db_user.id).await {
        // not worth failing the login over
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access: pair.access,
        refresh: pair.refresh,
        role,
        first_name: db_user.first_name,
        last_name: db_user.last_name,
    }))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/token/refresh",
    request_body = RefreshReqDto,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid or revoked refresh token", body = MessageResponse)
    ),
    tag = "Auth"
)]
pub async fn refresh_token(
    body: web::Json<RefreshReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let invalid = AppError::Unauthorized("Token is invalid or expired");

    let claims = verify_token(&body.refresh, &config.jwt_secret).map_err(|_| invalid.clone())?;
    if claims.token_type != TokenType::Refresh {
        return Err(invalid);
    }

    // rotation: the presented token is spent whether or not the rest succeeds
    if !db::tokens::revoke(pool.get_ref(), &claims.jti).await? {
        info!(user_id = claims.user_id, "Refresh token reuse or unknown jti");
        return Err(invalid);
    }

    // role may have changed since the token was issued
    let db_user = match db::users::find_by_id(pool.get_ref(), claims.user_id).await? {
        Some(u) if u.is_active => u,
        _ => return Err(invalid),
    };

    let (pair, refresh_claims) = issue_pair(
        db_user.id,
        &db_user.username,
        Role::from_db(&db_user.role),
        &config,
    )?;
    db::tokens::store_refresh(pool.get_ref(), &refresh_claims).await?;

    Ok(HttpResponse::Ok().json(pair))
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/logout",
    request_body = RefreshReqDto,
    responses((status = 204, description = "Logged out")),
    tag = "Auth"
)]
pub async fn logout(
    body: web::Json<RefreshReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    // idempotent: unknown or malformed tokens still get 204
    if let Ok(claims) = verify_token(&body.refresh, &config.jwt_secret) {
        if claims.token_type == TokenType::Refresh {
            db::tokens::revoke(pool.get_ref(), &claims.jti).await?;
        }
    }

    Ok(HttpResponse::NoContent().finish())
}

#[derive(Serialize, ToSchema)]
pub struct IsAdminResponse {
    pub is_admin: bool,
}

/// Whether the caller has the admin role
#[utoipa::path(
    get,
    path = "/is_admin",
    responses(
        (status = 200, description = "Role check", body = IsAdminResponse),
        (status = 401, description = "Unauthorized", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn is_admin(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(IsAdminResponse {
        is_admin: auth.is_admin(),
    })
}

/// Change the caller's password
#[utoipa::path(
    post,
    path = "/user/change_password",
    request_body = PasswordChangeDto,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Wrong current password or weak new password", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    auth: AuthUser,
    body: web::Json<PasswordChangeDto>,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let db_user = db::users::find_by_id(pool.get_ref(), auth.user_id)
        .await?
        .ok_or(AppError::Unauthorized("User no longer exists"))?;

    if verify_password(&body.current_password, &db_user.password).is_err() {
        return Err(AppError::validation("Current password is incorrect."));
    }

    validate_new_password(&body.current_password, &body.new_password)
        .map_err(AppError::validation)?;

    let hashed = hash_password(&body.new_password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        AppError::Internal
    })?;
    db::users::update_password(pool.get_ref(), db_user.id, &hashed).await?;

    let revoked = db::tokens::revoke_all_for_user(pool.get_ref(), db_user.id).await?;
    info!(user_id = db_user.id, revoked, "Password changed");

    Ok(HttpResponse::Ok().json(MessageResponse::new("Password changed successfully")))
}

/// List all users
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 401, description = "Unauthorized", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let users: Vec<User> = db::users::list(pool.get_ref())
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(HttpResponse::Ok().json(users))
}
