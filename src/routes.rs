use crate::{
    api::{admin, attendance},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

/// Malformed bodies and query strings answer like any other validation failure.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let prefix = config.api_prefix.as_str();

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    extractor_config(cfg);

    // Public routes; registered before the catch-all protected scope
    cfg.service(
        web::resource(format!("{prefix}/login"))
            .wrap(login_limiter.clone())
            .route(web::post().to(handlers::login)),
    )
    .service(
        web::resource(format!("{prefix}/token/refresh"))
            .wrap(refresh_limiter.clone())
            .route(web::post().to(handlers::refresh_token)),
    )
    .service(
        web::resource(format!("{prefix}/logout"))
            .wrap(refresh_limiter)
            .route(web::post().to(handlers::logout)),
    );

    // Protected routes
    cfg.service(
        web::scope(prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/checkin").route(web::post().to(attendance::check_in)))
            .service(web::resource("/checkout").route(web::post().to(attendance::check_out)))
            .service(web::resource("/is_admin").route(web::get().to(handlers::is_admin)))
            .service(web::resource("/users").route(web::get().to(handlers::list_users)))
            .service(
                web::resource("/user/change_password")
                    .route(web::post().to(handlers::change_password)),
            )
            .service(
                web::scope("/admin")
                    // /admin/report?start_date=..&end_date=..
                    .service(web::resource("/report").route(web::get().to(admin::report)))
                    // /admin/check
                    .service(web::resource("/check").route(web::post().to(admin::admin_check)))
                    // /admin/office
                    .service(
                        web::resource("/office")
                            .route(web::get().to(admin::get_office))
                            .route(web::put().to(admin::update_office)),
                    ),
            ),
    );
}
