use crate::api::admin::{AdminCheckReq, UpdateOfficeReq};
use crate::api::attendance::LocationReq;
use crate::auth::handlers::IsAdminResponse;
use crate::model::office_location::{OfficeLocation, OfficeSource};
use crate::model::role::Role;
use crate::model::user::User;
use crate::models::{
    LoginReqDto, LoginResponse, MessageResponse, PasswordChangeDto, RefreshReqDto, TokenPair,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Tracker

Employees check in and out from the office; check-in/out is only accepted within
the office geofence (0.5 km by default).

### Key Features
- **Attendance**: daily check-in and check-out, one record per employee per day
- **Admin reports**: date-range spreadsheet export, one worksheet per day
- **Admin override**: check employees in or out on their behalf
- **Office location**: coordinates and radius managed by admins

### Security
Endpoints other than login, token refresh and logout require a **JWT Bearer** access token.
Report, override and office endpoints require the **admin** role.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::is_admin,
        crate::auth::handlers::change_password,
        crate::auth::handlers::list_users,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,

        crate::api::admin::report,
        crate::api::admin::admin_check,
        crate::api::admin::get_office,
        crate::api::admin::update_office
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            RefreshReqDto,
            TokenPair,
            PasswordChangeDto,
            MessageResponse,
            IsAdminResponse,
            Role,
            User,
            LocationReq,
            AdminCheckReq,
            UpdateOfficeReq,
            OfficeLocation,
            OfficeSource
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, tokens and passwords"),
        (name = "Users", description = "User directory"),
        (name = "Attendance", description = "Geofenced check-in and check-out"),
        (name = "Admin", description = "Reports, overrides and office settings"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
