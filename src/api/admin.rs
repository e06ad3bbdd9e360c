use crate::{
    api::attendance::record_action,
    auth::auth::AuthUser,
    config::Config,
    db,
    error::AppError,
    model::{
        attendance::AttendanceAction,
        office_location::{OfficeLocation, OfficeLocationRow},
    },
    models::MessageResponse,
    utils::{office_cache, report},
};
use actix_web::{
    HttpResponse,
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// First day of the report, inclusive
    #[param(example = "2024-09-01")]
    pub start_date: Option<String>,
    /// Last day of the report, inclusive
    #[param(example = "2024-09-30")]
    pub end_date: Option<String>,
}

impl ReportQuery {
    pub fn range(&self, max_days: i64) -> Result<(NaiveDate, NaiveDate), AppError> {
        let (Some(start), Some(end)) = (
            self.start_date.as_deref().filter(|s| !s.trim().is_empty()),
            self.end_date.as_deref().filter(|s| !s.trim().is_empty()),
        ) else {
            return Err(AppError::validation(
                "Please provide both start_date and end_date.",
            ));
        };

        let parse = |value: &str| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
                AppError::validation(format!("Invalid date '{value}', expected YYYY-MM-DD."))
            })
        };
        let (start, end) = (parse(start)?, parse(end)?);

        if start > end {
            return Err(AppError::validation(
                "start_date must not be after end_date.",
            ));
        }
        if (end - start).num_days() + 1 > max_days {
            return Err(AppError::validation(format!(
                "Report range may not exceed {max_days} days."
            )));
        }

        Ok((start, end))
    }
}

/// Attendance spreadsheet, one worksheet per day
#[utoipa::path(
    get,
    path = "/admin/report",
    params(ReportQuery),
    responses(
        (status = 200, description = "xlsx workbook download"),
        (status = 400, description = "Missing or invalid dates", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = MessageResponse),
        (status = 403, description = "Not an admin", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ReportQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let (start, end) = query.range(config.report_max_days)?;

    let rows = db::attendance::rows_between(pool.get_ref(), start, end).await?;
    let days = report::group_by_day(start, end, &rows, config.offset());

    let bytes = report::build_workbook(&days).map_err(|e| {
        error!(error = %e, %start, %end, "Failed to build attendance workbook");
        AppError::Internal
    })?;

    info!(user_id = auth.user_id, %start, %end, rows = rows.len(), "Attendance report generated");

    Ok(HttpResponse::Ok()
        .content_type(report::CONTENT_TYPE)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(report::file_name(start, end))],
        })
        .body(bytes))
}

/// Ids arrive as JSON numbers or numeric strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EmployeeId {
    Number(u64),
    Text(String),
}

impl EmployeeId {
    fn value(&self) -> Option<u64> {
        let id = match self {
            EmployeeId::Number(n) => *n,
            EmployeeId::Text(s) => s.trim().parse().ok()?,
        };
        // 0 is never a row id
        (id != 0).then_some(id)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AdminCheckReq {
    #[schema(example = 3, value_type = Option<u64>)]
    pub employee_id: Option<EmployeeId>,
    #[schema(example = "checkin")]
    pub action: Option<String>,
}

impl AdminCheckReq {
    /// Lenient parse: anything unreadable counts as missing fields.
    fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    fn target(&self) -> Result<(u64, AttendanceAction), AppError> {
        let employee_id = self.employee_id.as_ref().and_then(EmployeeId::value);
        let action = self
            .action
            .as_deref()
            .and_then(|a| a.trim().parse::<AttendanceAction>().ok());

        match (employee_id, action) {
            (Some(employee_id), Some(action)) => Ok((employee_id, action)),
            _ => Err(AppError::validation(
                "Employee ID and valid action (checkin/checkout) are required.",
            )),
        }
    }
}

/// Check an employee in or out on their behalf
#[utoipa::path(
    post,
    path = "/admin/check",
    request_body = AdminCheckReq,
    responses(
        (status = 200, description = "Recorded", body = MessageResponse),
        (status = 400, description = "Invalid request or state conflict", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = MessageResponse),
        (status = 403, description = "Not an admin", body = MessageResponse),
        (status = 404, description = "Employee not found", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn admin_check(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    // permission comes before any look at the body
    auth.require_admin()?;

    let (employee_id, action) = AdminCheckReq::from_body(&body).target()?;

    if db::users::find_by_id(pool.get_ref(), employee_id).await?.is_none() {
        return Err(AppError::NotFound("Employee not found."));
    }

    record_action(pool.get_ref(), &config, employee_id, action).await?;
    info!(admin_id = auth.user_id, employee_id, ?action, "Admin override");

    Ok(HttpResponse::Ok().json(MessageResponse::new(action.success_message())))
}

/// Office the geofence is measured against
#[utoipa::path(
    get,
    path = "/admin/office",
    responses(
        (status = 200, description = "Effective office location", body = OfficeLocation),
        (status = 403, description = "Not an admin", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_office(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let office = office_cache::effective_office(pool.get_ref(), &config).await?;
    Ok(HttpResponse::Ok().json(office))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOfficeReq {
    #[schema(example = 41.311081)]
    pub latitude: f64,
    #[schema(example = 69.240562)]
    pub longitude: f64,
    /// Radius in kilometres
    #[schema(example = 0.5)]
    pub radius: f64,
}

impl UpdateOfficeReq {
    fn validate(&self) -> Result<OfficeLocationRow, AppError> {
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude)
        {
            return Err(AppError::validation("Location is out of range."));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(AppError::validation("Radius must be a positive number of kilometres."));
        }

        Ok(OfficeLocationRow {
            latitude: self.latitude,
            longitude: self.longitude,
            radius: self.radius,
        })
    }
}

/// Move the office or change its radius
#[utoipa::path(
    put,
    path = "/admin/office",
    request_body = UpdateOfficeReq,
    responses(
        (status = 200, description = "Office updated", body = OfficeLocation),
        (status = 400, description = "Invalid coordinates or radius", body = MessageResponse),
        (status = 403, description = "Not an admin", body = MessageResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_office(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: web::Json<UpdateOfficeReq>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let row = body.validate()?;
    db::office::upsert(pool.get_ref(), &row).await?;

    let office = OfficeLocation::from(row);
    office_cache::publish(&config, office.clone()).await;

    info!(
        admin_id = auth.user_id,
        latitude = office.latitude,
        longitude = office.longitude,
        radius_km = office.radius,
        "Office location updated"
    );

    Ok(HttpResponse::Ok().json(office))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(start: Option<&str>, end: Option<&str>) -> ReportQuery {
        ReportQuery {
            start_date: start.map(String::from),
            end_date: end.map(String::from),
        }
    }

    #[test]
    fn range_requires_both_dates() {
        assert_eq!(
            query(Some("2024-09-01"), None).range(366),
            Err(AppError::validation(
                "Please provide both start_date and end_date."
            ))
        );
        assert!(query(None, Some("2024-09-01")).range(366).is_err());
        assert!(query(Some(""), Some("2024-09-01")).range(366).is_err());
    }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 9, day).unwrap();
        assert_eq!(
            query(Some("2024-09-05"), Some("2024-09-05")).range(366),
            Ok((d(5), d(5)))
        );
        assert!(query(Some("2024-09-06"), Some("2024-09-05")).range(366).is_err());
    }

    #[test]
    fn range_rejects_bad_format_and_long_spans() {
        assert!(query(Some("05/09/2024"), Some("2024-09-05")).range(366).is_err());
        assert!(query(Some("2024-09-01"), Some("2024-09-30")).range(30).is_ok());
        assert!(query(Some("2024-09-01"), Some("2024-10-01")).range(30).is_err());
    }

    #[test]
    fn admin_check_accepts_numeric_string_ids() {
        let req = AdminCheckReq::from_body(br#"{"employee_id": "3", "action": "checkout"}"#);
        assert_eq!(req.target(), Ok((3, AttendanceAction::Checkout)));

        let req = AdminCheckReq::from_body(br#"{"employee_id": 7, "action": "checkin"}"#);
        assert_eq!(req.target(), Ok((7, AttendanceAction::Checkin)));
    }

    #[test]
    fn admin_check_treats_bad_input_as_missing() {
        let required = Err(AppError::validation(
            "Employee ID and valid action (checkin/checkout) are required.",
        ));
        for body in [
            &br#"{"employee_id": 0, "action": "checkin"}"#[..],
            br#"{"employee_id": "0", "action": "checkin"}"#,
            br#"{"employee_id": "abc", "action": "checkin"}"#,
            br#"{"employee_id": -4, "action": "checkin"}"#,
            br#"{"employee_id": 3}"#,
            br#"{"employee_id": 3, "action": "lunch"}"#,
            b"{not json",
            b"",
        ] {
            assert_eq!(AdminCheckReq::from_body(body).target(), required);
        }
    }

    #[test]
    fn office_update_validation() {
        let ok = UpdateOfficeReq {
            latitude: 41.3,
            longitude: 69.2,
            radius: 0.5,
        };
        assert!(ok.validate().is_ok());

        let zero_radius = UpdateOfficeReq { radius: 0.0, ..ok };
        assert!(zero_radius.validate().is_err());

        let bad_lat = UpdateOfficeReq {
            latitude: 120.0,
            longitude: 69.2,
            radius: 0.5,
        };
        assert!(bad_lat.validate().is_err());
    }
}
