use crate::{
    auth::auth::AuthUser,
    config::Config,
    db,
    error::AppError,
    model::attendance::{AttendanceAction, AttendanceState, work_date},
    models::MessageResponse,
    utils::office_cache,
};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

/// Coordinates arrive as JSON numbers or numeric strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn value(&self) -> Option<f64> {
        let v = match self {
            Coordinate::Number(n) => *n,
            Coordinate::Text(s) => s.trim().parse().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationReq {
    #[schema(example = 41.311081, value_type = Option<f64>)]
    pub latitude: Option<Coordinate>,
    #[schema(example = 69.240562, value_type = Option<f64>)]
    pub longitude: Option<Coordinate>,
}

impl LocationReq {
    /// `(latitude, longitude)` in degrees, range-checked.
    pub fn coordinates(&self) -> Result<(f64, f64), AppError> {
        let (Some(lat), Some(lon)) = (&self.latitude, &self.longitude) else {
            return Err(AppError::validation("Location is required."));
        };

        let (Some(lat), Some(lon)) = (lat.value(), lon.value()) else {
            return Err(AppError::validation("Location must be numeric."));
        };

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(AppError::validation("Location is out of range."));
        }

        Ok((lat, lon))
    }
}

/// Applies `action` to today's record of `employee_id`. Shared by the employee and admin endpoints.
pub async fn record_action(
    pool: &MySqlPool,
    config: &Config,
    employee_id: u64,
    action: AttendanceAction,
) -> Result<(), AppError> {
    let now = Utc::now();
    let today = work_date(now, config.offset());
    let existing = db::attendance::find_for_day(pool, employee_id, today).await?;
    let state = AttendanceState::of(existing.as_ref());

    state.apply(action)?;

    let written = match (action, existing) {
        // the unique key settles concurrent check-ins
        (AttendanceAction::Checkin, _) => {
            db::attendance::insert_check_in(pool, employee_id, today, now.naive_utc()).await?
        }
        (AttendanceAction::Checkout, Some(record)) => {
            db::attendance::set_check_out(pool, record.id, now.naive_utc()).await?
        }
        (AttendanceAction::Checkout, None) => return Err(AppError::NoCheckin),
    };
    settle(action, written)?;

    info!(employee_id, ?action, %today, "Attendance recorded");
    Ok(())
}

/// A write that changed nothing lost a race with another request for the same day.
fn settle(action: AttendanceAction, written: bool) -> Result<(), AppError> {
    match (action, written) {
        (_, true) => Ok(()),
        (AttendanceAction::Checkin, false) => Err(AppError::AlreadyCheckedIn),
        (AttendanceAction::Checkout, false) => Err(AppError::AlreadyCheckedOut),
    }
}

async fn geofenced_action(
    auth: AuthUser,
    pool: &MySqlPool,
    config: &Config,
    body: &LocationReq,
    action: AttendanceAction,
) -> Result<HttpResponse, AppError> {
    let (lat, lon) = body.coordinates()?;

    let office = office_cache::effective_office(pool, config).await?;
    let fence = office.geofence();
    if !fence.contains(lat, lon) {
        info!(
            user_id = auth.user_id,
            distance_km = fence.distance_km(lat, lon),
            radius_km = fence.radius_km,
            "Outside office geofence"
        );
        return Err(AppError::Geofence(action.verb()));
    }

    record_action(pool, config, auth.user_id, action).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new(action.success_message())))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/checkin",
    request_body = LocationReq,
    responses(
        (status = 200, description = "Checked in", body = MessageResponse, example = json!({
            "message": "Check-in successful!"
        })),
        (status = 400, description = "Missing location, outside the office, or already checked in", body = MessageResponse, example = json!({
            "message": "Already checked in today!"
        })),
        (status = 401, description = "Unauthorized", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: web::Json<LocationReq>,
) -> Result<HttpResponse, AppError> {
    geofenced_action(auth, pool.get_ref(), &config, &body, AttendanceAction::Checkin).await
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/checkout",
    request_body = LocationReq,
    responses(
        (status = 200, description = "Checked out", body = MessageResponse, example = json!({
            "message": "Check-out successful!"
        })),
        (status = 400, description = "Missing location, outside the office, no check-in, or already checked out", body = MessageResponse, example = json!({
            "message": "No check-in found!"
        })),
        (status = 401, description = "Unauthorized", body = MessageResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: web::Json<LocationReq>,
) -> Result<HttpResponse, AppError> {
    geofenced_action(auth, pool.get_ref(), &config, &body, AttendanceAction::Checkout).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(body: serde_json::Value) -> LocationReq {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let parsed = req(serde_json::json!({"latitude": 41.3, "longitude": "69.24"}));
        assert_eq!(parsed.coordinates(), Ok((41.3, 69.24)));
    }

    #[test]
    fn missing_coordinate_is_a_validation_error() {
        let parsed = req(serde_json::json!({"latitude": 41.3}));
        assert_eq!(
            parsed.coordinates(),
            Err(AppError::validation("Location is required."))
        );

        let parsed = req(serde_json::json!({"latitude": null, "longitude": 69.2}));
        assert!(parsed.coordinates().is_err());
    }

    #[test]
    fn lost_races_map_to_state_conflicts() {
        assert_eq!(settle(AttendanceAction::Checkin, true), Ok(()));
        assert_eq!(settle(AttendanceAction::Checkout, true), Ok(()));
        assert_eq!(
            settle(AttendanceAction::Checkin, false),
            Err(AppError::AlreadyCheckedIn)
        );
        assert_eq!(
            settle(AttendanceAction::Checkout, false),
            Err(AppError::AlreadyCheckedOut)
        );
    }

    #[test]
    fn garbage_and_out_of_range_are_rejected() {
        assert!(
            req(serde_json::json!({"latitude": "north", "longitude": 1}))
                .coordinates()
                .is_err()
        );
        assert!(
            req(serde_json::json!({"latitude": 91, "longitude": 1}))
                .coordinates()
                .is_err()
        );
        assert!(
            req(serde_json::json!({"latitude": 0, "longitude": -181}))
                .coordinates()
                .is_err()
        );
    }
}
