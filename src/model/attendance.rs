use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::EnumString;
use utoipa::ToSchema;

use crate::error::AppError;

/// One employee's attendance for one calendar day. Timestamps are stored in UTC.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    pub work_date: NaiveDate,
    pub checkin_time: Option<NaiveDateTime>,
    pub checkout_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceAction {
    Checkin,
    Checkout,
}

impl AttendanceAction {
    pub fn verb(&self) -> &'static str {
        match self {
            AttendanceAction::Checkin => "check in",
            AttendanceAction::Checkout => "check out",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            AttendanceAction::Checkin => "Check-in successful!",
            AttendanceAction::Checkout => "Check-out successful!",
        }
    }
}

/// Per (employee, day): `NoRecord -> CheckedIn -> CheckedOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceState {
    NoRecord,
    CheckedIn,
    CheckedOut,
}

impl AttendanceState {
    pub fn of(record: Option<&Attendance>) -> Self {
        match record {
            None => AttendanceState::NoRecord,
            Some(a) if a.checkout_time.is_some() => AttendanceState::CheckedOut,
            Some(_) => AttendanceState::CheckedIn,
        }
    }

    pub fn check_in(self) -> Result<Self, AppError> {
        match self {
            AttendanceState::NoRecord => Ok(AttendanceState::CheckedIn),
            AttendanceState::CheckedIn | AttendanceState::CheckedOut => {
                Err(AppError::AlreadyCheckedIn)
            }
        }
    }

    pub fn check_out(self) -> Result<Self, AppError> {
        match self {
            AttendanceState::NoRecord => Err(AppError::NoCheckin),
            AttendanceState::CheckedIn => Ok(AttendanceState::CheckedOut),
            AttendanceState::CheckedOut => Err(AppError::AlreadyCheckedOut),
        }
    }

    pub fn apply(self, action: AttendanceAction) -> Result<Self, AppError> {
        match action {
            AttendanceAction::Checkin => self.check_in(),
            AttendanceAction::Checkout => self.check_out(),
        }
    }
}

/// Calendar day `now` falls on in the office's local offset.
pub fn work_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(checkout: bool) -> Attendance {
        let checkin = NaiveDate::from_ymd_opt(2024, 9, 5)
            .unwrap()
            .and_hms_opt(4, 0, 0)
            .unwrap();
        Attendance {
            id: 1,
            employee_id: 7,
            work_date: checkin.date(),
            checkin_time: Some(checkin),
            checkout_time: checkout.then(|| checkin + chrono::Duration::hours(8)),
        }
    }

    #[test]
    fn state_follows_record() {
        assert_eq!(AttendanceState::of(None), AttendanceState::NoRecord);
        assert_eq!(
            AttendanceState::of(Some(&record(false))),
            AttendanceState::CheckedIn
        );
        assert_eq!(
            AttendanceState::of(Some(&record(true))),
            AttendanceState::CheckedOut
        );
    }

    #[test]
    fn first_check_in_of_the_day_succeeds() {
        assert_eq!(
            AttendanceState::NoRecord.check_in(),
            Ok(AttendanceState::CheckedIn)
        );
    }

    #[test]
    fn second_check_in_is_rejected() {
        assert_eq!(
            AttendanceState::CheckedIn.check_in(),
            Err(AppError::AlreadyCheckedIn)
        );
        assert_eq!(
            AttendanceState::CheckedOut.check_in(),
            Err(AppError::AlreadyCheckedIn)
        );
    }

    #[test]
    fn check_out_before_check_in_is_rejected() {
        assert_eq!(
            AttendanceState::NoRecord.check_out(),
            Err(AppError::NoCheckin)
        );
    }

    #[test]
    fn check_out_twice_is_rejected() {
        let state = AttendanceState::CheckedIn.check_out().unwrap();
        assert_eq!(state, AttendanceState::CheckedOut);
        assert_eq!(state.check_out(), Err(AppError::AlreadyCheckedOut));
    }

    #[test]
    fn apply_dispatches_on_action() {
        assert_eq!(
            AttendanceState::NoRecord.apply(AttendanceAction::Checkin),
            Ok(AttendanceState::CheckedIn)
        );
        assert_eq!(
            AttendanceState::NoRecord.apply(AttendanceAction::Checkout),
            Err(AppError::NoCheckin)
        );
    }

    #[test]
    fn action_parses_from_request_value() {
        assert_eq!("checkin".parse(), Ok(AttendanceAction::Checkin));
        assert_eq!("checkout".parse(), Ok(AttendanceAction::Checkout));
        assert!("lunch".parse::<AttendanceAction>().is_err());
        assert_eq!(AttendanceAction::Checkout.verb(), "check out");
    }

    #[test]
    fn work_date_uses_local_offset() {
        // 2024-09-05 20:30 UTC is already the 6th at UTC+5
        let now = Utc.with_ymd_and_hms(2024, 9, 5, 20, 30, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let tashkent = FixedOffset::east_opt(5 * 3600).unwrap();

        assert_eq!(work_date(now, utc), NaiveDate::from_ymd_opt(2024, 9, 5).unwrap());
        assert_eq!(
            work_date(now, tashkent),
            NaiveDate::from_ymd_opt(2024, 9, 6).unwrap()
        );
    }
}
