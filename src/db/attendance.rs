use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;

use crate::{error::is_unique_violation, model::attendance::Attendance, utils::report::ReportRow};

pub async fn find_for_day(
    pool: &MySqlPool,
    employee_id: u64,
    day: NaiveDate,
) -> Result<Option<Attendance>, sqlx::Error> {
    sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, employee_id, work_date, checkin_time, checkout_time
        FROM attendance
        WHERE employee_id = ? AND work_date = ?
        "#,
    )
    .bind(employee_id)
    .bind(day)
    .fetch_optional(pool)
    .await
}

/// Returns `false` when the (employee, day) key already exists.
pub async fn insert_check_in(
    pool: &MySqlPool,
    employee_id: u64,
    day: NaiveDate,
    at: NaiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, work_date, checkin_time)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(day)
    .bind(at)
    .execute(pool)
    .await;

    inserted(result)
}

/// `Ok(false)` for a duplicate key; any other failure is passed on.
fn inserted<T>(result: Result<T, sqlx::Error>) -> Result<bool, sqlx::Error> {
    match result {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Returns `false` when the record was already checked out.
pub async fn set_check_out(
    pool: &MySqlPool,
    attendance_id: u64,
    at: NaiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET checkout_time = ?
        WHERE id = ?
        AND checkout_time IS NULL
        "#,
    )
    .bind(at)
    .bind(attendance_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Every attendance row whose work date lies in `[start, end]`, with the employee's names.
pub async fn rows_between(
    pool: &MySqlPool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<ReportRow>, sqlx::Error> {
    sqlx::query_as::<_, ReportRow>(
        r#"
        SELECT a.work_date, u.username, u.first_name, u.last_name,
               a.checkin_time, a.checkout_time
        FROM attendance a
        JOIN users u ON u.id = a.employee_id
        WHERE a.work_date BETWEEN ? AND ?
        ORDER BY a.work_date, a.checkin_time, a.id
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::test_db_error::{ER_DUP_ENTRY, ER_NO_REFERENCED_ROW_2, constraint_error};

    #[test]
    fn successful_insert_is_a_check_in() {
        assert!(inserted(Ok(())).unwrap());
    }

    #[test]
    fn duplicate_day_is_reported_as_not_inserted() {
        assert!(!inserted::<()>(Err(constraint_error(ER_DUP_ENTRY))).unwrap());
    }

    #[test]
    fn missing_employee_is_an_error_not_a_duplicate() {
        let err = inserted::<()>(Err(constraint_error(ER_NO_REFERENCED_ROW_2))).unwrap_err();
        assert!(matches!(err, sqlx::Error::Database(_)));
    }
}
