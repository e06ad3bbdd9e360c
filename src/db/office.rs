use sqlx::MySqlPool;

use crate::model::office_location::OfficeLocationRow;

/// The single office row; the lowest id wins if more than one exists.
pub async fn fetch(pool: &MySqlPool) -> Result<Option<OfficeLocationRow>, sqlx::Error> {
    sqlx::query_as::<_, OfficeLocationRow>(
        "SELECT latitude, longitude, radius FROM office_location ORDER BY id LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}

pub async fn upsert(pool: &MySqlPool, office: &OfficeLocationRow) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing: Option<(u64,)> =
        sqlx::query_as("SELECT id FROM office_location ORDER BY id LIMIT 1 FOR UPDATE")
            .fetch_optional(&mut *tx)
            .await?;

    match existing {
        Some((id,)) => {
            sqlx::query(
                "UPDATE office_location SET latitude = ?, longitude = ?, radius = ? WHERE id = ?",
            )
            .bind(office.latitude)
            .bind(office.longitude)
            .bind(office.radius)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        None => {
            sqlx::query("INSERT INTO office_location (latitude, longitude, radius) VALUES (?, ?, ?)")
                .bind(office.latitude)
                .bind(office.longitude)
                .bind(office.radius)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await
}
