use sqlx::MySqlPool;

use crate::model::{role::Role, user::UserSql};

const USER_COLUMNS: &str = r#"
    id, username, password, first_name, last_name, email, role, is_active
"#;

pub async fn find_by_username(
    pool: &MySqlPool,
    username: &str,
) -> Result<Option<UserSql>, sqlx::Error> {
    sqlx::query_as::<_, UserSql>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_id(pool: &MySqlPool, id: u64) -> Result<Option<UserSql>, sqlx::Error> {
    sqlx::query_as::<_, UserSql>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &MySqlPool) -> Result<Vec<UserSql>, sqlx::Error> {
    sqlx::query_as::<_, UserSql>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
        .fetch_all(pool)
        .await
}

pub async fn insert(
    pool: &MySqlPool,
    username: &str,
    password_hash: &str,
    role: Role,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO users (username, password, role) VALUES (?, ?, ?)")
        .bind(username)
        .bind(password_hash)
        .bind(role.to_string())
        .execute(pool)
        .await?;

    Ok(result.last_insert_id())
}

pub async fn update_password(
    pool: &MySqlPool,
    id: u64,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn touch_last_login(pool: &MySqlPool, id: u64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login_at = UTC_TIMESTAMP() WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
