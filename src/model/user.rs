use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::role::Role;

/// Row as stored in `users`; `role` is kept as text and parsed with [`Role::from_db`].
#[derive(Debug, FromRow)]
pub struct UserSql {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 3,
    "username": "kamol",
    "first_name": "Kamol",
    "last_name": "Aliev",
    "email": "kamol@company.com",
    "role": "employee",
    "is_active": true
}))]
pub struct User {
    pub id: u64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
}

impl From<UserSql> for User {
    fn from(row: UserSql) -> Self {
        Self {
            id: row.id,
            role: Role::from_db(&row.role),
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            is_active: row.is_active,
        }
    }
}
