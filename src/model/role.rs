use serde::{Deserialize, Serialize};
use strum_macros::EnumString;
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize, EnumString,
    strum_macros::Display, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Employee,
}

impl Role {
    /// Parses the value stored in `users.role`; unknown values fall back to the least privileged role.
    pub fn from_db(value: &str) -> Self {
        value.trim().parse().unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_values() {
        assert_eq!(Role::from_db("admin"), Role::Admin);
        assert_eq!(Role::from_db("employee"), Role::Employee);
        assert_eq!(Role::from_db("superuser"), Role::Employee);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::Employee.to_string(), "employee");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
