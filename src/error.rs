use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Every failure a handler can report. The body is always `{"message": ...}`.
#[derive(Debug, Clone, Display, PartialEq)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    /// Caller is outside the office geofence; holds the attempted action.
    #[display(fmt = "You are too far from the office to {}.", _0)]
    Geofence(&'static str),

    #[display(fmt = "Already checked in today!")]
    AlreadyCheckedIn,

    #[display(fmt = "Already checked out!")]
    AlreadyCheckedOut,

    #[display(fmt = "No check-in found!")]
    NoCheckin,

    #[display(fmt = "Permission denied.")]
    Permission,

    #[display(fmt = "{}", _0)]
    NotFound(&'static str),

    #[display(fmt = "{}", _0)]
    Unauthorized(&'static str),

    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::Geofence(_)
            | AppError::AlreadyCheckedIn
            | AppError::AlreadyCheckedOut
            | AppError::NoCheckin => StatusCode::BAD_REQUEST,
            AppError::Permission => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        AppError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        tracing::error!(error = %e, "Token encoding failed");
        AppError::Internal
    }
}

/// Duplicate-key failures only; foreign-key and NOT NULL failures share SQLSTATE 23000 and are not matched.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Database errors shaped like the MySQL driver's, for exercising constraint handling without a server.
#[cfg(test)]
pub mod test_db_error {
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::{borrow::Cow, error::Error as StdError, fmt};

    pub const ER_DUP_ENTRY: u16 = 1062;
    pub const ER_NO_REFERENCED_ROW_2: u16 = 1452;
    pub const ER_BAD_NULL_ERROR: u16 = 1048;

    #[derive(Debug)]
    struct MySqlLikeError {
        number: u16,
    }

    impl fmt::Display for MySqlLikeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{} (23000): constraint failed", self.number)
        }
    }

    impl StdError for MySqlLikeError {}

    impl DatabaseError for MySqlLikeError {
        fn message(&self) -> &str {
            "constraint failed"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23000"))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.number {
                ER_DUP_ENTRY => ErrorKind::UniqueViolation,
                ER_NO_REFERENCED_ROW_2 => ErrorKind::ForeignKeyViolation,
                ER_BAD_NULL_ERROR => ErrorKind::NotNullViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    pub fn constraint_error(number: u16) -> sqlx::Error {
        sqlx::Error::Database(Box::new(MySqlLikeError { number }))
    }
}
