// sqlx::Error -> AppError::Store

use queueline_core::error::AppError;

/// Convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            Some(code) => match code.as_ref() {
                "2067" | "1555" => AppError::Store(format!(
                    "Unique constraint violation: {} ({})",
                    db_err.message(),
                    code
                )),
                "5" => AppError::Store(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                "13" => AppError::Store(format!("Database full: {}", db_err.message())),
                other => AppError::Store(format!(
                    "Database error [{}]: {}",
                    other,
                    db_err.message()
                )),
            },
            None => AppError::Store(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::RowNotFound => AppError::Store("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Store(format!("Column not found: {}", col)),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            AppError::Store(format!("Connection unavailable: {}", err))
        }
        _ => AppError::Store(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_map_to_store() {
        assert!(matches!(map_sqlx_error(sqlx::Error::PoolClosed), AppError::Store(_)));
        match map_sqlx_error(sqlx::Error::RowNotFound) {
            AppError::Store(msg) => assert_eq!(msg, "Row not found"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
