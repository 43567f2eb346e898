use crate::domain::port::RepositoryError;

/// MySQLの整合性制約違反（外部キー・一意制約）のSQLSTATE
const INTEGRITY_CONSTRAINT_VIOLATION: &str = "23000";

/// データベースエラー型
/// データベース操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatabaseError {
    /// データベース接続エラー
    #[error("Database connection error: {0}")]
    ConnectionError(String),
    /// SQLクエリエラー
    #[error("Database query error: {0}")]
    QueryError(String),
    /// マイグレーションエラー
    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl DatabaseError {
    /// クエリエラーを文脈付きで作成する
    pub fn query(context: &str, err: sqlx::Error) -> Self {
        DatabaseError::QueryError(format!("{}: {}", context, err))
    }
}

/// sqlxのエラーが外部キー制約違反によるものか
pub fn is_constraint_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(INTEGRITY_CONSTRAINT_VIOLATION)
        }
        _ => false,
    }
}

/// DatabaseErrorからRepositoryErrorへの変換
impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) => RepositoryError::ConnectionFailed(msg),
            DatabaseError::QueryError(msg) => RepositoryError::OperationFailed(msg),
            DatabaseError::MigrationError(msg) => RepositoryError::OperationFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_maps_to_connection_failed() {
        let err: RepositoryError = DatabaseError::ConnectionError("refused".to_string()).into();
        assert_eq!(err, RepositoryError::ConnectionFailed("refused".to_string()));
    }

    #[test]
    fn test_query_error_keeps_context() {
        let err = DatabaseError::query("出品の保存に失敗しました", sqlx::Error::RowNotFound);
        match err {
            DatabaseError::QueryError(msg) => assert!(msg.starts_with("出品の保存に失敗しました: ")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!is_constraint_violation(&sqlx::Error::RowNotFound));
    }
}
