use crate::query::QueryError;

/// Failure of a search, page request, projection or bulk statement.
#[derive(Debug)]
pub enum DataError {
    NotFound(String),
    /// Engine failure, passed through with the original error as `source()`.
    Database(Box<dyn std::error::Error + Send + Sync>),
    /// The search condition is self-contradictory (e.g. inverted age range).
    InvalidCondition(String),
    /// Paging parameters out of range or an unknown sort property.
    InvalidPage(String),
    /// A result row could not be mapped into the requested shape.
    Mapping(String),
    Query(QueryError),
    Other(String),
}

impl DataError {
    /// Box a driver error as `Database`.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
            DataError::InvalidCondition(msg) => write!(f, "Invalid search condition: {msg}"),
            DataError::InvalidPage(msg) => write!(f, "Invalid page request: {msg}"),
            DataError::Mapping(msg) => write!(f, "Row mapping error: {msg}"),
            DataError::Query(err) => write!(f, "Query error: {err}"),
            DataError::Other(msg) => write!(f, "Data error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            DataError::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        DataError::Query(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[derive(Debug)]
    struct ConnectionReset;

    impl std::fmt::Display for ConnectionReset {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("connection reset")
        }
    }

    impl std::error::Error for ConnectionReset {}

    #[test]
    fn test_database_error_keeps_source() {
        let err = DataError::database(ConnectionReset);
        assert_eq!(err.to_string(), "Database error: connection reset");
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<ConnectionReset>().is_some());
    }
}
