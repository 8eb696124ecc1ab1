use qdsl_data::DataError;

/// Maps driver errors onto [`DataError`] variants.
///
/// Decode failures become `Mapping`, a missing row becomes `NotFound`, and
/// everything else is kept as the `source()` of `DataError::Database`.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        match &self {
            sqlx::Error::RowNotFound => DataError::NotFound("no row returned".into()),
            sqlx::Error::ColumnDecode { index, source } => {
                DataError::Mapping(format!("column {index}: {source}"))
            }
            sqlx::Error::ColumnNotFound(column) => {
                DataError::Mapping(format!("column `{column}` not in result"))
            }
            _ => DataError::database(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            sqlx::Error::RowNotFound.into_data_error(),
            DataError::NotFound(_)
        ));
    }

    #[test]
    fn test_other_errors_keep_source() {
        let err = sqlx::Error::PoolTimedOut.into_data_error();
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<sqlx::Error>().is_some());
    }
}
