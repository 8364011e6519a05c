//! Error types for the catalog access layer.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result alias for catalog layer operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the catalog access layer.
#[derive(Debug)]
pub enum DataError {
    /// Establishing the connection pool failed.
    ConnectFailed {
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// A database operation failed.
    QueryFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
}

impl Display for DataError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed { .. } => formatter.write_str("database connection failed"),
            Self::QueryFailed { .. } => formatter.write_str("database operation failed"),
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConnectFailed { source } | Self::QueryFailed { source, .. } => Some(source),
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(source: sqlx::Error) -> Self {
        Self::QueryFailed {
            operation: "untagged operation",
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_source_cover_each_variant() {
        let connect = DataError::ConnectFailed {
            source: sqlx::Error::PoolClosed,
        };
        assert_eq!(connect.to_string(), "database connection failed");
        assert!(connect.source().is_some());

        let query = DataError::QueryFailed {
            operation: "load mirror locations",
            source: sqlx::Error::RowNotFound,
        };
        assert_eq!(query.to_string(), "database operation failed");
        assert!(query.source().is_some());

        let converted = DataError::from(sqlx::Error::RowNotFound);
        assert!(matches!(
            converted,
            DataError::QueryFailed {
                operation: "untagged operation",
                ..
            }
        ));
    }
}
