use std::fmt;
use thiserror::Error;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Generate,
    Clean,
    Aggregate,
    Upload,
    Download,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Generate => "generate",
            Stage::Clean => "clean",
            Stage::Aggregate => "aggregate",
            Stage::Upload => "upload",
            Stage::Download => "download",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Noun form, so messages read "cleaning failed", "aggregation failed"
        let noun = match self {
            Stage::Generate => "data generation",
            Stage::Clean => "cleaning",
            Stage::Aggregate => "aggregation",
            Stage::Upload => "upload",
            Stage::Download => "download",
        };
        f.write_str(noun)
    }
}

/// Stable discriminant for [`EtlError`], so callers can branch without
/// matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    Validation,
    Unexpected,
}

#[derive(Error, Debug)]
pub enum EtlError {
    /// Required columns are absent from the input batch.
    #[error("input batch missing columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Empty input, empty required output, or a broken post-condition.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Anything else, wrapped with the stage it happened in.
    #[error("{stage} failed")]
    Unexpected {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },
}

impl EtlError {
    pub fn validation(message: impl Into<String>) -> Self {
        EtlError::Validation(message.into())
    }

    pub fn unexpected(stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        EtlError::Unexpected {
            stage,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::Schema { .. } => ErrorKind::Schema,
            EtlError::Validation(_) => ErrorKind::Validation,
            EtlError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Schema and validation errors are reported to the caller as-is and
    /// never retried.
    pub fn is_validation(&self) -> bool {
        matches!(self.kind(), ErrorKind::Schema | ErrorKind::Validation)
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_schema_error_lists_missing_columns() {
        let err = EtlError::Schema {
            missing: vec!["age".to_string(), "status".to_string()],
        };
        assert_eq!(err.to_string(), "input batch missing columns: age, status");
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.is_validation());
    }

    #[test]
    fn test_unexpected_error_keeps_cause() {
        let err = EtlError::unexpected(Stage::Clean, anyhow::anyhow!("salary \"abc\" is not numeric"));
        assert_eq!(err.to_string(), "cleaning failed");
        assert!(!err.is_validation());
        let cause = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(cause.contains("not numeric"));

        let err = EtlError::unexpected(Stage::Aggregate, anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "aggregation failed");
    }
}
