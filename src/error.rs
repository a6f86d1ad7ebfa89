/// Errors raised by the cleaning library.
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    /// One or more records cannot be placed in time (bad date, empty SKU).
    ///
    /// The whole batch is rejected: cleaning a partial batch would silently shift
    /// the trailing windows of every later row of the same SKU.
    #[error("invalid input: {}", format_row_errors(.0))]
    InvalidInput(Vec<RowError>),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to write JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl CleanError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            context: context.into(),
            source,
        }
    }
}

/// A record-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// Which input the record came from (e.g. `demand`, `stock`).
    pub source: String,
    /// 1-based line number (header is line 1).
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} line {}: {}", self.source, self.line, self.message)
    }
}

const MAX_LISTED_ROW_ERRORS: usize = 10;

fn format_row_errors(errors: &[RowError]) -> String {
    let mut out = format!("{} bad record(s)", errors.len());
    for e in errors.iter().take(MAX_LISTED_ROW_ERRORS) {
        out.push_str(&format!("\n  - {e}"));
    }
    if errors.len() > MAX_LISTED_ROW_ERRORS {
        out.push_str(&format!("\n  ... and {} more", errors.len() - MAX_LISTED_ROW_ERRORS));
    }
    out
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<CleanError> for AppError {
    fn from(err: CleanError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_lists_rows_and_truncates() {
        let errors: Vec<RowError> = (0..12)
            .map(|i| RowError {
                source: "demand".to_string(),
                line: i + 2,
                message: "Invalid date 'x'".to_string(),
            })
            .collect();
        let msg = CleanError::InvalidInput(errors).to_string();
        assert!(msg.starts_with("invalid input: 12 bad record(s)"));
        assert!(msg.contains("demand line 2: Invalid date 'x'"));
        assert!(msg.contains("... and 2 more"));
    }

    #[test]
    fn io_errors_keep_their_source() {
        use std::error::Error as _;

        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = CleanError::io("Failed to open CSV 'd.csv'", inner);

        assert_eq!(err.to_string(), "Failed to open CSV 'd.csv': no such file");
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "no such file");
        assert!(source.downcast_ref::<std::io::Error>().is_some());

        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 2);
    }

    #[test]
    fn clean_error_maps_to_exit_code_2() {
        let err: AppError = CleanError::Config("bad".to_string()).into();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "invalid configuration: bad");
    }
}
