use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("{}", .0.user_message())]
    Engine(#[from] engine::EngineError),
    #[error("export error: {0}")]
    Export(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Details were already printed to stderr.
    #[error("{0}")]
    Reported(String),
}

impl AppError {
    pub fn already_reported(&self) -> bool {
        matches!(self, AppError::Reported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_into_missing_dir() -> Result<()> {
        std::fs::write("/nonexistent-tenant-ledger-dir/report.html", "x")?;
        Ok(())
    }

    #[test]
    fn io_failures_are_printed_by_main() {
        let err = write_into_missing_dir().unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert!(!err.already_reported());
        assert!(AppError::Reported("2 invalid field(s)".to_string()).already_reported());
    }
}
