use crate::domain::ConfigError;
use crate::interp::InterpError;
use crate::oracle::OracleError;
use crate::steppar::SweepError;

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

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(2, format!("Configuration error: {err}"))
    }
}

impl From<InterpError> for AppError {
    fn from(err: InterpError) -> Self {
        AppError::new(4, format!("Interpolation failed: {err}"))
    }
}

impl From<OracleError> for AppError {
    fn from(err: OracleError) -> Self {
        AppError::new(4, format!("Fit failed: {err}"))
    }
}

impl From<SweepError> for AppError {
    fn from(err: SweepError) -> Self {
        match err {
            SweepError::Config(e) => e.into(),
            SweepError::Store(e) => e,
            SweepError::Interp { id, source } => {
                AppError::new(4, format!("Interpolation failed for parameter {id}: {source}"))
            }
            other => AppError::new(4, format!("Error sweep failed: {other}")),
        }
    }
}
