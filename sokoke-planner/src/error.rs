use sokoke_core::ConfigError;
use sokoke_data::DataError;

/// Failure to bring the planner up. Always fatal.
#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    /// The configured store could not be reached.
    Connect(DataError),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartupError::Config(e) => write!(f, "Configuration error: {e}"),
            StartupError::Connect(e) => write!(f, "Connection error: {e}"),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::Config(e) => Some(e),
            StartupError::Connect(e) => Some(e),
        }
    }
}

impl From<ConfigError> for StartupError {
    fn from(e: ConfigError) -> Self {
        StartupError::Config(e)
    }
}

impl From<DataError> for StartupError {
    fn from(e: DataError) -> Self {
        StartupError::Connect(e)
    }
}
