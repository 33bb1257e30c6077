use std::fmt;

use crate::dtn_interface::MessageId;

/// Failures of the statistics layer
#[derive(Debug, Clone, PartialEq)]
pub enum StatsError {
    /// A transfer or delete referenced a message never seen as created
    MissingCreationRecord { id: MessageId },

    /// Unusable configuration (bad step size, unknown or empty host population)
    Configuration(String),

    /// Report output could not be written
    Io(String),
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::MissingCreationRecord { id } => {
                write!(f, "no creation record for message {}", id)
            }
            StatsError::Configuration(reason) => write!(f, "configuration error: {}", reason),
            StatsError::Io(reason) => write!(f, "report output failed: {}", reason),
        }
    }
}

impl std::error::Error for StatsError {}

impl From<std::io::Error> for StatsError {
    fn from(e: std::io::Error) -> Self {
        StatsError::Io(e.to_string())
    }
}
