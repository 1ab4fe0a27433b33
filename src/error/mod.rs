//! Error kinds surfaced by every emitting operation

use crate::modes::ModeCategory;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GCodeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid {category} transition: {message}")]
    InvalidModeTransition {
        category: ModeCategory,
        message: String,
    },

    #[error("tool state conflict: {0}")]
    ToolStateConflict(String),

    #[error("coolant state conflict: {0}")]
    CoolantStateConflict(String),

    #[error("instruction table: {0}")]
    TableLookupMiss(String),

    #[error("output sink failure: {0}")]
    Resource(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl GCodeError {
    pub(crate) fn argument(message: impl Into<String>) -> Self {
        GCodeError::InvalidArgument(message.into())
    }

    pub(crate) fn geometry(message: impl Into<String>) -> Self {
        GCodeError::InvalidGeometry(message.into())
    }

    pub(crate) fn transition(category: ModeCategory, message: impl Into<String>) -> Self {
        GCodeError::InvalidModeTransition {
            category,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GCodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_subsystem() {
        let err = GCodeError::transition(ModeCategory::Coolant, "already active");
        assert_eq!(err.to_string(), "invalid coolant mode transition: already active");

        let err = GCodeError::ToolStateConflict("halt requested with tool on".into());
        assert!(err.to_string().starts_with("tool state conflict"));
    }

    #[test]
    fn test_io_errors_become_resource_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: GCodeError = io.into();
        assert!(matches!(err, GCodeError::Resource(_)));
    }
}
