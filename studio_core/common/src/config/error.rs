use crate::error::DiagnosticMessage;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config value not found: {context}")]
    NotFound { context: DiagnosticMessage },
    #[error("failed to parse config: {context}")]
    Parse {
        context: DiagnosticMessage,
        #[source]
        source: toml::de::Error,
    },
    #[error("I/O error reading config: {context}")]
    Io {
        context: DiagnosticMessage,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn parse(source: toml::de::Error) -> Self {
        let message = source.to_string();
        Self::Parse {
            context: DiagnosticMessage::new(message),
            source,
        }
    }

    #[track_caller]
    pub fn io(source: io::Error) -> Self {
        let message = source.to_string();
        Self::Io {
            context: DiagnosticMessage::new(message),
            source,
        }
    }
}
