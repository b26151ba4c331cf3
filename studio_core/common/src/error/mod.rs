pub mod diagnostics;
pub use crate::config::error::ConfigError;
pub use diagnostics::DiagnosticMessage;

use std::error::Error as StdError;
use thiserror::Error;

/// Top-level error funnel for the `studio` binary. Library crates carry
/// their own error enums; this wraps them at the command boundary.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("startup failed: {context}")]
    Startup {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
    #[error("request failed: {context}")]
    Request {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
    #[error("workflow failed: {context}")]
    Workflow {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl StudioError {
    #[track_caller]
    pub fn startup<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let message = err.to_string();
        StudioError::Startup {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(err)),
        }
    }

    #[track_caller]
    pub fn startup_msg(message: impl Into<String>) -> Self {
        StudioError::Startup {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }

    #[track_caller]
    pub fn request<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let message = err.to_string();
        StudioError::Request {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(err)),
        }
    }

    #[track_caller]
    pub fn request_msg(message: impl Into<String>) -> Self {
        StudioError::Request {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }

    #[track_caller]
    pub fn workflow<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let message = err.to_string();
        StudioError::Workflow {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(err)),
        }
    }

    #[track_caller]
    pub fn workflow_msg(message: impl Into<String>) -> Self {
        StudioError::Workflow {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }
}
