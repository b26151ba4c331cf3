use common::error::DiagnosticMessage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("connection already exists: {context}")]
    Duplicate { context: DiagnosticMessage },
    #[error("connection lookup failed: {context}")]
    NotFound { context: DiagnosticMessage },
    #[error("connection is busy: {context}")]
    Busy { context: DiagnosticMessage },
    #[error("illegal claim transition: {context}")]
    InvalidTransition { context: DiagnosticMessage },
    #[error("connection is protected: {context}")]
    Protected { context: DiagnosticMessage },
}

impl CatalogError {
    #[track_caller]
    pub fn duplicate(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::Duplicate {
            context: DiagnosticMessage::new(format!("connection '{name}' already exists")),
        }
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn busy(message: impl Into<String>) -> Self {
        Self::Busy {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::InvalidTransition {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn protected(message: impl Into<String>) -> Self {
        Self::Protected {
            context: DiagnosticMessage::new(message.into()),
        }
    }
}
