use common::error::DiagnosticMessage;
use shared_clients::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A UI invariant was violated (operating on a missing id, acting
    /// without an open dialog). Should not occur in correct operation.
    #[error("invalid state: {context}")]
    State { context: DiagnosticMessage },
    /// The issuing control already has an operation in flight.
    #[error("operation already in flight: {context}")]
    Busy { context: DiagnosticMessage },
    #[error("registry call failed: {context}")]
    Client {
        context: DiagnosticMessage,
        #[source]
        source: ClientError,
    },
}

impl OrchestratorError {
    #[track_caller]
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
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
    pub fn client(source: ClientError) -> Self {
        let message = source.to_string();
        Self::Client {
            context: DiagnosticMessage::new(message),
            source,
        }
    }
}
