use std::fmt::{self, Debug, Display, Formatter};
use std::panic::Location;

/// Error context carrying the message plus the capture site. Constructed
/// through `#[track_caller]` helpers so the location points at the caller,
/// not at the error module.
#[derive(Clone)]
pub struct DiagnosticMessage {
    message: String,
    location: &'static Location<'static>,
}

impl DiagnosticMessage {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Location::caller(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for DiagnosticMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for DiagnosticMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}:{})",
            self.message,
            self.location.file(),
            self.location.line()
        )
    }
}
