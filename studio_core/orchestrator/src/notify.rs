use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One transient user-facing status message. The id is the dismissal key.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub severity: Severity,
    pub message: String,
    pub created: DateTime<Utc>,
}

/// Shared queue of pending notifications. Cheap to clone; async
/// completions push into the same queue the rendering layer drains.
#[derive(Clone, Default)]
pub struct NotificationSink {
    inner: Arc<Mutex<VecDeque<Notification>>>,
}

impl NotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Error => log::error!("{message}"),
            Severity::Warning => log::warn!("{message}"),
            _ => log::info!("{message}"),
        }
        self.inner.lock().push_back(Notification {
            id: Uuid::new_v4(),
            severity,
            message,
            created: Utc::now(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(Severity::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    /// Remove and return everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.inner.lock().drain(..).collect()
    }

    pub fn latest(&self) -> Option<Notification> {
        self.inner.lock().back().cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
