use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Server-assigned identifier of a persisted connection. Opaque to the
/// client; never parsed, only round-tripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

///  ---------------- Connector catalog types ----------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sql,
    Cloud,
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Category::Sql => write!(f, "sql"),
            Category::Cloud => write!(f, "cloud"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sql" => Ok(Category::Sql),
            "cloud" => Ok(Category::Cloud),
            other => Err(format!("unknown connector category '{other}'")),
        }
    }
}

/// Immutable catalog entry for a supported source kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConnectorKind {
    pub id: &'static str,
    pub category: Category,
}

/// Where a connector's liveness is verified: `cloud` kinds are assumed
/// server-reachable and validated at save time, `local` kinds need a
/// client-initiated probe through the tunnelled agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locality {
    #[default]
    Cloud,
    Local,
}

impl FromStr for Locality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cloud" => Ok(Locality::Cloud),
            "local" => Ok(Locality::Local),
            other => Err(format!("unknown locality '{other}'")),
        }
    }
}

///  ---------------- Persisted connection records ----------------

/// Client mirror of a server-owned connection record. The password is
/// write-only on the server and never appears here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub connector_id: ConnectionId,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConnectionRecord {
    /// Duplicate prevention is by natural key, not by identifier.
    pub fn matches_natural_key(
        &self,
        kind: &str,
        host: &str,
        port: &str,
        username: &str,
        database: &str,
    ) -> bool {
        self.kind == kind
            && self.host == host
            && self.port == port
            && self.username == username
            && self.database == database
    }
}

/// Credential form bound to one dialog session. `url` and `token` are only
/// meaningful for local-locality probes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionForm {
    pub name: String,
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub url: String,
    pub token: String,
}

/// Create payload sent to the registry.
#[derive(Debug, Clone, Serialize)]
pub struct NewConnection {
    pub kind: String,
    pub name: String,
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

/// Partial-update payload. A blank password is omitted entirely so the
/// server keeps the stored secret.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl ConnectionPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.database.is_none()
    }
}

/// Body of the local-agent liveness probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthProbe {
    pub url: String,
    pub token: String,
}
