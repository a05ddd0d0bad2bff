use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownService;

/// Opaque analytics payload. The controller never interprets these, it only
/// forwards them verbatim and in order.
pub type Event = serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceName {
    Gtm,
    Ga,
}

impl ServiceName {
    pub const ALL: [ServiceName; 2] = [ServiceName::Gtm, ServiceName::Ga];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gtm => "gtm",
            Self::Ga => "ga",
        }
    }

    pub fn kind(self) -> ServiceKind {
        match self {
            Self::Gtm => ServiceKind::DataLayer,
            Self::Ga => ServiceKind::CommandQueue,
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceName {
    type Err = UnknownService;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gtm" => Ok(Self::Gtm),
            "ga" => Ok(Self::Ga),
            _ => Err(UnknownService(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Appendable ordered channel (tag-manager style).
    DataLayer,
    /// Callable command dispatcher (analytics-client style).
    CommandQueue,
}

pub fn is_structured_event(event: &Event) -> bool {
    event.is_object()
}
