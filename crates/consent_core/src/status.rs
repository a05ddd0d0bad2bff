use std::collections::BTreeMap;

use serde::Serialize;
use shared::domain::ServiceName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentState {
    Undecided,
    Denied,
    Accepted,
}

impl ConsentState {
    pub fn is_accepted(self) -> bool {
        self == Self::Accepted
    }
}

/// In-memory view derived from the consent record. Always rebuilt wholesale,
/// never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub user_reacted: bool,
    /// `None` exactly while the user has not reacted.
    pub tracking_accepted: Option<bool>,
    pub services: BTreeMap<ServiceName, bool>,
    pub enable_modal: bool,
}

impl Status {
    pub fn undecided() -> Self {
        Self {
            user_reacted: false,
            tracking_accepted: None,
            services: inactive_services(),
            enable_modal: true,
        }
    }

    pub fn decided(accepted: bool) -> Self {
        Self {
            user_reacted: true,
            tracking_accepted: Some(accepted),
            services: inactive_services(),
            enable_modal: false,
        }
    }

    pub fn state(&self) -> ConsentState {
        match self.tracking_accepted {
            None => ConsentState::Undecided,
            Some(false) => ConsentState::Denied,
            Some(true) => ConsentState::Accepted,
        }
    }

    pub fn is_active(&self, service: ServiceName) -> bool {
        self.services.get(&service).copied().unwrap_or(false)
    }
}

fn inactive_services() -> BTreeMap<ServiceName, bool> {
    ServiceName::ALL.iter().map(|service| (*service, false)).collect()
}
