use shared::{
    config::{CommandQueueSettings, DataLayerSettings, DEFAULT_DATA_LAYER_NAME},
    domain::{ServiceKind, ServiceName},
};
use tracing::info;
use url::Url;

pub const TAG_MANAGER_SCRIPT_URL: &str = "https://www.googletagmanager.com/gtm.js";
pub const ANALYTICS_SCRIPT_URL: &str = "https://www.google-analytics.com/analytics.js";

/// What a script loader needs to fetch one analytics integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub service: ServiceName,
    pub kind: ServiceKind,
    pub id: String,
    pub global_name: String,
    pub src: Url,
}

impl ServiceDescriptor {
    pub fn tag_manager(settings: &DataLayerSettings) -> Result<Self, url::ParseError> {
        let mut params = vec![("id", settings.id.as_str())];
        if settings.data_layer_name != DEFAULT_DATA_LAYER_NAME {
            params.push(("l", settings.data_layer_name.as_str()));
        }
        Ok(Self {
            service: ServiceName::Gtm,
            kind: ServiceKind::DataLayer,
            id: settings.id.clone(),
            global_name: settings.data_layer_name.clone(),
            src: Url::parse_with_params(TAG_MANAGER_SCRIPT_URL, &params)?,
        })
    }

    pub fn analytics(settings: &CommandQueueSettings) -> Result<Self, url::ParseError> {
        Ok(Self {
            service: ServiceName::Ga,
            kind: ServiceKind::CommandQueue,
            id: settings.id.clone(),
            global_name: settings.queue_name.clone(),
            src: Url::parse(ANALYTICS_SCRIPT_URL)?,
        })
    }
}

/// Fire-and-forget trigger for fetching and executing a third-party script.
/// Implementations must not block until the script has run.
pub trait ScriptLoader: Send + Sync {
    fn ensure(&self, service: &ServiceDescriptor);
}

pub struct NoopScriptLoader;

impl ScriptLoader for NoopScriptLoader {
    fn ensure(&self, _service: &ServiceDescriptor) {}
}

/// Records load requests in the log only; useful where no document exists to
/// inject script tags into.
pub struct TracingScriptLoader;

impl ScriptLoader for TracingScriptLoader {
    fn ensure(&self, service: &ServiceDescriptor) {
        info!(
            service = %service.service,
            id = %service.id,
            global = %service.global_name,
            src = %service.src,
            "scripts: load requested"
        );
    }
}
