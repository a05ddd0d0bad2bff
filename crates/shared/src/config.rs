use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
    domain::{Event, ServiceName},
    error::ConfigError,
};

pub const DEFAULT_COOKIE_NAME: &str = "cookie-accepted";
pub const DEFAULT_COOKIE_PATH: &str = "/";
/// Twelve thirty-day months.
pub const DEFAULT_COOKIE_MAX_AGE_SECS: i64 = 3600 * 24 * 30 * 12;
pub const DEFAULT_DATA_LAYER_NAME: &str = "dataLayer";
pub const DEFAULT_COMMAND_QUEUE_NAME: &str = "ga";
pub const DEFAULT_CREATE_FIELD: &str = "auto";

/// Attributes the consent cookie is written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieOptions {
    pub path: String,
    pub max_age_secs: i64,
    pub secure: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: DEFAULT_COOKIE_PATH.into(),
            max_age_secs: DEFAULT_COOKIE_MAX_AGE_SECS,
            secure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub options: CookieOptions,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.into(),
            options: CookieOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataLayerSettings {
    pub id: String,
    pub data_layer_name: String,
    /// Pushed during bootstrap, ahead of any seeded events.
    pub default_data_layer: Vec<Event>,
}

impl Default for DataLayerSettings {
    fn default() -> Self {
        Self {
            id: String::new(),
            data_layer_name: DEFAULT_DATA_LAYER_NAME.into(),
            default_data_layer: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandQueueSettings {
    pub id: String,
    pub queue_name: String,
    /// Trailing arguments of the `create` command issued at bootstrap.
    pub create_fields: Vec<Event>,
}

impl Default for CommandQueueSettings {
    fn default() -> Self {
        Self {
            id: String::new(),
            queue_name: DEFAULT_COMMAND_QUEUE_NAME.into(),
            create_fields: vec![Value::String(DEFAULT_CREATE_FIELD.into())],
        }
    }
}

/// Fully populated controller configuration. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Configuration {
    pub cookie: CookieSettings,
    pub gtm: DataLayerSettings,
    pub ga: CommandQueueSettings,
    pub track_page_view_on_accept: bool,
}

impl Configuration {
    /// Identifying id and global name for `service`, in that order.
    pub fn service_identity(&self, service: ServiceName) -> (&str, &str) {
        match service {
            ServiceName::Gtm => (&self.gtm.id, &self.gtm.data_layer_name),
            ServiceName::Ga => (&self.ga.id, &self.ga.queue_name),
        }
    }
}

/// User-supplied partial configuration. Every field is optional; unset fields
/// keep their defaults when resolved.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConsentOptions {
    pub cookie: CookieInput,
    pub services: ServicesInput,
    #[serde(alias = "trackPageViewOnAccept")]
    pub track_page_view_on_accept: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CookieInput {
    pub name: Option<String>,
    pub options: CookieOptionsInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CookieOptionsInput {
    pub path: Option<String>,
    #[serde(alias = "maxAge", alias = "max_age")]
    pub max_age_secs: Option<i64>,
    pub secure: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServicesInput {
    pub gtm: GtmInput,
    pub ga: GaInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GtmInput {
    pub id: Option<String>,
    #[serde(alias = "dataLayerName")]
    pub data_layer_name: Option<String>,
    #[serde(alias = "defaultDataLayer", alias = "dataLayer")]
    pub default_data_layer: Option<EventList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GaInput {
    pub id: Option<String>,
    #[serde(alias = "queueName")]
    pub queue_name: Option<String>,
    #[serde(alias = "createFields")]
    pub create_fields: Option<Vec<Event>>,
}

/// A list of events, or a single event object. An empty object means "none".
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EventList {
    Many(Vec<Event>),
    One(Event),
}

impl EventList {
    fn into_events(self) -> Vec<Event> {
        match self {
            Self::Many(events) => events,
            Self::One(Value::Object(fields)) if fields.is_empty() => Vec::new(),
            Self::One(event) => vec![event],
        }
    }
}

impl ConsentOptions {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Merges `options` over the defaults. Sequence-valued fields are replaced
/// wholesale, never concatenated with their defaults.
pub fn resolve(options: &ConsentOptions) -> Configuration {
    let mut config = Configuration::default();

    if let Some(name) = &options.cookie.name {
        config.cookie.name = name.clone();
    }
    let cookie_opts = &options.cookie.options;
    if let Some(path) = &cookie_opts.path {
        config.cookie.options.path = path.clone();
    }
    if let Some(max_age) = cookie_opts.max_age_secs {
        config.cookie.options.max_age_secs = max_age;
    }
    if let Some(secure) = cookie_opts.secure {
        config.cookie.options.secure = secure;
    }

    let gtm = &options.services.gtm;
    if let Some(id) = &gtm.id {
        config.gtm.id = id.trim().to_string();
    }
    if let Some(name) = &gtm.data_layer_name {
        config.gtm.data_layer_name = name.trim().to_string();
    }
    if let Some(events) = &gtm.default_data_layer {
        config.gtm.default_data_layer = events.clone().into_events();
    }

    let ga = &options.services.ga;
    if let Some(id) = &ga.id {
        config.ga.id = id.trim().to_string();
    }
    if let Some(name) = &ga.queue_name {
        config.ga.queue_name = name.trim().to_string();
    }
    if let Some(fields) = &ga.create_fields {
        config.ga.create_fields = fields.clone();
    }

    if let Some(track) = options.track_page_view_on_accept {
        config.track_page_view_on_accept = track;
    }

    config
}

/// Resolves an untyped options document. Malformed input yields the defaults,
/// which leaves every service untrackable.
pub fn resolve_value(options: &Value) -> Configuration {
    match ConsentOptions::deserialize(options) {
        Ok(parsed) => resolve(&parsed),
        Err(err) => {
            warn!(error = %err, "consent: malformed options, falling back to defaults");
            Configuration::default()
        }
    }
}

pub fn resolve_toml(raw: &str) -> Configuration {
    match ConsentOptions::from_toml_str(raw) {
        Ok(parsed) => resolve(&parsed),
        Err(err) => {
            warn!(error = %err, "consent: malformed options, falling back to defaults");
            Configuration::default()
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
