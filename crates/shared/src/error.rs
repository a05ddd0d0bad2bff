use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown analytics service '{0}'")]
pub struct UnknownService(pub String);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid TOML consent options: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON consent options: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("consent record is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("consent record has no usable 'accepted' field")]
    MissingAccepted,
    #[error("consent record field 'accepted' has unexpected value {0}")]
    InvalidAccepted(serde_json::Value),
    #[error("consent record seed data is not a service mapping: {0}")]
    InvalidSeed(String),
}
