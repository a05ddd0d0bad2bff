use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{Event, ServiceName},
    error::RecordError,
};

/// Seed data supplied with a consent decision, keyed by service.
pub type SeedData = BTreeMap<ServiceName, Vec<Event>>;

/// The durable user decision. Absence of a record is a distinct state from
/// `accepted == false`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub seed_events: SeedData,
}

impl ConsentRecord {
    pub fn new(accepted: bool, seed_events: SeedData) -> Self {
        Self {
            accepted,
            seed_events,
        }
    }

    pub fn seeds_for(&self, service: ServiceName) -> &[Event] {
        self.seed_events
            .get(&service)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn encode(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a persisted payload. The persisted medium may have lost type
    /// fidelity, so `accepted` may arrive as a bool or as `"true"`/`"false"`,
    /// and the bare legacy encodings (`true`, `"false"`, ...) carry no seeds.
    pub fn decode(raw: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(raw.trim())?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(mut fields) => {
                let accepted = match fields.remove("accepted") {
                    Some(raw) => parse_accepted(raw)?,
                    None => return Err(RecordError::MissingAccepted),
                };

                let mut seed_events = SeedData::new();
                if let Some(raw) = fields.remove("seedEvents") {
                    merge_seeds(&mut seed_events, raw, ServiceName::Gtm)?;
                }
                if let Some(raw) = fields.remove("seedCommands") {
                    merge_seeds(&mut seed_events, raw, ServiceName::Ga)?;
                }

                Ok(Self {
                    accepted,
                    seed_events,
                })
            }
            other => Ok(Self::new(parse_accepted(other)?, SeedData::new())),
        }
    }
}

fn parse_accepted(raw: Value) -> Result<bool, RecordError> {
    match raw {
        Value::Bool(accepted) => Ok(accepted),
        Value::String(ref s) if s == "true" => Ok(true),
        Value::String(ref s) if s == "false" => Ok(false),
        other => Err(RecordError::InvalidAccepted(other)),
    }
}

/// A bare sequence is taken as the seed list of `fallback`; a mapping is keyed
/// by service name. Keys naming services this build does not know are skipped.
fn merge_seeds(
    seeds: &mut SeedData,
    raw: Value,
    fallback: ServiceName,
) -> Result<(), RecordError> {
    match raw {
        Value::Null => Ok(()),
        Value::Array(items) => {
            seeds.entry(fallback).or_default().extend(items);
            Ok(())
        }
        Value::Object(entries) => {
            for (key, items) in entries {
                let Ok(service) = key.parse::<ServiceName>() else {
                    continue;
                };
                let Value::Array(items) = items else {
                    return Err(RecordError::InvalidSeed(format!(
                        "seed list for '{service}' is not a sequence"
                    )));
                };
                seeds.entry(service).or_default().extend(items);
            }
            Ok(())
        }
        other => Err(RecordError::InvalidSeed(other.to_string())),
    }
}

#[cfg(test)]
#[path = "tests/record_tests.rs"]
mod tests;
