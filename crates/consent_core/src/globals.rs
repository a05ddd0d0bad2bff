use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde_json::Value;

/// A callable global taking variadic positional arguments.
pub trait CommandSink: Send + Sync {
    fn call(&self, args: &[Value]);
}

#[derive(Clone)]
pub enum GlobalValue {
    Sequence(Vec<Value>),
    Callable(Arc<dyn CommandSink>),
    /// Anything else a page script may have stored under the name.
    Other(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Sequence,
    Callable,
}

/// Result of probing a named global for a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Absent,
    WrongShape,
    Usable,
}

impl Capability {
    pub fn is_usable(self) -> bool {
        self == Self::Usable
    }
}

impl GlobalValue {
    fn capability(&self, shape: Shape) -> Capability {
        match (self, shape) {
            (Self::Sequence(_), Shape::Sequence) | (Self::Callable(_), Shape::Callable) => {
                Capability::Usable
            }
            _ => Capability::WrongShape,
        }
    }
}

/// The named globals of one execution context. Page scripts may replace or
/// delete any of them at any time, so every shape check happens per call.
#[derive(Default)]
pub struct GlobalScope {
    values: Mutex<HashMap<String, GlobalValue>>,
}

impl GlobalScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, GlobalValue>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn probe(&self, name: &str, shape: Shape) -> Capability {
        self.values()
            .get(name)
            .map_or(Capability::Absent, |value| value.capability(shape))
    }

    pub fn get(&self, name: &str) -> Option<GlobalValue> {
        self.values().get(name).cloned()
    }

    pub fn set(&self, name: &str, value: GlobalValue) -> Option<GlobalValue> {
        self.values().insert(name.to_string(), value)
    }

    pub fn remove(&self, name: &str) -> Option<GlobalValue> {
        self.values().remove(name)
    }

    /// Creates an empty sequence under `name` when nothing is there yet. An
    /// existing value of another shape is left untouched.
    pub fn ensure_sequence(&self, name: &str) -> Capability {
        let mut values = self.values();
        let value = values
            .entry(name.to_string())
            .or_insert_with(|| GlobalValue::Sequence(Vec::new()));
        value.capability(Shape::Sequence)
    }

    /// Appends to the sequence under `name`; false when it is not a sequence.
    pub fn push(&self, name: &str, item: Value) -> bool {
        match self.values().get_mut(name) {
            Some(GlobalValue::Sequence(items)) => {
                items.push(item);
                true
            }
            _ => false,
        }
    }

    pub fn sequence(&self, name: &str) -> Option<Vec<Value>> {
        match self.values().get(name) {
            Some(GlobalValue::Sequence(items)) => Some(items.clone()),
            _ => None,
        }
    }

    pub fn ensure_callable(
        &self,
        name: &str,
        make: impl FnOnce() -> Arc<dyn CommandSink>,
    ) -> Capability {
        let mut values = self.values();
        let value = values
            .entry(name.to_string())
            .or_insert_with(|| GlobalValue::Callable(make()));
        value.capability(Shape::Callable)
    }

    /// Invokes the callable under `name`. The scope lock is released before the
    /// call so the callee may touch other globals.
    pub fn call(&self, name: &str, args: &[Value]) -> bool {
        let sink = match self.values().get(name) {
            Some(GlobalValue::Callable(sink)) => Arc::clone(sink),
            _ => return false,
        };
        sink.call(args);
        true
    }
}

/// Stand-in command queue installed until the real analytics script takes
/// over the global. Calls are held in arrival order and never dropped, since
/// the loaded script drains them once and replaces the global.
pub struct CommandQueue {
    created_at: DateTime<Utc>,
    queued: Mutex<Vec<Vec<Value>>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            queued: Mutex::new(Vec::new()),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn queued(&self) -> Vec<Vec<Value>> {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandSink for CommandQueue {
    fn call(&self, args: &[Value]) {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(args.to_vec());
    }
}

#[cfg(test)]
#[path = "tests/globals_tests.rs"]
mod tests;
