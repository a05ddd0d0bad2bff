use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{json, Value};
use shared::{
    config::CommandQueueSettings,
    domain::{Event, ServiceName},
};
use tracing::{debug, warn};

use super::ServiceAdapter;
use crate::{
    globals::{Capability, CommandQueue, CommandSink, GlobalScope, Shape},
    scripts::{ScriptLoader, ServiceDescriptor},
    status::ConsentState,
};

/// Analytics-client integration: commands are positional-argument calls on a
/// named callable global.
pub struct CommandQueueAdapter {
    settings: CommandQueueSettings,
    /// Commands dispatched on behalf of callers since the last derivation.
    /// Unbounded; it lives no longer than one consent decision.
    dispatched: Mutex<Vec<Event>>,
}

impl CommandQueueAdapter {
    pub fn new(settings: CommandQueueSettings) -> Self {
        Self {
            settings,
            dispatched: Mutex::new(Vec::new()),
        }
    }

    fn queue(&self) -> &str {
        &self.settings.queue_name
    }

    fn create_command(&self) -> Vec<Value> {
        let mut args = vec![json!("create"), json!(self.settings.id)];
        args.extend(self.settings.create_fields.iter().cloned());
        args
    }
}

impl ServiceAdapter for CommandQueueAdapter {
    fn service(&self) -> ServiceName {
        ServiceName::Ga
    }

    fn is_trackable(&self) -> bool {
        !self.settings.id.is_empty() && !self.settings.queue_name.is_empty()
    }

    fn bootstrap(
        &self,
        globals: &GlobalScope,
        scripts: &dyn ScriptLoader,
        state: ConsentState,
        seeds: &[Event],
    ) -> bool {
        if !self.is_trackable() {
            debug!("ga: not trackable, skipping bootstrap");
            return false;
        }

        let descriptor = match ServiceDescriptor::analytics(&self.settings) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(error = %err, "ga: cannot build script url");
                return false;
            }
        };

        let capability = globals.ensure_callable(self.queue(), || {
            Arc::new(CommandQueue::new()) as Arc<dyn CommandSink>
        });
        if capability == Capability::WrongShape {
            warn!(
                queue = self.queue(),
                "ga: command queue global is taken by a non-callable value"
            );
            return false;
        }

        scripts.ensure(&descriptor);

        if !globals.call(self.queue(), &self.create_command()) {
            warn!(queue = self.queue(), "ga: create command was not delivered");
        }

        for command in seeds {
            if !self.run_command(globals, state, command) {
                debug!(queue = self.queue(), "ga: dropped seed command");
            }
        }

        debug!(queue = self.queue(), id = %self.settings.id, "ga: bootstrapped");
        true
    }

    fn register(&self, _globals: &GlobalScope, _state: ConsentState, _event: &Event) -> bool {
        false
    }

    fn read_all(&self, _globals: &GlobalScope) -> Vec<Event> {
        if !self.is_trackable() {
            return Vec::new();
        }
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn run_command(&self, globals: &GlobalScope, state: ConsentState, command: &Event) -> bool {
        if !self.is_trackable() || !state.is_accepted() {
            return false;
        }
        let Value::Array(args) = command else {
            return false;
        };
        if !globals.probe(self.queue(), Shape::Callable).is_usable() {
            debug!(queue = self.queue(), "ga: command queue global unavailable");
            return false;
        }
        if !globals.call(self.queue(), args) {
            return false;
        }
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());
        true
    }

    fn track_page_view(&self, globals: &GlobalScope, state: ConsentState, path: &str) -> bool {
        self.run_command(globals, state, &json!(["send", "pageview", path]))
    }

    fn reset(&self) {
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
