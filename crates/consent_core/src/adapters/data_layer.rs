use serde_json::json;
use shared::{
    config::DataLayerSettings,
    domain::{is_structured_event, Event, ServiceName},
};
use tracing::{debug, warn};

use super::{ServiceAdapter, PAGE_VIEW_EVENT};
use crate::{
    globals::{Capability, GlobalScope},
    scripts::{ScriptLoader, ServiceDescriptor},
    status::ConsentState,
};

/// Tag-manager integration: events are appended to a named ordered channel.
pub struct DataLayerAdapter {
    settings: DataLayerSettings,
}

impl DataLayerAdapter {
    pub fn new(settings: DataLayerSettings) -> Self {
        Self { settings }
    }

    fn channel(&self) -> &str {
        &self.settings.data_layer_name
    }
}

impl ServiceAdapter for DataLayerAdapter {
    fn service(&self) -> ServiceName {
        ServiceName::Gtm
    }

    fn is_trackable(&self) -> bool {
        !self.settings.id.is_empty() && !self.settings.data_layer_name.is_empty()
    }

    fn bootstrap(
        &self,
        globals: &GlobalScope,
        scripts: &dyn ScriptLoader,
        state: ConsentState,
        seeds: &[Event],
    ) -> bool {
        if !self.is_trackable() {
            debug!("gtm: not trackable, skipping bootstrap");
            return false;
        }

        let descriptor = match ServiceDescriptor::tag_manager(&self.settings) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(error = %err, "gtm: cannot build script url");
                return false;
            }
        };

        if globals.ensure_sequence(self.channel()) == Capability::WrongShape {
            warn!(
                channel = self.channel(),
                "gtm: data layer global is taken by a non-sequence value"
            );
            return false;
        }

        scripts.ensure(&descriptor);

        for event in self.settings.default_data_layer.iter().chain(seeds) {
            if !self.register(globals, state, event) {
                debug!(channel = self.channel(), "gtm: dropped seed event");
            }
        }

        debug!(
            channel = self.channel(),
            id = %self.settings.id,
            "gtm: bootstrapped"
        );
        true
    }

    fn register(&self, globals: &GlobalScope, state: ConsentState, event: &Event) -> bool {
        if !self.is_trackable() || !state.is_accepted() || !is_structured_event(event) {
            return false;
        }
        globals.push(self.channel(), event.clone())
    }

    fn read_all(&self, globals: &GlobalScope) -> Vec<Event> {
        if !self.is_trackable() {
            return Vec::new();
        }
        globals.sequence(self.channel()).unwrap_or_default()
    }

    fn run_command(&self, _globals: &GlobalScope, _state: ConsentState, _command: &Event) -> bool {
        false
    }

    fn track_page_view(&self, globals: &GlobalScope, state: ConsentState, _path: &str) -> bool {
        self.register(globals, state, &json!({ "event": PAGE_VIEW_EVENT }))
    }
}
