use shared::domain::{Event, ServiceName};

use crate::{globals::GlobalScope, scripts::ScriptLoader, status::ConsentState};

mod command_queue;
mod data_layer;

pub use command_queue::CommandQueueAdapter;
pub use data_layer::DataLayerAdapter;

pub const PAGE_VIEW_EVENT: &str = "pageView";

/// One analytics integration. Every mutating call re-checks trackability,
/// consent state and the shape of the service's global at call time, and
/// reports failure through its return value instead of panicking.
pub trait ServiceAdapter: Send + Sync {
    fn service(&self) -> ServiceName;

    /// Whether the identifying configuration is present. Independent of consent.
    fn is_trackable(&self) -> bool;

    /// Installs the service global, triggers the script load and replays
    /// `seeds`. Returns whether the service is now active.
    fn bootstrap(
        &self,
        globals: &GlobalScope,
        scripts: &dyn ScriptLoader,
        state: ConsentState,
        seeds: &[Event],
    ) -> bool;

    fn register(&self, globals: &GlobalScope, state: ConsentState, event: &Event) -> bool;

    /// Current contents of the service's channel, empty when untrackable.
    /// Not gated on consent; callers check the derived status. A data layer
    /// channel outlives derivations, so re-accepting in the same context
    /// appends defaults and seeds after the earlier ones.
    fn read_all(&self, globals: &GlobalScope) -> Vec<Event>;

    fn run_command(&self, globals: &GlobalScope, state: ConsentState, command: &Event) -> bool;

    fn track_page_view(&self, globals: &GlobalScope, state: ConsentState, path: &str) -> bool;

    /// Drops any per-derivation bookkeeping.
    fn reset(&self) {}
}

#[cfg(test)]
#[path = "../tests/adapters_tests.rs"]
mod tests;
