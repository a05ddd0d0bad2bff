use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::{anyhow, Result};
use shared::{
    config::{resolve, ConsentOptions, Configuration},
    domain::{Event, ServiceName},
    record::{ConsentRecord, SeedData},
};
use storage::{ConsentStore, CookieJar};
use tracing::{debug, info};

pub mod adapters;
pub mod context;
pub mod globals;
pub mod prompt;
pub mod scripts;
pub mod status;

use adapters::{CommandQueueAdapter, DataLayerAdapter, ServiceAdapter};
use context::ExecutionContext;
use globals::GlobalScope;
use prompt::{ConsentPrompt, NoPrompt};
use scripts::{NoopScriptLoader, ScriptLoader};
use status::{ConsentState, Status};

/// Path reported for the page view tracked right after acceptance.
const ACCEPT_PAGE_VIEW_PATH: &str = "/";

/// External collaborators the controller drives but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub cookies: Arc<dyn CookieJar>,
    pub scripts: Arc<dyn ScriptLoader>,
    pub prompt: Arc<dyn ConsentPrompt>,
}

impl Collaborators {
    pub fn new(cookies: Arc<dyn CookieJar>) -> Self {
        Self {
            cookies,
            scripts: Arc::new(NoopScriptLoader),
            prompt: Arc::new(NoPrompt),
        }
    }

    pub fn with_script_loader(mut self, scripts: Arc<dyn ScriptLoader>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn ConsentPrompt>) -> Self {
        self.prompt = prompt;
        self
    }
}

/// Consent gate for the analytics integrations of one execution context.
///
/// The persisted consent record is the only durable state. The in-memory
/// [`Status`] is re-derived from it on installation and after every decision,
/// and every downstream side effect (script loads, data layer pushes, queued
/// commands) is checked against that status at call time.
pub struct ConsentController {
    config: Configuration,
    store: ConsentStore,
    globals: Arc<GlobalScope>,
    scripts: Arc<dyn ScriptLoader>,
    prompt: Arc<dyn ConsentPrompt>,
    adapters: BTreeMap<ServiceName, Box<dyn ServiceAdapter>>,
    status: Mutex<Status>,
}

impl ConsentController {
    /// Installs a controller into `ctx` and derives its initial status.
    ///
    /// Returns `None` without touching the cookie jar when `ctx` has no host
    /// document or already has a controller installed.
    pub fn install(
        ctx: &ExecutionContext,
        options: &ConsentOptions,
        collaborators: Collaborators,
    ) -> Option<Arc<Self>> {
        Self::install_resolved(ctx, resolve(options), collaborators)
    }

    pub fn install_resolved(
        ctx: &ExecutionContext,
        config: Configuration,
        collaborators: Collaborators,
    ) -> Option<Arc<Self>> {
        if !ctx.has_document() {
            debug!("consent: no host document, controller not installed");
            return None;
        }
        if !ctx.claim() {
            debug!("consent: controller already installed for this context");
            return None;
        }

        let adapters: BTreeMap<ServiceName, Box<dyn ServiceAdapter>> = [
            Box::new(DataLayerAdapter::new(config.gtm.clone())) as Box<dyn ServiceAdapter>,
            Box::new(CommandQueueAdapter::new(config.ga.clone())) as Box<dyn ServiceAdapter>,
        ]
        .into_iter()
        .map(|adapter| (adapter.service(), adapter))
        .collect();

        let controller = Arc::new(Self {
            store: ConsentStore::new(collaborators.cookies),
            globals: Arc::clone(ctx.globals()),
            scripts: collaborators.scripts,
            prompt: collaborators.prompt,
            adapters,
            status: Mutex::new(Status::undecided()),
            config,
        });
        controller.initialize();
        ctx.publish(Arc::clone(&controller));
        info!(
            cookie = %controller.config.cookie.name,
            state = ?controller.state(),
            "consent: controller installed"
        );
        Some(controller)
    }

    fn lock_status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-derives the status from the persisted record and drives the
    /// adapters accordingly.
    fn initialize(&self) -> ConsentState {
        for adapter in self.adapters.values() {
            adapter.reset();
        }

        let Some(record) = self.store.read(&self.config.cookie.name) else {
            *self.lock_status() = Status::undecided();
            debug!("consent: no decision recorded, prompting");
            self.prompt.show();
            return ConsentState::Undecided;
        };

        *self.lock_status() = Status::decided(record.accepted);
        if !record.accepted {
            debug!("consent: tracking denied");
            return ConsentState::Denied;
        }

        self.init_trackers(&record);
        ConsentState::Accepted
    }

    /// Bootstraps every configured service. The status lock is not held while
    /// adapters run, since command sinks are foreign code.
    fn init_trackers(&self, record: &ConsentRecord) {
        let mut active = BTreeMap::new();
        for (service, adapter) in &self.adapters {
            let started = adapter.bootstrap(
                &self.globals,
                self.scripts.as_ref(),
                ConsentState::Accepted,
                record.seeds_for(*service),
            );
            if started {
                info!(service = %service, "consent: tracker started");
            }
            active.insert(*service, started);
        }
        self.lock_status().services = active;

        if self.config.track_page_view_on_accept {
            self.track_page_view(ACCEPT_PAGE_VIEW_PATH);
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn status(&self) -> Status {
        self.lock_status().clone()
    }

    pub fn state(&self) -> ConsentState {
        self.lock_status().state()
    }

    pub fn user_reacted(&self) -> bool {
        self.lock_status().user_reacted
    }

    /// `None` until the user has made a decision.
    pub fn tracking_accepted(&self) -> Option<bool> {
        self.lock_status().tracking_accepted
    }

    /// Whether the consent prompt should currently be shown.
    pub fn modal_enabled(&self) -> bool {
        self.lock_status().enable_modal
    }

    pub fn is_trackable(&self, service: ServiceName) -> bool {
        self.adapters
            .get(&service)
            .is_some_and(|adapter| adapter.is_trackable())
    }

    /// Persists the decision, then re-derives status from the freshly written
    /// record. A failing cookie write is the only error and is returned as is.
    pub fn set_tracking_accepted(&self, accepted: bool, seeds: SeedData) -> Result<bool> {
        let record = ConsentRecord::new(accepted, seeds);
        self.store.write(
            &self.config.cookie.name,
            &record,
            &self.config.cookie.options,
        )?;
        info!(
            accepted,
            cookie = %self.config.cookie.name,
            "consent: decision recorded"
        );
        self.initialize();
        Ok(true)
    }

    pub fn register_data(&self, service: ServiceName, event: &Event) -> bool {
        let state = self.state();
        self.adapters
            .get(&service)
            .is_some_and(|adapter| adapter.register(&self.globals, state, event))
    }

    /// Data registered with `service` while it is active. Empty unless the
    /// current derivation accepted tracking and bootstrapped the service, so a
    /// withdrawn consent hides whatever the channel still holds.
    pub fn registered_data(&self, service: ServiceName) -> Vec<Event> {
        if !self.lock_status().is_active(service) {
            return Vec::new();
        }
        self.adapters
            .get(&service)
            .map(|adapter| adapter.read_all(&self.globals))
            .unwrap_or_default()
    }

    pub fn run_command(&self, service: ServiceName, command: &Event) -> bool {
        let state = self.state();
        self.adapters
            .get(&service)
            .is_some_and(|adapter| adapter.run_command(&self.globals, state, command))
    }

    /// Reports a page view to every active service. False when tracking is
    /// not accepted.
    pub fn track_page_view(&self, path: &str) -> bool {
        let status = self.status();
        if !status.state().is_accepted() {
            return false;
        }
        for (service, adapter) in &self.adapters {
            if status.is_active(*service)
                && !adapter.track_page_view(&self.globals, status.state(), path)
            {
                debug!(service = %service, "consent: page view not delivered");
            }
        }
        true
    }
}

/// Whether the controller installed in `ctx` wants the prompt shown. False
/// when no controller is installed.
pub fn modal_enabled(ctx: &ExecutionContext) -> bool {
    ctx.controller()
        .is_some_and(|controller| controller.modal_enabled())
}

/// Records a decision without seed data on the controller installed in `ctx`.
pub fn set_tracking_accepted(ctx: &ExecutionContext, accepted: bool) -> Result<bool> {
    let controller = ctx
        .controller()
        .ok_or_else(|| anyhow!("no consent controller installed in this context"))?;
    controller.set_tracking_accepted(accepted, SeedData::new())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
