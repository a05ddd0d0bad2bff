use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, OnceLock,
};

use crate::{globals::GlobalScope, ConsentController};

/// One execution context (a browser tab): its named globals and the slot the
/// single consent controller is installed into.
pub struct ExecutionContext {
    has_document: bool,
    globals: Arc<GlobalScope>,
    claimed: AtomicBool,
    controller: OnceLock<Arc<ConsentController>>,
}

impl ExecutionContext {
    pub fn browser() -> Self {
        Self::new(true)
    }

    /// A context without a host document. Installing a controller here is a
    /// no-op.
    pub fn headless() -> Self {
        Self::new(false)
    }

    fn new(has_document: bool) -> Self {
        Self {
            has_document,
            globals: Arc::new(GlobalScope::new()),
            claimed: AtomicBool::new(false),
            controller: OnceLock::new(),
        }
    }

    pub fn has_document(&self) -> bool {
        self.has_document
    }

    pub fn globals(&self) -> &Arc<GlobalScope> {
        &self.globals
    }

    pub fn controller(&self) -> Option<Arc<ConsentController>> {
        self.controller.get().cloned()
    }

    /// Reserves the controller slot. Only the first caller gets `true`.
    pub(crate) fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn publish(&self, controller: Arc<ConsentController>) {
        let _ = self.controller.set(controller);
    }
}
