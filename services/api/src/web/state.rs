//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every request.

use crate::config::Config;
use std::sync::Arc;
use taskboard_core::ports::{DocumentStore, SessionTokenService};
use taskboard_core::services::{IdentityRegistry, TaskBoard, TutoringDesk};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Every service is built around the same store handle; the store's lifetime is
/// the lifetime of the process.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: Arc<dyn SessionTokenService>,
    pub users: IdentityRegistry,
    pub tasks: TaskBoard,
    pub tutoring: TutoringDesk,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn DocumentStore>,
        tokens: Arc<dyn SessionTokenService>,
    ) -> Self {
        Self {
            config,
            tokens,
            users: IdentityRegistry::new(store.clone()),
            tasks: TaskBoard::new(store.clone()),
            tutoring: TutoringDesk::new(store),
        }
    }
}
