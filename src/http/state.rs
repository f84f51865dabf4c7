use crate::config::Config;
use crate::session::{RecordingSession, SessionServices};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active recording sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<RecordingSession>>>>,

    /// Collaborator handles shared by every session
    pub services: SessionServices,

    /// Service configuration (session defaults, capture source)
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Arc<Config>, services: SessionServices) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            services,
            config,
        }
    }
}
