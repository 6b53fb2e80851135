use std::sync::Arc;

use crate::ats::SessionRegistry;
use crate::profile::backend::ProfileBackend;
use crate::profile::SectionWeightConfig;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Active section weights, loaded once at startup.
    pub weights: Arc<SectionWeightConfig>,
    pub profile_backend: Arc<dyn ProfileBackend>,
    pub sessions: SessionRegistry,
}
