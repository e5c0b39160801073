//! Application state shared across all handlers.

use liveasr_config::Settings;
use liveasr_pipeline::TranslatorRegistry;
use std::sync::Arc;

use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<SessionRegistry>,
    pub translators: Arc<TranslatorRegistry>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let translators = TranslatorRegistry::from_config(&settings.translation);
        Self {
            settings: Arc::new(settings),
            sessions: Arc::new(SessionRegistry::new()),
            translators: Arc::new(translators),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_with_empty_session_registry() {
        let state = AppState::new(Settings::default());
        assert_eq!(state.sessions.count(), 0);
    }
}
