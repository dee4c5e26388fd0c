use crate::config::settings::AppConfig;
use crate::modules::converter::controller::WorkflowController;
use crate::modules::converter::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub controller: WorkflowController,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: AppConfig, controller: WorkflowController, sessions: SessionStore) -> Self {
        Self {
            config,
            controller,
            sessions,
        }
    }
}
