// Application state for HTTP handlers
use crate::application::share_workflow::ShareWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub workflow: ShareWorkflow,
}
