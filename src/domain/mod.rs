// Domain layer - Dashboard, snapshot and share session models
pub mod context;
pub mod dashboard;
pub mod share;
pub mod snapshot;
pub mod time_range;
