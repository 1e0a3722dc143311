// Application layer - Use cases and ports
pub mod error;
pub mod scrub;
pub mod session_store;
pub mod share_links;
pub mod share_workflow;
pub mod snapshot_api;
pub mod snapshot_service;

#[cfg(test)]
pub mod test_utils;
