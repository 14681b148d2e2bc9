// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod host_bridge;
pub mod http_collector;
pub mod preference_store;
