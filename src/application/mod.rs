// Application layer - The adaptive sampling and delivery engine
pub mod delivery_pipeline;
pub mod delivery_queue;
pub mod fix_filter;
pub mod interval_policy;
pub mod motion_classifier;
pub mod ports;
pub mod power_guard;
pub mod session;
pub mod tracker;
pub mod tracking_service;

#[cfg(test)]
pub mod test_support;
