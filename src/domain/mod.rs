// Domain layer - Pure data types and policy functions
pub mod credentials;
pub mod motion;
pub mod policy;
pub mod position;
