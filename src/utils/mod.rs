/// Shared async utilities
pub mod context;
pub mod polling;
