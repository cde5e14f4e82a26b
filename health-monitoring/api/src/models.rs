pub mod monitoring;

pub use health_monitor::ApiResponse;
