//! HTTP API handlers for revlens

pub mod analysis;
pub mod dashboard;
pub mod health;
pub mod import;
pub mod recommendations;
pub mod sse;

pub use analysis::analysis_routes;
pub use dashboard::dashboard_routes;
pub use health::health_routes;
pub use import::import_routes;
pub use recommendations::recommendation_routes;
pub use sse::event_stream;
