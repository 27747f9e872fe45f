//! HTTP surface of the trawl aggregation proxy.

pub mod api;
pub mod metrics;
pub mod state;
pub mod sweeper;

pub use api::create_router;
pub use state::AppState;
