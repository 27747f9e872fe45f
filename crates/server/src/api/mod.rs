pub mod cache;
pub mod error;
pub mod handlers;
pub mod indexers;
pub mod middleware;
pub mod params;
pub mod routes;
pub mod search;
pub mod torznab;

pub use routes::create_router;
