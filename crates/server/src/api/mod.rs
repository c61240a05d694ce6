pub mod audit;
pub mod handlers;
pub mod incidents;
pub mod middleware;
pub mod routes;
pub mod runtime;
pub mod signals;

pub use routes::create_router;
