pub mod handlers;
pub mod middleware;
pub mod records;
pub mod routes;

pub use routes::create_router;
