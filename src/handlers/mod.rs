pub mod health;

pub use health::{health_handler, health_router, normalize_route_path};
