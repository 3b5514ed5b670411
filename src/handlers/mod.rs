//! Contains the application's HTTP handlers.

mod health;
mod items;
mod not_found;

pub use health::HealthRoutes;
pub use items::ItemRoutes;
pub use not_found::not_found;
