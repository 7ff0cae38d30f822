pub mod api;
pub mod events;
pub mod kinds;
pub mod models;
