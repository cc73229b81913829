//! Port traits for the scanner's external collaborators.

pub mod config_port;
pub mod price_store;
pub mod refresh_lock;
