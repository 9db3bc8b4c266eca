//! Runtime adapters for TutorBot (config/auth, local persistence).

pub mod config;
pub mod keyring;
pub mod store;

pub use config::Config;
pub use store::LocalStore;
