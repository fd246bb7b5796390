//! Persisted streamer settings

pub mod schema;
pub mod store;

pub use schema::StreamerSettings;
pub use store::{load_settings, save_settings, SettingsError};
