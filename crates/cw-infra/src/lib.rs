//! Infrastructure layer: filesystem persistence and config storage.

pub mod config_store;
pub mod persistence;

pub use config_store::{ConfigStore, LoadedConfig};
pub use persistence::FsSnapshotStore;
