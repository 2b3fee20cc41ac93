//! Save/load system
//!
//! Snapshot schema and the coordinator that ties the persistent store,
//! the enemy lifecycle, and the player collaborators to the save file.

pub mod coordinator;
pub mod snapshot;

pub use coordinator::{default_save_path, save_directory, SaveCoordinator, SaveError};
pub use snapshot::SaveSnapshot;
