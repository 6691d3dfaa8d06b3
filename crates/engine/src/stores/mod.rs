//! In-memory state storage modules.
//!
//! Stores hold runtime state that lives only as long as the process:
//! - `EncounterRegistry` - which encounters exist and who owns them
//! - `ProgressStore` - wave progress for active encounters
//! - `CatalogStore` - the current configuration snapshot

pub mod catalog;
pub mod encounter_registry;
pub mod progress;

// Re-export store types
pub use catalog::{CatalogStore, ReloadReport};
pub use encounter_registry::EncounterRegistry;
pub use progress::ProgressStore;
