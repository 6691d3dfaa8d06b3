//! Cometwave Engine library.
//!
//! Runs timed, anchor-bound wave encounters on top of a host world.
//!
//! ## Structure
//!
//! - `stores/` - In-memory runtime state (registry, wave progress, config snapshot)
//! - `use_cases/` - Encounter orchestration across stores and ports
//! - `infrastructure/` - Port traits and their adapters
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

pub use app::App;
