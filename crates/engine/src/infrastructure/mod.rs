//! Infrastructure implementations.
//!
//! Contains port trait implementations for the host world, files on disk,
//! and the serialized world context.

pub mod clock;
pub mod config_file;
pub mod despawn_file;
pub mod headless;
pub mod ports;
pub mod settings;
pub mod world_context;
