//! Scheduling port: the single serialized world context.

use std::time::Duration;

use super::error::DispatchError;
use super::types::WorldCommand;

/// Hands commands to the world context, which runs them one at a time.
#[cfg_attr(test, mockall::automock)]
pub trait WorldScheduler: Send + Sync {
    fn dispatch(&self, command: WorldCommand) -> Result<(), DispatchError>;
    /// Deliver `command` after `delay`. Cancellation is implicit: handlers
    /// re-check encounter state when the command runs.
    fn dispatch_after(&self, delay: Duration, command: WorldCommand) -> Result<(), DispatchError>;
}
